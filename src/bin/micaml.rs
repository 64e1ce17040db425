use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "micaml", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a CAML document and print a layer/state summary.
    Inspect(InspectArgs),
    /// Decode and re-encode a CAML document, canonicalizing formatting.
    Fmt(FmtArgs),
    /// Print the effective override values for a state at a point in time.
    Sample(SampleArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input CAML document.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FmtArgs {
    /// Input CAML document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Input CAML document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// State to project; defaults to the Base State.
    #[arg(long)]
    state: Option<String>,

    /// Global clock position in milliseconds.
    #[arg(long, default_value_t = 0.0)]
    time_ms: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Fmt(args) => cmd_fmt(args),
        Command::Sample(args) => cmd_sample(args),
    }
}

fn read_document(path: &Path) -> anyhow::Result<micaml::Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    let doc = micaml::Document::decode(&text)
        .with_context(|| format!("decode document '{}'", path.display()))?;
    Ok(doc)
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.in_path)?;

    fn print_layer(layer: &micaml::Layer, depth: usize) {
        println!(
            "{}{} \"{}\" ({}) {}x{}",
            "  ".repeat(depth),
            layer.display_type_name(),
            layer.name(),
            layer.id(),
            micaml::caml::format_number(layer.size().w),
            micaml::caml::format_number(layer.size().h),
        );
        for child in layer.children().unwrap_or(&[]) {
            print_layer(child, depth + 1);
        }
    }

    for layer in &doc.layers {
        print_layer(layer, 0);
    }
    println!("states: {}", doc.states.join(", "));
    for (state, entries) in &doc.state_overrides {
        println!("  {state}: {} override(s)", entries.len());
    }
    if let Err(e) = doc.validate() {
        println!("warning: {e}");
    }
    Ok(())
}

fn cmd_fmt(args: FmtArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.in_path)?;
    let xml = doc.encode();
    match args.out {
        Some(out) => std::fs::write(&out, xml)
            .with_context(|| format!("write document '{}'", out.display()))?,
        None => print!("{xml}"),
    }
    Ok(())
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.in_path)?;
    let state = args.state.as_deref().unwrap_or(micaml::BASE_STATE);
    let projected = doc.effective_layers(state, args.time_ms);

    let mut entries = Vec::new();
    collect_effective(&projected, &mut entries);
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

#[derive(serde::Serialize)]
struct EffectiveEntry {
    id: String,
    name: String,
    position: micaml::Vec2,
    size: micaml::Size,
    opacity: f64,
    rotation: f64,
    visible: bool,
}

fn collect_effective(layers: &[micaml::Layer], out: &mut Vec<EffectiveEntry>) {
    for layer in layers {
        out.push(EffectiveEntry {
            id: layer.id().to_string(),
            name: layer.name().to_string(),
            position: layer.position(),
            size: layer.size(),
            opacity: layer.opacity(),
            rotation: layer.rotation(),
            visible: layer.visible(),
        });
        collect_effective(layer.children().unwrap_or(&[]), out);
    }
}
