use micaml::{BASE_STATE, Document, Layer, Vec2, tree};

const FIXTURE: &str = include_str!("data/wallpaper.caml");

fn find<'a>(layers: &'a [Layer], name: &str) -> &'a Layer {
    tree::flatten_layers(layers)
        .into_iter()
        .find(|l| l.name() == name)
        .unwrap()
}

#[test]
fn base_state_keeps_base_values() {
    let doc = Document::decode(FIXTURE).unwrap();
    let projected = doc.effective_layers(BASE_STATE, 0.0);
    let clock = find(&projected, "Clock");
    assert_eq!(clock.position(), Vec2::new(200.0, 120.0));
    assert_eq!(clock.opacity(), 1.0);
    let dot = find(&projected, "Dot");
    assert_eq!(dot.opacity(), 1.0);
}

#[test]
fn locked_state_applies_overrides() {
    let doc = Document::decode(FIXTURE).unwrap();
    let projected = doc.effective_layers("Locked", 0.0);
    let clock = find(&projected, "Clock");
    assert_eq!(clock.position(), Vec2::new(200.0, 80.0));
    let dot = find(&projected, "Dot");
    assert_eq!(dot.opacity(), 0.0);
    // Sleep's override does not leak into Locked.
    let background = find(&projected, "Background");
    assert_eq!(background.opacity(), 1.0);
}

#[test]
fn animation_advances_with_the_clock() {
    let doc = Document::decode(FIXTURE).unwrap();
    // Clock opacity animates 1 -> 0.4 over 2s.
    let projected = doc.effective_layers(BASE_STATE, 1000.0);
    let clock = find(&projected, "Clock");
    assert!((clock.opacity() - 0.7).abs() < 1e-9);
    // A full cycle later it is back at the start.
    let projected = doc.effective_layers(BASE_STATE, 2000.0);
    assert_eq!(find(&projected, "Clock").opacity(), 1.0);
}

#[test]
fn animation_stacks_on_state_overrides() {
    let doc = Document::decode(FIXTURE).unwrap();
    let projected = doc.effective_layers("Locked", 1000.0);
    let clock = find(&projected, "Clock");
    // Override moved it, animation dims it.
    assert_eq!(clock.position(), Vec2::new(200.0, 80.0));
    assert!((clock.opacity() - 0.7).abs() < 1e-9);
}

#[test]
fn projection_leaves_the_document_unchanged() {
    let doc = Document::decode(FIXTURE).unwrap();
    let before = doc.clone();
    let _ = doc.effective_layers("Locked", 1234.0);
    let _ = doc.effective_layers("Sleep", 5678.0);
    assert_eq!(doc, before);
}

#[test]
fn unknown_state_projects_the_base_tree() {
    let doc = Document::decode(FIXTURE).unwrap();
    let projected = doc.effective_layers("Daydream", 0.0);
    let clock = find(&projected, "Clock");
    assert_eq!(clock.position(), Vec2::new(200.0, 120.0));
}
