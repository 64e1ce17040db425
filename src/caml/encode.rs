//! Layer document → CAML text.
//!
//! Output is deterministic and indentation-stable: fixed attribute order,
//! fixed block order, and a wire-mandated number format. Properties equal to
//! their implicit default are omitted, which keeps re-encoding idempotent
//! against the permissive decoder.

use crate::{
    anim::{Animation, KeyframeValue},
    document::Document,
    geom::Vec2,
    layer::Layer,
    states::{BASE_STATE, OverrideValue, derive_transitions},
};

const CAML_XMLNS: &str = "http://www.apple.com/CoreAnimation/1.0";

/// Serialize a whole document, deriving the transitions block from the
/// current states and overrides.
#[tracing::instrument(skip(doc), fields(layers = doc.layers.len()))]
pub fn encode_document(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<caml xmlns=\"{CAML_XMLNS}\">\n"));

    for layer in &doc.layers {
        encode_layer(&mut out, layer, 1);
    }

    let user_states: Vec<&String> = doc.states.iter().filter(|s| *s != BASE_STATE).collect();
    if !user_states.is_empty() {
        push_line(&mut out, 1, "<MicaStates type=\"NSArray\">");
        for state in &user_states {
            push_line(&mut out, 2, &format!("<string>{}</string>", escape_xml(state)));
        }
        push_line(&mut out, 1, "</MicaStates>");
    }

    if !doc.state_overrides.is_empty() {
        push_line(&mut out, 1, "<MicaStateOverrides type=\"NSDictionary\">");
        for (state, entries) in &doc.state_overrides {
            push_line(&mut out, 2, &format!("<key>{}</key>", escape_xml(state)));
            push_line(&mut out, 2, "<array type=\"NSArray\">");
            for entry in entries {
                push_line(&mut out, 3, "<dict>");
                push_line(
                    &mut out,
                    4,
                    &format!(
                        "<key>targetId</key><string>{}</string>",
                        escape_xml(&entry.target_id)
                    ),
                );
                push_line(
                    &mut out,
                    4,
                    &format!(
                        "<key>keyPath</key><string>{}</string>",
                        escape_xml(&entry.key_path)
                    ),
                );
                push_line(
                    &mut out,
                    4,
                    &format!("<key>value</key>{}", tagged_value(&entry.value)),
                );
                push_line(&mut out, 3, "</dict>");
            }
            push_line(&mut out, 2, "</array>");
        }
        push_line(&mut out, 1, "</MicaStateOverrides>");
    }

    let transitions = derive_transitions(&doc.states, &doc.state_overrides);
    if !transitions.is_empty() {
        push_line(&mut out, 1, "<MicaStateTransitions type=\"NSArray\">");
        for t in &transitions {
            push_line(
                &mut out,
                2,
                &format!(
                    "<transition fromState=\"{}\" toState=\"{}\">",
                    escape_xml(&t.from_state),
                    escape_xml(&t.to_state)
                ),
            );
            push_line(&mut out, 3, "<elements type=\"NSArray\">");
            for el in &t.elements {
                let mut attrs = format!(
                    "targetId=\"{}\" keyPath=\"{}\"",
                    escape_xml(&el.target_id),
                    escape_xml(&el.key_path)
                );
                if let Some(animation) = &el.animation {
                    attrs.push_str(&format!(" animation=\"{}\"", escape_xml(animation)));
                }
                push_line(&mut out, 4, &format!("<element {attrs}/>"));
            }
            push_line(&mut out, 3, "</elements>");
            push_line(&mut out, 2, "</transition>");
        }
        push_line(&mut out, 1, "</MicaStateTransitions>");
    }

    if !doc.parallax_groups.is_empty() {
        push_line(&mut out, 1, "<wallpaperParallaxGroups type=\"NSArray\">");
        for group in &doc.parallax_groups {
            push_line(&mut out, 2, "<dict>");
            push_line(
                &mut out,
                3,
                &format!("<key>axis</key><string>{}</string>", escape_xml(&group.axis)),
            );
            push_line(
                &mut out,
                3,
                &format!(
                    "<key>layerName</key><string>{}</string>",
                    escape_xml(&group.layer_name)
                ),
            );
            push_line(
                &mut out,
                3,
                &format!(
                    "<key>keyPath</key><string>{}</string>",
                    escape_xml(&group.key_path)
                ),
            );
            push_line(
                &mut out,
                3,
                &format!("<key>mapMinTo</key><real>{}</real>", format_number(group.map_min_to)),
            );
            push_line(
                &mut out,
                3,
                &format!("<key>mapMaxTo</key><real>{}</real>", format_number(group.map_max_to)),
            );
            push_line(&mut out, 2, "</dict>");
        }
        push_line(&mut out, 1, "</wallpaperParallaxGroups>");
    }

    out.push_str("</caml>\n");
    out
}

fn encode_layer(out: &mut String, layer: &Layer, depth: usize) {
    let tag = layer_tag(layer);
    let attrs = layer_attrs(layer);

    let children = layer.children().unwrap_or(&[]);
    let has_blocks = !children.is_empty()
        || layer.base().filters.as_ref().is_some_and(|f| !f.is_empty())
        || !layer.animations().is_empty()
        || has_variant_blocks(layer);

    if !has_blocks {
        push_line(out, depth, &format!("<{tag} {attrs}/>"));
        return;
    }

    push_line(out, depth, &format!("<{tag} {attrs}>"));

    if let Some(filters) = &layer.base().filters {
        if !filters.is_empty() {
            push_line(out, depth + 1, "<filters type=\"NSArray\">");
            for f in filters {
                let mut attrs = format!("name=\"{}\"", escape_xml(&f.name));
                if let Some(v) = f.value {
                    attrs.push_str(&format!(" value=\"{}\"", format_number(v)));
                }
                push_line(out, depth + 2, &format!("<filter {attrs}/>"));
            }
            push_line(out, depth + 1, "</filters>");
        }
    }

    encode_variant_blocks(out, layer, depth + 1);

    if !layer.animations().is_empty() {
        push_line(out, depth + 1, "<animations type=\"NSArray\">");
        for anim in layer.animations() {
            encode_animation(out, anim, depth + 2);
        }
        push_line(out, depth + 1, "</animations>");
    }

    if !children.is_empty() {
        push_line(out, depth + 1, "<sublayers type=\"NSArray\">");
        for child in children {
            encode_layer(out, child, depth + 2);
        }
        push_line(out, depth + 1, "</sublayers>");
    }

    push_line(out, depth, &format!("</{tag}>"));
}

fn layer_tag(layer: &Layer) -> &'static str {
    match layer {
        Layer::Basic(_) | Layer::Video(_) | Layer::LiquidGlass(_) => "CALayer",
        Layer::Image(_) => "CAImageLayer",
        Layer::Text(_) => "CATextLayer",
        Layer::Shape(_) => "CAShapeLayer",
        Layer::Gradient(_) => "CAGradientLayer",
        Layer::Emitter(_) => "CAEmitterLayer",
        Layer::Transform(_) => "CATransformLayer",
        Layer::Replicator(_) => "CAReplicatorLayer",
    }
}

fn layer_attrs(layer: &Layer) -> String {
    let mut attrs: Vec<(String, String)> = Vec::new();
    let push = |attrs: &mut Vec<(String, String)>, k: &str, v: String| {
        attrs.push((k.to_string(), v));
    };

    // Kind disambiguation for variants sharing the CALayer tag.
    match layer {
        Layer::Video(_) => push(&mut attrs, "type", "video".to_string()),
        Layer::LiquidGlass(_) => {
            push(&mut attrs, "class", "MicaLiquidGlassLayer".to_string());
        }
        _ => {}
    }

    let base = layer.base();
    push(&mut attrs, "id", escape_xml(&base.id));
    push(&mut attrs, "name", escape_xml(&base.name));
    push(&mut attrs, "position", point_text(base.position));
    push(
        &mut attrs,
        "bounds",
        format!(
            "0 0 {} {}",
            format_number(base.size.w),
            format_number(base.size.h)
        ),
    );

    if let Some(z) = base.z_position {
        push(&mut attrs, "zPosition", format_number(z));
    }
    if let Some(r) = base.rotation {
        if r != 0.0 {
            push(&mut attrs, "rotation", format_number(r));
        }
    }
    if let Some(r) = base.rotation_x {
        if r != 0.0 {
            push(&mut attrs, "rotationX", format_number(r));
        }
    }
    if let Some(r) = base.rotation_y {
        if r != 0.0 {
            push(&mut attrs, "rotationY", format_number(r));
        }
    }
    if let Some(p) = base.anchor_point {
        if p != Vec2::new(0.5, 0.5) {
            push(&mut attrs, "anchorPoint", point_text(p));
        }
    }
    if let Some(o) = base.opacity {
        if o != 1.0 {
            push(&mut attrs, "opacity", format_number(o));
        }
    }
    if base.visible == Some(false) {
        push(&mut attrs, "hidden", "true".to_string());
    }
    if let Some(c) = &base.background_color {
        push(&mut attrs, "backgroundColor", escape_xml(c));
    }
    if let Some(o) = base.background_opacity {
        push(&mut attrs, "backgroundOpacity", format_number(o));
    }
    if let Some(c) = &base.border_color {
        push(&mut attrs, "borderColor", escape_xml(c));
    }
    if let Some(w) = base.border_width {
        push(&mut attrs, "borderWidth", format_number(w));
    }
    if let Some(r) = base.corner_radius {
        if r > 0.0 {
            push(&mut attrs, "cornerRadius", format_number(r));
        }
    }
    if let Some(m) = &base.blend_mode {
        push(&mut attrs, "blendMode", escape_xml(m));
    }
    if let Some(m) = base.masks_to_bounds {
        push(&mut attrs, "masksToBounds", m.to_string());
    }
    if let Some(g) = base.geometry_flipped {
        push(&mut attrs, "geometryFlipped", g.to_string());
    }

    variant_attrs(layer, &mut attrs);

    attrs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

fn variant_attrs(layer: &Layer, attrs: &mut Vec<(String, String)>) {
    let push = |attrs: &mut Vec<(String, String)>, k: &str, v: String| {
        attrs.push((k.to_string(), v));
    };

    match layer {
        Layer::Text(t) => {
            push(attrs, "string", escape_xml(&t.text));
            if let Some(f) = &t.font_family {
                push(attrs, "fontName", escape_xml(f));
            }
            if let Some(s) = t.font_size {
                push(attrs, "fontSize", format_number(s));
            }
            if let Some(c) = &t.color {
                push(attrs, "foregroundColor", escape_xml(c));
            }
            if let Some(a) = &t.align {
                push(attrs, "alignmentMode", escape_xml(a));
            }
            if let Some(w) = t.wrapped {
                push(attrs, "wrapped", w.to_string());
            }
        }
        Layer::Image(i) => {
            push(attrs, "contentsPath", escape_xml(&i.src));
            if let Some(f) = &i.fit {
                push(attrs, "fit", escape_xml(f));
            }
        }
        Layer::Shape(s) => {
            push(attrs, "shape", s.shape.as_str().to_string());
            if let Some(f) = &s.fill {
                push(attrs, "fillColor", escape_xml(f));
            }
            if let Some(st) = &s.stroke {
                push(attrs, "strokeColor", escape_xml(st));
            }
            if let Some(w) = s.stroke_width {
                push(attrs, "lineWidth", format_number(w));
            }
            if let Some(r) = s.radius {
                push(attrs, "radius", format_number(r));
            }
        }
        Layer::Video(v) => {
            push(attrs, "frameCount", v.frame_count.to_string());
            push(attrs, "fps", format_number(v.fps));
            push(attrs, "framePrefix", escape_xml(&v.frame_prefix));
            push(attrs, "frameExtension", escape_xml(&v.frame_extension));
            if let Some(d) = v.duration {
                push(attrs, "duration", format_number(d));
            }
            if let Some(m) = &v.calculation_mode {
                push(attrs, "calculationMode", escape_xml(m));
            }
            if let Some(a) = v.autoreverses {
                push(attrs, "autoreverses", a.to_string());
            }
            if let Some(s) = v.sync_with_state {
                push(attrs, "syncWithState", if s { "true" } else { "false" }.to_string());
            }
            if let Some(m) = &v.sync_state_frame_modes {
                push(attrs, "syncStateFrameModes", escape_xml(m));
            }
        }
        Layer::Gradient(g) => {
            if let Some(t) = &g.gradient_type {
                push(attrs, "gradientType", escape_xml(t));
            }
            if let Some(p) = g.start_point {
                push(attrs, "startPoint", point_text(p));
            }
            if let Some(p) = g.end_point {
                push(attrs, "endPoint", point_text(p));
            }
        }
        Layer::Emitter(e) => {
            if let Some(p) = e.emitter_position {
                push(attrs, "emitterPosition", point_text(p));
            }
            if let Some(s) = e.emitter_size {
                push(
                    attrs,
                    "emitterSize",
                    format!("{} {}", format_number(s.w), format_number(s.h)),
                );
            }
            if let Some(s) = &e.emitter_shape {
                push(attrs, "emitterShape", escape_xml(s));
            }
            if let Some(m) = &e.emitter_mode {
                push(attrs, "emitterMode", escape_xml(m));
            }
            if let Some(m) = &e.render_mode {
                push(attrs, "renderMode", escape_xml(m));
            }
        }
        Layer::Replicator(r) => {
            push(attrs, "instanceCount", r.instance_count.to_string());
            let t = r.instance_translation;
            if t != crate::geom::Vec3::ZERO {
                push(
                    attrs,
                    "instanceTranslation",
                    format!(
                        "{} {} {}",
                        format_number(t.x),
                        format_number(t.y),
                        format_number(t.z)
                    ),
                );
            }
            if let Some(rot) = r.instance_rotation {
                push(attrs, "instanceRotation", format_number(rot));
            }
            if let Some(d) = r.instance_delay {
                push(attrs, "instanceDelay", format_number(d));
            }
        }
        Layer::Basic(_) | Layer::Transform(_) | Layer::LiquidGlass(_) => {}
    }
}

fn has_variant_blocks(layer: &Layer) -> bool {
    match layer {
        Layer::Gradient(g) => !g.colors.is_empty(),
        Layer::Emitter(e) => !e.cells.is_empty(),
        _ => false,
    }
}

fn encode_variant_blocks(out: &mut String, layer: &Layer, depth: usize) {
    match layer {
        Layer::Gradient(g) if !g.colors.is_empty() => {
            push_line(out, depth, "<colors type=\"NSArray\">");
            for c in &g.colors {
                let location = c
                    .location
                    .map(|l| format!(" location=\"{}\"", format_number(l)))
                    .unwrap_or_default();
                push_line(
                    out,
                    depth + 1,
                    &format!("<color{location}>{}</color>", escape_xml(&c.color)),
                );
            }
            push_line(out, depth, "</colors>");
        }
        Layer::Emitter(e) if !e.cells.is_empty() => {
            push_line(out, depth, "<emitterCells type=\"NSArray\">");
            for cell in &e.cells {
                let mut attrs = Vec::new();
                if let Some(n) = &cell.name {
                    attrs.push(format!("name=\"{}\"", escape_xml(n)));
                }
                for (key, value) in [
                    ("birthRate", cell.birth_rate),
                    ("lifetime", cell.lifetime),
                    ("velocity", cell.velocity),
                    ("emissionRange", cell.emission_range),
                    ("scale", cell.scale),
                    ("spin", cell.spin),
                ] {
                    if let Some(v) = value {
                        attrs.push(format!("{key}=\"{}\"", format_number(v)));
                    }
                }
                if let Some(c) = &cell.contents {
                    attrs.push(format!("contents=\"{}\"", escape_xml(c)));
                }
                if let Some(c) = &cell.color {
                    attrs.push(format!("color=\"{}\"", escape_xml(c)));
                }
                push_line(out, depth + 1, &format!("<emitterCell {}/>", attrs.join(" ")));
            }
            push_line(out, depth, "</emitterCells>");
        }
        _ => {}
    }
}

fn encode_animation(out: &mut String, anim: &Animation, depth: usize) {
    let mut attrs = vec![format!("keyPath=\"{}\"", anim.key_path.as_str())];
    if !anim.enabled {
        attrs.push("enabled=\"0\"".to_string());
    }
    attrs.push(format!("duration=\"{}\"", format_number(anim.duration_seconds)));
    if anim.speed != 1.0 {
        attrs.push(format!("speed=\"{}\"", format_number(anim.speed)));
    }
    if anim.autoreverses != 0 {
        attrs.push(format!("autoreverses=\"{}\"", anim.autoreverses));
    }
    if anim.infinite == 0 {
        attrs.push("infinite=\"0\"".to_string());
    }
    if let Some(r) = anim.repeat_duration_seconds {
        attrs.push(format!("repeatDuration=\"{}\"", format_number(r)));
    }
    if anim.delay_ms != 0.0 {
        attrs.push(format!("delay=\"{}\"", format_number(anim.delay_ms)));
    }
    let attrs = attrs.join(" ");

    if anim.values.is_empty() {
        push_line(out, depth, &format!("<animation {attrs}/>"));
        return;
    }

    push_line(out, depth, &format!("<animation {attrs}>"));
    push_line(out, depth + 1, "<values type=\"NSArray\">");
    for value in &anim.values {
        let line = match value {
            KeyframeValue::Number(n) => format!("<real>{}</real>", format_number(*n)),
            KeyframeValue::Point(p) => format!("<point>{}</point>", point_text(*p)),
            KeyframeValue::Size(s) => format!(
                "<size>{} {}</size>",
                format_number(s.w),
                format_number(s.h)
            ),
        };
        push_line(out, depth + 2, &line);
    }
    push_line(out, depth + 1, "</values>");
    push_line(out, depth, "</animation>");
}

fn tagged_value(value: &OverrideValue) -> String {
    match value {
        OverrideValue::String(s) => format!("<string>{}</string>", escape_xml(s)),
        OverrideValue::Real(r) => format!("<real>{}</real>", format_number(*r)),
        OverrideValue::Integer(i) => format!("<integer>{i}</integer>"),
    }
}

fn point_text(p: Vec2) -> String {
    format!("{} {}", format_number(p.x), format_number(p.y))
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}

/// Wire-mandated number format: whole numbers without a decimal point,
/// otherwise at most 4 fractional digits with trailing zeros and any
/// trailing point trimmed.
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    if v == v.trunc() {
        return format!("{:.0}", v);
    }
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::states::update_state_override;

    #[test]
    fn format_number_wire_rules() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(0.12345), "0.1235");
        assert_eq!(format_number(10.1000), "10.1");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn escaping_covers_the_five_entities() {
        assert_eq!(
            escape_xml(r#"<a & "b's">"#),
            "&lt;a &amp; &quot;b&apos;s&quot;&gt;"
        );
    }

    #[test]
    fn prolog_root_and_namespace() {
        let mut doc = Document::new();
        doc.layers.push(Layer::basic("root"));
        let xml = encode_document(&doc);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<caml xmlns=\"http://www.apple.com/CoreAnimation/1.0\">"));
        assert!(xml.ends_with("</caml>\n"));
    }

    #[test]
    fn default_properties_are_omitted() {
        let mut doc = Document::new();
        let mut layer = Layer::basic("plain");
        layer.base_mut().opacity = Some(1.0);
        layer.base_mut().rotation = Some(0.0);
        layer.base_mut().corner_radius = Some(0.0);
        doc.layers.push(layer);
        let xml = encode_document(&doc);
        assert!(!xml.contains("opacity="));
        assert!(!xml.contains("rotation="));
        assert!(!xml.contains("cornerRadius="));
        assert!(!xml.contains("hidden="));
    }

    #[test]
    fn non_default_properties_are_emitted() {
        let mut doc = Document::new();
        let mut layer = Layer::basic("styled");
        layer.base_mut().opacity = Some(0.5);
        layer.base_mut().visible = Some(false);
        layer.base_mut().corner_radius = Some(8.0);
        doc.layers.push(layer);
        let xml = encode_document(&doc);
        assert!(xml.contains("opacity=\"0.5\""));
        assert!(xml.contains("hidden=\"true\""));
        assert!(xml.contains("cornerRadius=\"8\""));
    }

    #[test]
    fn empty_children_emit_no_sublayers_block() {
        let mut doc = Document::new();
        let mut layer = Layer::basic("container");
        layer.base_mut().children = Some(Vec::new());
        doc.layers.push(layer);
        let xml = encode_document(&doc);
        assert!(!xml.contains("<sublayers"));
    }

    #[test]
    fn liquid_glass_uses_class_attribute() {
        let mut doc = Document::new();
        doc.layers.push(Layer::LiquidGlass(crate::layer::LiquidGlassLayer {
            base: crate::layer::LayerBase::new("glass", crate::geom::Size::new(10.0, 10.0)),
        }));
        let xml = encode_document(&doc);
        assert!(xml.contains("<CALayer class=\"MicaLiquidGlassLayer\""));
    }

    #[test]
    fn state_blocks_appear_after_layers() {
        let mut doc = Document::new();
        doc.layers.push(Layer::basic("root"));
        doc.add_state("Locked");
        update_state_override(
            &mut doc.state_overrides,
            "Locked",
            "abcdefabcdef",
            "opacity",
            OverrideValue::Real(0.5),
        );
        let xml = encode_document(&doc);
        let states_at = xml.find("<MicaStates").unwrap();
        let overrides_at = xml.find("<MicaStateOverrides").unwrap();
        let transitions_at = xml.find("<MicaStateTransitions").unwrap();
        assert!(states_at < overrides_at);
        assert!(overrides_at < transitions_at);
        assert!(xml.contains("<string>Locked</string>"));
        assert!(!xml.contains("<string>Base State</string>"));
        assert!(xml.contains("fromState=\"*\" toState=\"Locked\""));
    }
}
