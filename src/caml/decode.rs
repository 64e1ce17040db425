//! CAML text → layer document.
//!
//! Decoding is deliberately permissive: the format is externally authored,
//! so everything short of broken XML degrades to documented defaults. The
//! only hard failures come from `element::parse_document`.

use crate::{
    anim::{Animation, AnimationKeyPath, KeyframeValue},
    caml::element::{XmlElement, parse_document},
    document::{Document, ParallaxGroup},
    error::MicamlResult,
    geom::{Size, Vec2, Vec3},
    id::generate_layer_id,
    layer::{
        BasicLayer, EmitterCell, EmitterLayer, Filter, GradientColor, GradientLayer, ImageLayer,
        Layer, LayerBase, LiquidGlassLayer, ReplicatorLayer, ShapeKind, ShapeLayer, TextLayer,
        TransformLayer, VideoLayer,
    },
    states::{BASE_STATE, OverrideValue, StateOverride, StateOverrides},
};

/// Decode a whole CAML document. A bare layer element without the `<caml>`
/// wrapper is accepted and treated as a single-layer document.
#[tracing::instrument(skip(xml), fields(len = xml.len()))]
pub fn decode_document(xml: &str) -> MicamlResult<Document> {
    let root = parse_document(xml)?;

    if root.name != "caml" {
        let mut doc = Document::new();
        doc.layers = vec![decode_layer(&root)];
        return Ok(doc);
    }

    let mut doc = Document::new();
    for child in &root.children {
        match child.name.as_str() {
            "MicaStates" => decode_states(child, &mut doc.states),
            "MicaStateOverrides" => decode_overrides(child, &mut doc.state_overrides),
            // Transitions are a derived projection; never decoded back.
            "MicaStateTransitions" => {}
            "wallpaperParallaxGroups" => decode_parallax_groups(child, &mut doc.parallax_groups),
            _ => doc.layers.push(decode_layer(child)),
        }
    }
    Ok(doc)
}

/// Decode one layer element, recursively.
pub fn decode_layer(el: &XmlElement) -> Layer {
    let base = decode_base(el);
    match layer_kind(el) {
        "text" => Layer::Text(TextLayer {
            base,
            text: el
                .string_value("string")
                .or_else(|| el.string_value("text"))
                .unwrap_or_default(),
            font_family: el
                .string_value("fontName")
                .or_else(|| el.string_value("fontFamily")),
            font_size: el.f64_value("fontSize"),
            color: el
                .string_value("foregroundColor")
                .or_else(|| el.string_value("color")),
            align: el
                .string_value("alignmentMode")
                .or_else(|| el.string_value("align")),
            wrapped: el.int_value("wrapped"),
        }),
        "image" => Layer::Image(ImageLayer {
            base,
            src: el
                .string_value("contentsPath")
                .or_else(|| el.string_value("src"))
                .unwrap_or_default(),
            fit: el.string_value("fit"),
        }),
        "shape" => Layer::Shape(ShapeLayer {
            base,
            shape: el
                .string_value("shape")
                .map(|s| ShapeKind::parse_or_default(&s))
                .unwrap_or_default(),
            fill: el
                .string_value("fillColor")
                .or_else(|| el.string_value("fill")),
            stroke: el
                .string_value("strokeColor")
                .or_else(|| el.string_value("stroke")),
            stroke_width: el
                .f64_value("lineWidth")
                .or_else(|| el.f64_value("strokeWidth")),
            radius: el.f64_value("radius"),
        }),
        "video" => Layer::Video(VideoLayer {
            base,
            frame_count: el.int_value("frameCount").unwrap_or(0).max(0) as u32,
            fps: el.f64_value("fps").unwrap_or(30.0),
            duration: el.f64_value("duration"),
            frame_prefix: el.string_value("framePrefix").unwrap_or_default(),
            frame_extension: el.string_value("frameExtension").unwrap_or_default(),
            calculation_mode: el.string_value("calculationMode"),
            autoreverses: el.int_value("autoreverses"),
            sync_with_state: el
                .string_value("syncWithState")
                .map(|s| s == "true" || s == "1"),
            sync_state_frame_modes: el.string_value("syncStateFrameModes"),
        }),
        "gradient" => Layer::Gradient(GradientLayer {
            base,
            gradient_type: el.string_value("gradientType"),
            start_point: el.string_value("startPoint").and_then(|s| parse_point(&s)),
            end_point: el.string_value("endPoint").and_then(|s| parse_point(&s)),
            colors: decode_gradient_colors(el),
        }),
        "emitter" => Layer::Emitter(EmitterLayer {
            base,
            emitter_position: el
                .string_value("emitterPosition")
                .and_then(|s| parse_point(&s)),
            emitter_size: el.string_value("emitterSize").and_then(|s| parse_size(&s)),
            emitter_shape: el.string_value("emitterShape"),
            emitter_mode: el.string_value("emitterMode"),
            render_mode: el.string_value("renderMode"),
            cells: decode_emitter_cells(el),
        }),
        "transform" => Layer::Transform(TransformLayer { base }),
        "replicator" => Layer::Replicator(ReplicatorLayer {
            base,
            instance_count: el.int_value("instanceCount").unwrap_or(1),
            instance_translation: el
                .string_value("instanceTranslation")
                .and_then(|s| parse_vec3(&s))
                .unwrap_or(Vec3::ZERO),
            instance_rotation: el.f64_value("instanceRotation"),
            instance_delay: el.f64_value("instanceDelay"),
        }),
        "liquidGlass" => Layer::LiquidGlass(LiquidGlassLayer { base }),
        // Unknown kinds degrade to basic; see error policy.
        _ => Layer::Basic(BasicLayer { base }),
    }
}

/// Case-insensitive kind lookup: an explicit `type` attribute wins, then
/// the `class` attribute marking liquid glass, then the tag name. Anything
/// unrecognized is `basic`.
fn layer_kind(el: &XmlElement) -> &'static str {
    if let Some(ty) = el.attr("type") {
        // `type="NSArray"` style annotations live on container blocks, not
        // layers, so anything reaching here is meant as a discriminator.
        return kind_from_token(ty);
    }
    if el.attr("class") == Some("MicaLiquidGlassLayer") {
        return "liquidGlass";
    }
    kind_from_token(&el.name)
}

fn kind_from_token(token: &str) -> &'static str {
    match token.to_ascii_lowercase().as_str() {
        "calayer" | "layer" | "basic" => "basic",
        "catextlayer" | "text" => "text",
        "caimagelayer" | "image" => "image",
        "cashapelayer" | "shape" => "shape",
        "caemitterlayer" | "emitter" => "emitter",
        "cagradientlayer" | "gradient" => "gradient",
        "careplicatorlayer" | "replicator" => "replicator",
        "catransformlayer" | "transform" => "transform",
        "cavideolayer" | "video" => "video",
        "micaliquidglasslayer" | "liquidglass" => "liquidGlass",
        other => {
            tracing::debug!(kind = other, "unknown layer kind, defaulting to basic");
            "basic"
        }
    }
}

fn decode_base(el: &XmlElement) -> LayerBase {
    let mut base = LayerBase {
        id: el.string_value("id").unwrap_or_else(generate_layer_id),
        name: el.string_value("name").unwrap_or_default(),
        position: el
            .string_value("position")
            .and_then(|s| parse_point(&s))
            .unwrap_or(Vec2::ZERO),
        size: el
            .string_value("bounds")
            .and_then(|s| parse_bounds_size(&s))
            .or_else(|| el.string_value("size").and_then(|s| parse_size(&s)))
            .unwrap_or(Size::ZERO),
        z_position: el.f64_value("zPosition"),
        rotation: el.f64_value("rotation"),
        rotation_x: el.f64_value("rotationX"),
        rotation_y: el.f64_value("rotationY"),
        anchor_point: el.string_value("anchorPoint").and_then(|s| parse_point(&s)),
        opacity: el.f64_value("opacity"),
        // Only an explicit hidden="true" survives; anything else is the
        // default (visible), kept absent so re-encoding stays terse.
        visible: match el.string_value("hidden").as_deref() {
            Some("true") => Some(false),
            _ => None,
        },
        background_color: el.string_value("backgroundColor"),
        background_opacity: el.f64_value("backgroundOpacity"),
        border_color: el.string_value("borderColor"),
        border_width: el.f64_value("borderWidth"),
        corner_radius: el.f64_value("cornerRadius"),
        blend_mode: el.string_value("blendMode"),
        filters: decode_filters(el),
        masks_to_bounds: el.int_value("masksToBounds"),
        geometry_flipped: el.int_value("geometryFlipped"),
        children: None,
        animations: decode_animations(el),
    };

    let container = el.child("sublayers").or_else(|| el.child("children"));
    if let Some(container) = container {
        let children: Vec<Layer> = container.children.iter().map(decode_layer).collect();
        // Empty container collapses to a leaf; the encoder omits empty
        // sublayer blocks, so this is where the round trip closes.
        if !children.is_empty() {
            base.children = Some(children);
        }
    }

    base
}

fn decode_filters(el: &XmlElement) -> Option<Vec<Filter>> {
    let block = el.child("filters")?;
    let filters: Vec<Filter> = block
        .children_named("filter")
        .map(|f| Filter {
            name: f.attr("name").unwrap_or_default().to_string(),
            value: f.f64_value("value"),
        })
        .collect();
    if filters.is_empty() { None } else { Some(filters) }
}

fn decode_animations(el: &XmlElement) -> Option<Vec<Animation>> {
    let block = el.child("animations")?;
    let mut out = Vec::new();
    for anim_el in block.children_named("animation") {
        let Some(key_path) = anim_el
            .string_value("keyPath")
            .and_then(|s| AnimationKeyPath::parse(&s))
        else {
            tracing::debug!("animation with unknown keyPath skipped");
            continue;
        };
        let values = anim_el
            .child("values")
            .map(|v| v.children.iter().filter_map(decode_keyframe_value).collect())
            .unwrap_or_default();
        out.push(Animation {
            key_path,
            enabled: anim_el.int_value("enabled").unwrap_or(1) != 0,
            values,
            duration_seconds: anim_el.f64_value("duration").unwrap_or(0.0),
            speed: anim_el.f64_value("speed").unwrap_or(1.0),
            autoreverses: anim_el.int_value("autoreverses").unwrap_or(0),
            infinite: anim_el.int_value("infinite").unwrap_or(1),
            repeat_duration_seconds: anim_el.f64_value("repeatDuration"),
            delay_ms: anim_el.f64_value("delay").unwrap_or(0.0),
        });
    }
    if out.is_empty() { None } else { Some(out) }
}

fn decode_keyframe_value(el: &XmlElement) -> Option<KeyframeValue> {
    let text = el.text.as_deref().unwrap_or("");
    match el.name.as_str() {
        "real" | "integer" => text.trim().parse().ok().map(KeyframeValue::Number),
        "point" => parse_point(text).map(KeyframeValue::Point),
        "size" => parse_size(text).map(KeyframeValue::Size),
        _ => None,
    }
}

fn decode_gradient_colors(el: &XmlElement) -> Vec<GradientColor> {
    let Some(block) = el.child("colors") else {
        return Vec::new();
    };
    block
        .children_named("color")
        .map(|c| GradientColor {
            color: c.text.clone().unwrap_or_default(),
            location: c.f64_value("location"),
        })
        .collect()
}

fn decode_emitter_cells(el: &XmlElement) -> Vec<EmitterCell> {
    let block = el.child("emitterCells").or_else(|| el.child("cells"));
    let Some(block) = block else {
        return Vec::new();
    };
    block
        .children_named("emitterCell")
        .map(|c| EmitterCell {
            name: c.string_value("name"),
            birth_rate: c.f64_value("birthRate"),
            lifetime: c.f64_value("lifetime"),
            velocity: c.f64_value("velocity"),
            emission_range: c.f64_value("emissionRange"),
            scale: c.f64_value("scale"),
            spin: c.f64_value("spin"),
            contents: c.string_value("contents"),
            color: c.string_value("color"),
        })
        .collect()
}

fn decode_states(el: &XmlElement, states: &mut Vec<String>) {
    for child in el.children_named("string") {
        if let Some(name) = &child.text {
            if name != BASE_STATE && !states.iter().any(|s| s == name) {
                states.push(name.clone());
            }
        }
    }
}

fn decode_overrides(el: &XmlElement, overrides: &mut StateOverrides) {
    let mut iter = el.children.iter();
    while let Some(child) = iter.next() {
        if child.name != "key" {
            continue;
        }
        let Some(state) = child.text.clone() else {
            continue;
        };
        let Some(array) = iter.next() else { break };
        let entries: Vec<StateOverride> = array
            .children_named("dict")
            .filter_map(decode_override_dict)
            .collect();
        if !entries.is_empty() && state != BASE_STATE {
            overrides.insert(state, entries);
        }
    }
}

fn decode_override_dict(dict: &XmlElement) -> Option<StateOverride> {
    let target_id = dict.string_value("targetId")?;
    let key_path = dict.string_value("keyPath")?;
    let value = decode_tagged_value(dict, "value")?;
    Some(StateOverride {
        target_id,
        key_path,
        value,
    })
}

/// Read a `<key>name</key><real|integer|string>` pair, keeping the tag as
/// the value's type.
fn decode_tagged_value(dict: &XmlElement, key: &str) -> Option<OverrideValue> {
    let mut iter = dict.children.iter();
    while let Some(child) = iter.next() {
        if child.name == "key" && child.text.as_deref() == Some(key) {
            let value_el = iter.next()?;
            let text = value_el.text.clone().unwrap_or_default();
            return Some(match value_el.name.as_str() {
                "real" => OverrideValue::Real(text.trim().parse().ok()?),
                "integer" => OverrideValue::Integer(text.trim().parse().ok()?),
                _ => OverrideValue::String(text),
            });
        }
    }
    None
}

fn decode_parallax_groups(el: &XmlElement, groups: &mut Vec<ParallaxGroup>) {
    for dict in el.children_named("dict") {
        let Some(axis) = dict.string_value("axis") else {
            continue;
        };
        groups.push(ParallaxGroup {
            axis,
            layer_name: dict.string_value("layerName").unwrap_or_default(),
            key_path: dict.string_value("keyPath").unwrap_or_default(),
            map_min_to: dict.f64_value("mapMinTo").unwrap_or(0.0),
            map_max_to: dict.f64_value("mapMaxTo").unwrap_or(0.0),
        });
    }
}

pub(crate) fn parse_point(s: &str) -> Option<Vec2> {
    let parts = split_numbers(s);
    match parts.as_slice() {
        [x, y] => Some(Vec2::new(*x, *y)),
        _ => None,
    }
}

pub(crate) fn parse_size(s: &str) -> Option<Size> {
    let parts = split_numbers(s);
    match parts.as_slice() {
        [w, h] => Some(Size::new(*w, *h)),
        _ => None,
    }
}

pub(crate) fn parse_vec3(s: &str) -> Option<Vec3> {
    let parts = split_numbers(s);
    match parts.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

/// `"x y w h"` rects carry the size in the last two components.
pub(crate) fn parse_bounds_size(s: &str) -> Option<Size> {
    let parts = split_numbers(s);
    match parts.as_slice() {
        [_, _, w, h] => Some(Size::new(*w, *h)),
        _ => None,
    }
}

fn split_numbers(s: &str) -> Vec<f64> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_two_layer_scenario() {
        let xml = r#"<caml xmlns="http://www.apple.com/CoreAnimation/1.0">
            <CALayer id="aaaaaaaaaaaa" name="root">
                <sublayers type="NSArray">
                    <CATextLayer id="bbbbbbbbbbbb" name="label" string="Hi"/>
                </sublayers>
            </CALayer>
        </caml>"#;
        let doc = decode_document(xml).unwrap();
        assert_eq!(doc.layers.len(), 1);
        let root = &doc.layers[0];
        let children = root.children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].layer_type(), "text");
        match &children[0] {
            Layer::Text(t) => assert_eq!(t.text, "Hi"),
            other => panic!("expected text layer, got {}", other.layer_type()),
        }
    }

    #[test]
    fn unknown_kind_falls_back_to_basic() {
        let doc = decode_document(r#"<CALayer type="totallyUnknown" id="x" name="n"/>"#).unwrap();
        assert_eq!(doc.layers[0].layer_type(), "basic");
    }

    #[test]
    fn hidden_true_maps_to_invisible() {
        let doc = decode_document(r#"<CALayer id="x" name="n" hidden="true"/>"#).unwrap();
        assert!(!doc.layers[0].visible());
        let doc = decode_document(r#"<CALayer id="x" name="n" hidden="nope"/>"#).unwrap();
        assert!(doc.layers[0].visible());
    }

    #[test]
    fn liquid_glass_class_attribute() {
        let doc =
            decode_document(r#"<CALayer class="MicaLiquidGlassLayer" id="x" name="g"/>"#).unwrap();
        assert_eq!(doc.layers[0].layer_type(), "liquidGlass");
    }

    #[test]
    fn empty_sublayers_block_is_a_leaf() {
        let doc = decode_document(
            r#"<CALayer id="x" name="n"><sublayers type="NSArray"></sublayers></CALayer>"#,
        )
        .unwrap();
        assert!(doc.layers[0].children().is_none());
    }

    #[test]
    fn bounds_rect_yields_size() {
        let doc =
            decode_document(r#"<CALayer id="x" name="n" bounds="0 0 320 240"/>"#).unwrap();
        assert_eq!(doc.layers[0].size(), Size::new(320.0, 240.0));
    }

    #[test]
    fn plist_pair_convention_is_honored() {
        let xml = r#"<CALayer id="x" name="n">
            <key>opacity</key><real>0.25</real>
        </CALayer>"#;
        let doc = decode_document(xml).unwrap();
        assert_eq!(doc.layers[0].opacity(), 0.25);
    }

    #[test]
    fn malformed_numeric_fields_use_defaults() {
        let doc = decode_document(
            r#"<CAShapeLayer id="x" name="n" lineWidth="thick" shape="blob"/>"#,
        )
        .unwrap();
        match &doc.layers[0] {
            Layer::Shape(s) => {
                assert_eq!(s.stroke_width, None);
                assert_eq!(s.shape, ShapeKind::Rect);
            }
            other => panic!("expected shape, got {}", other.layer_type()),
        }
    }

    #[test]
    fn missing_id_is_generated() {
        let doc = decode_document(r#"<CALayer name="n"/>"#).unwrap();
        assert_eq!(doc.layers[0].id().len(), 12);
    }

    #[test]
    fn animations_decode_with_values() {
        let xml = r#"<CALayer id="x" name="n">
            <animations type="NSArray">
                <animation keyPath="opacity" duration="2">
                    <values type="NSArray">
                        <real>0</real>
                        <real>1</real>
                    </values>
                </animation>
                <animation keyPath="wobble" duration="1"/>
            </animations>
        </CALayer>"#;
        let doc = decode_document(xml).unwrap();
        let anims = doc.layers[0].animations();
        // The unknown keyPath track is skipped.
        assert_eq!(anims.len(), 1);
        assert_eq!(anims[0].key_path, AnimationKeyPath::Opacity);
        assert_eq!(anims[0].duration_seconds, 2.0);
        assert_eq!(anims[0].values.len(), 2);
        assert!(anims[0].enabled);
        assert_eq!(anims[0].infinite, 1);
    }

    #[test]
    fn states_and_overrides_blocks_decode() {
        let xml = r#"<caml xmlns="http://www.apple.com/CoreAnimation/1.0">
            <CALayer id="target000000" name="n"/>
            <MicaStates type="NSArray">
                <string>Locked</string>
                <string>Sleep</string>
            </MicaStates>
            <MicaStateOverrides type="NSDictionary">
                <key>Locked</key>
                <array type="NSArray">
                    <dict>
                        <key>targetId</key><string>target000000</string>
                        <key>keyPath</key><string>opacity</string>
                        <key>value</key><real>0.5</real>
                    </dict>
                </array>
            </MicaStateOverrides>
        </caml>"#;
        let doc = decode_document(xml).unwrap();
        assert_eq!(doc.states, vec![BASE_STATE, "Locked", "Sleep"]);
        let entries = doc.state_overrides.get("Locked").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, OverrideValue::Real(0.5));
    }

    #[test]
    fn parallax_groups_decode() {
        let xml = r#"<caml xmlns="http://www.apple.com/CoreAnimation/1.0">
            <CALayer id="x" name="n"/>
            <wallpaperParallaxGroups type="NSArray">
                <dict>
                    <key>axis</key><string>x</string>
                    <key>layerName</key><string>bg</string>
                    <key>keyPath</key><string>position.x</string>
                    <key>mapMinTo</key><real>-10</real>
                    <key>mapMaxTo</key><real>10</real>
                </dict>
            </wallpaperParallaxGroups>
        </caml>"#;
        let doc = decode_document(xml).unwrap();
        assert_eq!(doc.parallax_groups.len(), 1);
        assert_eq!(doc.parallax_groups[0].axis, "x");
        assert_eq!(doc.parallax_groups[0].map_min_to, -10.0);
    }

    #[test]
    fn point_parsing_accepts_space_and_comma() {
        assert_eq!(parse_point("1 2"), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(parse_point("1,2"), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(parse_point("1"), None);
        assert_eq!(parse_vec3("1 2 3"), Some(Vec3::new(1.0, 2.0, 3.0)));
    }
}
