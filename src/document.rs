//! The top-level document: root sibling layers plus state metadata.
//!
//! A document is a plain value. Hosts snapshot whole documents for undo and
//! process independent documents in parallel without synchronization; nothing
//! here holds shared state.

use std::collections::BTreeSet;

use crate::{
    caml,
    error::{MicamlError, MicamlResult},
    layer::Layer,
    states::{BASE_STATE, OverrideValue, StateOverrides, apply_key_path, apply_overrides},
    tree::{all_ids, flatten_layers},
};

/// One parallax mapping: device tilt on `axis` drives `key_path` of the
/// layers named `layer_name` across `[map_min_to, map_max_to]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParallaxGroup {
    pub axis: String,
    pub layer_name: String,
    pub key_path: String,
    pub map_min_to: f64,
    pub map_max_to: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub layers: Vec<Layer>,
    /// State names; the Base State is always present and always first.
    pub states: Vec<String>,
    pub state_overrides: StateOverrides,
    pub parallax_groups: Vec<ParallaxGroup>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            states: vec![BASE_STATE.to_string()],
            state_overrides: StateOverrides::new(),
            parallax_groups: Vec::new(),
        }
    }

    /// Decode CAML text. The only failure mode is broken XML or a missing
    /// root element; everything else degrades to defaults.
    pub fn decode(xml: &str) -> MicamlResult<Self> {
        caml::decode_document(xml)
    }

    /// Serialize to CAML text, deriving the transitions block.
    pub fn encode(&self) -> String {
        caml::encode_document(self)
    }

    pub fn add_state(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.states.iter().any(|s| s == &name) {
            self.states.push(name);
        }
    }

    /// Remove a state and its overrides. The Base State cannot be removed.
    pub fn remove_state(&mut self, name: &str) {
        if name == BASE_STATE {
            return;
        }
        self.states.retain(|s| s != name);
        self.state_overrides.remove(name);
    }

    /// Rename a state, carrying its overrides. No-op for the Base State or
    /// when the new name is already taken.
    pub fn rename_state(&mut self, from: &str, to: impl Into<String>) {
        let to = to.into();
        if from == BASE_STATE || to == BASE_STATE || self.states.iter().any(|s| s == &to) {
            return;
        }
        let Some(slot) = self.states.iter_mut().find(|s| *s == from) else {
            return;
        };
        *slot = to.clone();
        if let Some(entries) = self.state_overrides.remove(from) {
            self.state_overrides.insert(to, entries);
        }
    }

    /// Project the base tree into the effective render tree for a
    /// `(state, time)` pair: state overrides first, then animation override
    /// channels on top.
    #[tracing::instrument(skip(self), fields(layers = self.layers.len()))]
    pub fn effective_layers(&self, state: &str, elapsed_ms: f64) -> Vec<Layer> {
        let projected = apply_overrides(&self.layers, &self.state_overrides, state);
        apply_animations(&projected, elapsed_ms)
    }

    /// Advisory consistency check: duplicate layer ids and overrides that
    /// target layers no longer in the tree. Decode never requires this to
    /// pass.
    pub fn validate(&self) -> MicamlResult<()> {
        let flattened = flatten_layers(&self.layers);
        let ids = all_ids(&self.layers);
        if ids.len() != flattened.len() {
            return Err(MicamlError::validation("duplicate layer ids in document"));
        }

        let known: BTreeSet<&str> = flattened.iter().map(|l| l.id()).collect();
        for (state, entries) in &self.state_overrides {
            if state == BASE_STATE {
                return Err(MicamlError::validation(
                    "the Base State must not carry overrides",
                ));
            }
            for entry in entries {
                if !known.contains(entry.target_id.as_str()) {
                    return Err(MicamlError::validation(format!(
                        "override in state '{state}' targets missing layer '{}'",
                        entry.target_id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn apply_animations(layers: &[Layer], elapsed_ms: f64) -> Vec<Layer> {
    layers
        .iter()
        .map(|layer| {
            let mut out = layer.clone();
            for anim in layer.animations() {
                for (key_path, value) in anim.override_channels(elapsed_ms) {
                    apply_key_path(&mut out, &key_path, &OverrideValue::Real(value));
                }
            }
            if let Some(children) = out.children() {
                let rebuilt = apply_animations(children, elapsed_ms);
                out.base_mut().children = Some(rebuilt);
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{Animation, AnimationKeyPath, KeyframeValue};
    use crate::geom::Vec2;
    use crate::states::{StateOverride, update_state_override};
    use crate::tree::find_by_id;

    fn doc_with_animated_layer() -> (Document, String) {
        let mut doc = Document::new();
        let mut layer = Layer::basic("dot");
        let anim = Animation::new(
            AnimationKeyPath::Position,
            vec![
                KeyframeValue::Point(Vec2::new(0.0, 0.0)),
                KeyframeValue::Point(Vec2::new(100.0, 50.0)),
            ],
            1.0,
        );
        layer.base_mut().animations = Some(vec![anim]);
        let id = layer.id().to_string();
        doc.layers.push(layer);
        (doc, id)
    }

    #[test]
    fn effective_layers_applies_animation_channels() {
        let (doc, id) = doc_with_animated_layer();
        let projected = doc.effective_layers(BASE_STATE, 500.0);
        let layer = find_by_id(&projected, &id).unwrap();
        assert_eq!(layer.position(), Vec2::new(50.0, 25.0));
        // The base document is untouched.
        assert_eq!(doc.layers[0].position(), Vec2::ZERO);
    }

    #[test]
    fn animations_stack_on_state_overrides() {
        let (mut doc, id) = doc_with_animated_layer();
        doc.add_state("Locked");
        update_state_override(
            &mut doc.state_overrides,
            "Locked",
            &id,
            "opacity",
            OverrideValue::Real(0.3),
        );
        let projected = doc.effective_layers("Locked", 500.0);
        let layer = find_by_id(&projected, &id).unwrap();
        assert_eq!(layer.opacity(), 0.3);
        assert_eq!(layer.position(), Vec2::new(50.0, 25.0));
    }

    #[test]
    fn single_keyframe_contributes_nothing() {
        let mut doc = Document::new();
        let mut layer = Layer::basic("still");
        layer.base_mut().animations = Some(vec![Animation::new(
            AnimationKeyPath::Opacity,
            vec![KeyframeValue::Number(0.5)],
            1.0,
        )]);
        let id = layer.id().to_string();
        doc.layers.push(layer);
        let projected = doc.effective_layers(BASE_STATE, 500.0);
        assert_eq!(find_by_id(&projected, &id).unwrap().opacity(), 1.0);
    }

    #[test]
    fn state_management_keeps_overrides_consistent() {
        let mut doc = Document::new();
        doc.add_state("Locked");
        doc.add_state("Locked");
        assert_eq!(doc.states.len(), 2);

        update_state_override(
            &mut doc.state_overrides,
            "Locked",
            "t1",
            "opacity",
            OverrideValue::Real(0.5),
        );
        doc.rename_state("Locked", "Sleep");
        assert_eq!(doc.states, vec![BASE_STATE, "Sleep"]);
        assert!(doc.state_overrides.contains_key("Sleep"));

        doc.remove_state("Sleep");
        assert_eq!(doc.states, vec![BASE_STATE]);
        assert!(doc.state_overrides.is_empty());

        doc.remove_state(BASE_STATE);
        assert_eq!(doc.states, vec![BASE_STATE]);
    }

    #[test]
    fn validate_flags_stale_override_targets() {
        let mut doc = Document::new();
        doc.layers.push(Layer::basic("root"));
        doc.add_state("Locked");
        doc.state_overrides.insert(
            "Locked".to_string(),
            vec![StateOverride {
                target_id: "missing00000".to_string(),
                key_path: "opacity".to_string(),
                value: OverrideValue::Real(0.5),
            }],
        );
        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_accepts_consistent_document() {
        let (mut doc, id) = doc_with_animated_layer();
        doc.add_state("Locked");
        update_state_override(
            &mut doc.state_overrides,
            "Locked",
            &id,
            "opacity",
            OverrideValue::Real(0.5),
        );
        doc.validate().unwrap();
    }
}
