//! Named states and per-(target, key path) property overrides.
//!
//! A state is a name; its content is a list of overrides relative to the
//! Base State. The Base State itself never carries overrides: it is the
//! reference point every other state diverges from.

use std::collections::BTreeMap;

use crate::{layer::Layer, tree::update_in_tree};

/// The implicit reference state. Always present, never overridden.
pub const BASE_STATE: &str = "Base State";

/// Override payloads are dynamically typed on the wire; the model keeps
/// them as an explicit tagged value instead.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OverrideValue {
    String(String),
    Real(f64),
    Integer(i64),
}

impl OverrideValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::String(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateOverride {
    pub target_id: String,
    pub key_path: String,
    pub value: OverrideValue,
}

/// All overrides in a document, grouped by state name. No entry for the
/// Base State, ever.
pub type StateOverrides = BTreeMap<String, Vec<StateOverride>>;

/// Project the base tree into the given state.
///
/// Returns a new tree with every overridden field replaced. The Base State,
/// an unknown state, or an override against a missing layer all degrade to
/// the identity on the affected part.
pub fn apply_overrides(layers: &[Layer], overrides: &StateOverrides, state: &str) -> Vec<Layer> {
    if state == BASE_STATE {
        return layers.to_vec();
    }
    let Some(entries) = overrides.get(state) else {
        return layers.to_vec();
    };

    let mut out = layers.to_vec();
    for entry in entries {
        out = update_in_tree(&out, &entry.target_id, &|layer| {
            apply_key_path(layer, &entry.key_path, &entry.value);
        });
    }
    out
}

/// Apply one override value onto a layer field. Unknown key paths and
/// value/field type mismatches are ignored.
pub fn apply_key_path(layer: &mut Layer, key_path: &str, value: &OverrideValue) {
    let base = layer.base_mut();
    match key_path {
        "position.x" => {
            if let Some(v) = value.as_f64() {
                base.position.x = v;
            }
        }
        "position.y" => {
            if let Some(v) = value.as_f64() {
                base.position.y = v;
            }
        }
        "bounds.size.width" => {
            if let Some(v) = value.as_f64() {
                base.size.w = v;
            }
        }
        "bounds.size.height" => {
            if let Some(v) = value.as_f64() {
                base.size.h = v;
            }
        }
        "opacity" => {
            if let Some(v) = value.as_f64() {
                base.opacity = Some(v);
            }
        }
        "zPosition" => {
            if let Some(v) = value.as_f64() {
                base.z_position = Some(v);
            }
        }
        "cornerRadius" => {
            if let Some(v) = value.as_f64() {
                base.corner_radius = Some(v);
            }
        }
        "transform.rotation.z" | "transform.rotation" => {
            if let Some(v) = value.as_f64() {
                base.rotation = Some(v);
            }
        }
        "transform.rotation.x" => {
            if let Some(v) = value.as_f64() {
                base.rotation_x = Some(v);
            }
        }
        "transform.rotation.y" => {
            if let Some(v) = value.as_f64() {
                base.rotation_y = Some(v);
            }
        }
        "backgroundColor" => {
            if let OverrideValue::String(s) = value {
                base.background_color = Some(s.clone());
            }
        }
        "hidden" => {
            if let Some(v) = value.as_f64() {
                base.visible = Some(v == 0.0);
            }
        }
        _ => {}
    }
}

/// Upsert an override for `(target_id, key_path)` in `state`.
///
/// Editing overrides while on the Base State is a no-op by definition.
pub fn update_state_override(
    overrides: &mut StateOverrides,
    state: &str,
    target_id: &str,
    key_path: &str,
    value: OverrideValue,
) {
    if state == BASE_STATE {
        return;
    }
    let entries = overrides.entry(state.to_string()).or_default();
    if let Some(existing) = entries
        .iter_mut()
        .find(|o| o.target_id == target_id && o.key_path == key_path)
    {
        existing.value = value;
    } else {
        entries.push(StateOverride {
            target_id: target_id.to_string(),
            key_path: key_path.to_string(),
            value,
        });
    }
}

pub fn remove_state_override(
    overrides: &mut StateOverrides,
    state: &str,
    target_id: &str,
    key_path: &str,
) {
    if let Some(entries) = overrides.get_mut(state) {
        entries.retain(|o| !(o.target_id == target_id && o.key_path == key_path));
        if entries.is_empty() {
            overrides.remove(state);
        }
    }
}

/// Resolve the state to render for a base name plus an optional appearance
/// suffix (`"Light"`/`"Dark"`). Fallback chain: suffixed name if it exists,
/// then the unsuffixed name, then the Base State.
pub fn effective_state_name(states: &[String], base: &str, appearance: Option<&str>) -> String {
    if let Some(appearance) = appearance {
        let suffixed = format!("{base} {appearance}");
        if states.iter().any(|s| s == &suffixed) {
            return suffixed;
        }
    }
    if states.iter().any(|s| s == base) {
        return base.to_string();
    }
    BASE_STATE.to_string()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionElement {
    pub target_id: String,
    pub key_path: String,
    pub animation: Option<String>,
}

/// A derived description of what changes between two states. Never
/// hand-edited; rebuilt from the override sets at serialization time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    pub from_state: String,
    pub to_state: String,
    pub elements: Vec<TransitionElement>,
}

/// On the wire the Base State appears as `*` in transition endpoints.
pub fn transition_state_name(state: &str) -> &str {
    if state == BASE_STATE { "*" } else { state }
}

/// Build transition descriptors for every ordered pair of distinct states.
///
/// An element is listed when the `(target, key path)` value differs between
/// the two endpoint states; an override present on only one side counts as
/// differing (the other side holds the base value).
pub fn derive_transitions(states: &[String], overrides: &StateOverrides) -> Vec<Transition> {
    let empty: Vec<StateOverride> = Vec::new();
    let mut out = Vec::new();

    for from in states {
        for to in states {
            if from == to {
                continue;
            }
            let from_entries = overrides.get(from).unwrap_or(&empty);
            let to_entries = overrides.get(to).unwrap_or(&empty);

            let mut keys: Vec<(String, String)> = Vec::new();
            for entry in from_entries.iter().chain(to_entries) {
                let key = (entry.target_id.clone(), entry.key_path.clone());
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }

            let mut elements = Vec::new();
            for (target_id, key_path) in keys {
                let a = from_entries
                    .iter()
                    .find(|o| o.target_id == target_id && o.key_path == key_path)
                    .map(|o| &o.value);
                let b = to_entries
                    .iter()
                    .find(|o| o.target_id == target_id && o.key_path == key_path)
                    .map(|o| &o.value);
                if a != b {
                    elements.push(TransitionElement {
                        target_id,
                        key_path,
                        animation: None,
                    });
                }
            }

            if !elements.is_empty() {
                out.push(Transition {
                    from_state: transition_state_name(from).to_string(),
                    to_state: transition_state_name(to).to_string(),
                    elements,
                });
            }
        }
    }

    out
}
