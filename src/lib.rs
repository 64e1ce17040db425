//! micaml is the core of an animated-wallpaper scene editor: the layer
//! document model, the CAML XML codec, and the state/animation projection
//! engine.
//!
//! Everything here is synchronous and value-oriented:
//!
//! - Decode a [`Document`] from CAML text, or build one with the tree
//!   operations in [`tree`]
//! - Project it into an effective render tree for a `(state, time)` pair
//!   with [`Document::effective_layers`]
//! - Serialize it back with [`Document::encode`]
//!
//! There is no rendering, no I/O beyond the [`storage`] port, and no internal
//! concurrency; hosts may process independent documents in parallel freely.
#![forbid(unsafe_code)]

pub mod anim;
pub mod caml;
pub mod document;
pub mod error;
pub mod geom;
pub mod id;
pub mod layer;
pub mod states;
pub mod storage;
pub mod tree;

pub use anim::{Animation, AnimationKeyPath, KeyframeValue};
pub use document::{Document, ParallaxGroup};
pub use error::{MicamlError, MicamlResult};
pub use geom::{Size, Vec2, Vec3};
pub use layer::{Layer, LayerBase, ShapeKind};
pub use states::{BASE_STATE, OverrideValue, StateOverride, StateOverrides};
