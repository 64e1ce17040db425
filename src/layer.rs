//! The layer document model.
//!
//! A document is a tree of [`Layer`] values. `Layer` is a closed sum over the
//! ten kinds the CAML dialect knows; every variant carries the shared
//! [`LayerBase`] record plus its own payload. Uniform fields are reached
//! through accessors that match on the variant, so callers never need to know
//! the kind to read or write geometry, opacity, or children.

use crate::{
    anim::Animation,
    geom::{Size, Vec2, Vec3},
    id::generate_layer_id,
};

/// Shared property set carried by every layer variant.
///
/// Optional fields are tri-state on the wire: absent means "use the default",
/// which the encoder exploits by omitting properties equal to their default.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerBase {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    pub size: Size,
    pub z_position: Option<f64>,
    pub rotation: Option<f64>,
    pub rotation_x: Option<f64>,
    pub rotation_y: Option<f64>,
    pub anchor_point: Option<Vec2>,
    pub opacity: Option<f64>,
    pub visible: Option<bool>,
    pub background_color: Option<String>,
    pub background_opacity: Option<f64>,
    pub border_color: Option<String>,
    pub border_width: Option<f64>,
    pub corner_radius: Option<f64>,
    pub blend_mode: Option<String>,
    pub filters: Option<Vec<Filter>>,
    pub masks_to_bounds: Option<i64>,
    pub geometry_flipped: Option<i64>,
    /// `None` is a leaf; `Some(vec![])` is an empty container. The codec
    /// preserves the distinction on round-trip.
    pub children: Option<Vec<Layer>>,
    pub animations: Option<Vec<Animation>>,
}

impl LayerBase {
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        Self {
            id: generate_layer_id(),
            name: name.into(),
            position: Vec2::ZERO,
            size,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    pub name: String,
    pub value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Layer {
    Basic(BasicLayer),
    Image(ImageLayer),
    Text(TextLayer),
    Shape(ShapeLayer),
    Video(VideoLayer),
    Gradient(GradientLayer),
    Emitter(EmitterLayer),
    Transform(TransformLayer),
    Replicator(ReplicatorLayer),
    LiquidGlass(LiquidGlassLayer),
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasicLayer {
    pub base: LayerBase,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageLayer {
    pub base: LayerBase,
    /// Relative asset path, conventionally `assets/<name>`. The core never
    /// reads the bytes; resolution is the host's job.
    pub src: String,
    pub fit: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextLayer {
    pub base: LayerBase,
    pub text: String,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub color: Option<String>,
    pub align: Option<String>,
    pub wrapped: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShapeKind {
    #[default]
    Rect,
    Circle,
    RoundedRect,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::RoundedRect => "rounded-rect",
        }
    }

    /// Parse against the closed value set; anything else falls back to `Rect`.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "rounded-rect" => Self::RoundedRect,
            _ => Self::Rect,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeLayer {
    pub base: LayerBase,
    pub shape: ShapeKind,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoLayer {
    pub base: LayerBase,
    pub frame_count: u32,
    pub fps: f64,
    pub duration: Option<f64>,
    pub frame_prefix: String,
    pub frame_extension: String,
    pub calculation_mode: Option<String>,
    pub autoreverses: Option<i64>,
    pub sync_with_state: Option<bool>,
    pub sync_state_frame_modes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientColor {
    pub color: String,
    pub location: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientLayer {
    pub base: LayerBase,
    pub gradient_type: Option<String>,
    pub start_point: Option<Vec2>,
    pub end_point: Option<Vec2>,
    pub colors: Vec<GradientColor>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmitterCell {
    pub name: Option<String>,
    pub birth_rate: Option<f64>,
    pub lifetime: Option<f64>,
    pub velocity: Option<f64>,
    pub emission_range: Option<f64>,
    pub scale: Option<f64>,
    pub spin: Option<f64>,
    pub contents: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmitterLayer {
    pub base: LayerBase,
    pub emitter_position: Option<Vec2>,
    pub emitter_size: Option<Size>,
    pub emitter_shape: Option<String>,
    pub emitter_mode: Option<String>,
    pub render_mode: Option<String>,
    pub cells: Vec<EmitterCell>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformLayer {
    pub base: LayerBase,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplicatorLayer {
    pub base: LayerBase,
    pub instance_count: i64,
    pub instance_translation: Vec3,
    pub instance_rotation: Option<f64>,
    pub instance_delay: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquidGlassLayer {
    pub base: LayerBase,
}

impl Layer {
    pub fn basic(name: impl Into<String>) -> Self {
        Self::Basic(BasicLayer {
            base: LayerBase::new(name, Size::new(100.0, 100.0)),
        })
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text(TextLayer {
            base: LayerBase::new(name, Size::new(200.0, 40.0)),
            text: text.into(),
            ..TextLayer::default()
        })
    }

    pub fn image(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self::Image(ImageLayer {
            base: LayerBase::new(name, Size::new(100.0, 100.0)),
            src: src.into(),
            fit: None,
        })
    }

    pub fn shape(name: impl Into<String>, shape: ShapeKind) -> Self {
        Self::Shape(ShapeLayer {
            base: LayerBase::new(name, Size::new(100.0, 100.0)),
            shape,
            ..ShapeLayer::default()
        })
    }

    pub fn base(&self) -> &LayerBase {
        match self {
            Self::Basic(l) => &l.base,
            Self::Image(l) => &l.base,
            Self::Text(l) => &l.base,
            Self::Shape(l) => &l.base,
            Self::Video(l) => &l.base,
            Self::Gradient(l) => &l.base,
            Self::Emitter(l) => &l.base,
            Self::Transform(l) => &l.base,
            Self::Replicator(l) => &l.base,
            Self::LiquidGlass(l) => &l.base,
        }
    }

    /// Mutable access to the shared record. The variant payload is untouched,
    /// so uniform-field edits are lossless by construction.
    pub fn base_mut(&mut self) -> &mut LayerBase {
        match self {
            Self::Basic(l) => &mut l.base,
            Self::Image(l) => &mut l.base,
            Self::Text(l) => &mut l.base,
            Self::Shape(l) => &mut l.base,
            Self::Video(l) => &mut l.base,
            Self::Gradient(l) => &mut l.base,
            Self::Emitter(l) => &mut l.base,
            Self::Transform(l) => &mut l.base,
            Self::Replicator(l) => &mut l.base,
            Self::LiquidGlass(l) => &mut l.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn position(&self) -> Vec2 {
        self.base().position
    }

    pub fn size(&self) -> Size {
        self.base().size
    }

    /// Effective opacity; absent means fully opaque.
    pub fn opacity(&self) -> f64 {
        self.base().opacity.unwrap_or(1.0)
    }

    /// Effective z rotation in degrees; absent means 0.
    pub fn rotation(&self) -> f64 {
        self.base().rotation.unwrap_or(0.0)
    }

    /// Effective visibility; absent means visible.
    pub fn visible(&self) -> bool {
        self.base().visible.unwrap_or(true)
    }

    pub fn corner_radius(&self) -> f64 {
        self.base().corner_radius.unwrap_or(0.0)
    }

    pub fn background_color(&self) -> Option<&str> {
        self.base().background_color.as_deref()
    }

    pub fn children(&self) -> Option<&[Layer]> {
        self.base().children.as_deref()
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Layer>> {
        self.base_mut().children.as_mut()
    }

    pub fn animations(&self) -> &[Animation] {
        self.base().animations.as_deref().unwrap_or(&[])
    }

    /// Stable lowercase type discriminator, one-to-one with the variant.
    pub fn layer_type(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Image(_) => "image",
            Self::Text(_) => "text",
            Self::Shape(_) => "shape",
            Self::Video(_) => "video",
            Self::Gradient(_) => "gradient",
            Self::Emitter(_) => "emitter",
            Self::Transform(_) => "transform",
            Self::Replicator(_) => "replicator",
            Self::LiquidGlass(_) => "liquidGlass",
        }
    }

    /// Human-facing kind label for UI and debug output.
    pub fn display_type_name(&self) -> &'static str {
        match self {
            Self::Basic(_) => "Layer",
            Self::Image(_) => "Image",
            Self::Text(_) => "Text",
            Self::Shape(_) => "Shape",
            Self::Video(_) => "Video",
            Self::Gradient(_) => "Gradient",
            Self::Emitter(_) => "Emitter",
            Self::Transform(_) => "Transform",
            Self::Replicator(_) => "Replicator",
            Self::LiquidGlass(_) => "Liquid Glass",
        }
    }

    /// Kinds that may hold children inserted via selection policy.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Basic(_) | Self::Transform(_) | Self::Replicator(_)
        )
    }
}
