//! Per-layer keyframe tracks and the interpolation engine.
//!
//! An [`Animation`] describes one forward traversal of a value path on a
//! single key path. Evaluation is a pure function of the global clock: there
//! is no internal play state, only HELD (before the delay) and PLAYING (a
//! perpetual modulo loop). Finite-repeat cutoff is the caller's policy.

use crate::geom::{Lerp, Size, Vec2};

/// Closed set of animatable key paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnimationKeyPath {
    Position,
    PositionX,
    PositionY,
    Bounds,
    Opacity,
    RotationX,
    RotationY,
    RotationZ,
}

impl AnimationKeyPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::PositionX => "position.x",
            Self::PositionY => "position.y",
            Self::Bounds => "bounds",
            Self::Opacity => "opacity",
            Self::RotationX => "transform.rotation.x",
            Self::RotationY => "transform.rotation.y",
            Self::RotationZ => "transform.rotation.z",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "position" => Some(Self::Position),
            "position.x" => Some(Self::PositionX),
            "position.y" => Some(Self::PositionY),
            "bounds" => Some(Self::Bounds),
            "opacity" => Some(Self::Opacity),
            "transform.rotation.x" => Some(Self::RotationX),
            "transform.rotation.y" => Some(Self::RotationY),
            "transform.rotation.z" | "transform.rotation" => Some(Self::RotationZ),
            _ => None,
        }
    }
}

/// A keyframe waypoint. The expected shape depends on the key path:
/// `position`/`bounds` carry vectors, everything else carries numbers.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum KeyframeValue {
    Number(f64),
    Point(Vec2),
    Size(Size),
}

impl KeyframeValue {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        match (a, b) {
            (Self::Number(x), Self::Number(y)) => Self::Number(<f64 as Lerp>::lerp(x, y, t)),
            (Self::Point(x), Self::Point(y)) => Self::Point(Vec2::lerp(x, y, t)),
            (Self::Size(x), Self::Size(y)) => Self::Size(Size::lerp(x, y, t)),
            // Mismatched kinds hold the left waypoint rather than guessing.
            _ => *a,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Animation {
    pub key_path: AnimationKeyPath,
    pub enabled: bool,
    pub values: Vec<KeyframeValue>,
    pub duration_seconds: f64,
    pub speed: f64,
    /// 0/1 wire flag: reflect the path back through its interior points.
    pub autoreverses: i64,
    /// 0/1 wire flag, default 1: loop forever. When 0, playback past
    /// `repeat_duration_seconds` is cut off by the presentation layer, not
    /// by this engine.
    pub infinite: i64,
    pub repeat_duration_seconds: Option<f64>,
    pub delay_ms: f64,
}

impl Animation {
    pub fn new(
        key_path: AnimationKeyPath,
        values: Vec<KeyframeValue>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            key_path,
            enabled: true,
            values,
            duration_seconds,
            speed: 1.0,
            autoreverses: 0,
            infinite: 1,
            repeat_duration_seconds: None,
            delay_ms: 0.0,
        }
    }

    /// Number of waypoints on the effective (possibly reflected) path.
    fn path_len(&self) -> usize {
        let n = self.values.len();
        if self.autoreverses != 0 && n >= 2 {
            2 * n - 1
        } else {
            n
        }
    }

    /// Waypoint `i` of the effective path. The reflected tail reuses the
    /// forward values mirrored around the last point, without repeating it.
    fn path_value(&self, i: usize) -> KeyframeValue {
        let n = self.values.len();
        if i < n {
            self.values[i]
        } else {
            self.values[2 * n - 2 - i]
        }
    }

    /// Duration in milliseconds of one full traversal of the effective path
    /// at `speed == 1`. Autoreverse doubles it.
    pub fn cycle_ms(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let segment_ms = self.duration_seconds * 1000.0 / (n as f64 - 1.0);
        segment_ms * (self.path_len() as f64 - 1.0)
    }

    /// Evaluate the track at `elapsed_ms` on the global clock.
    ///
    /// Returns `None` for tracks that cannot produce a value: disabled,
    /// fewer than two waypoints, or non-positive duration/speed. Before the
    /// delay has elapsed the first waypoint is held; after it, elapsed time
    /// wraps modulo the cycle regardless of the `infinite` flag.
    pub fn sample(&self, elapsed_ms: f64) -> Option<KeyframeValue> {
        if !self.enabled
            || self.values.len() < 2
            || self.duration_seconds <= 0.0
            || self.speed <= 0.0
        {
            return None;
        }

        if elapsed_ms < self.delay_ms {
            return Some(self.values[0]);
        }

        let n = self.values.len();
        let segment_ms = self.duration_seconds * 1000.0 / (n as f64 - 1.0);
        let segments = self.path_len() - 1;
        let total_ms = segment_ms * segments as f64;

        let scaled = (elapsed_ms - self.delay_ms) * self.speed;
        let wrapped = scaled.rem_euclid(total_ms);

        let idx = ((wrapped / segment_ms).floor() as usize).min(segments - 1);
        let t = (wrapped - idx as f64 * segment_ms) / segment_ms;

        let a = self.path_value(idx);
        let b = self.path_value(idx + 1);
        Some(KeyframeValue::lerp(&a, &b, t))
    }

    /// Evaluate and fan out into scalar override channels for the renderer.
    ///
    /// Vector key paths split into two independent channels; scalar key paths
    /// produce one. Tracks that sample to `None`, or whose value shape does
    /// not match the key path, contribute nothing.
    pub fn override_channels(&self, elapsed_ms: f64) -> Vec<(String, f64)> {
        let Some(value) = self.sample(elapsed_ms) else {
            return Vec::new();
        };

        match (self.key_path, value) {
            (AnimationKeyPath::Position, KeyframeValue::Point(p)) => vec![
                ("position.x".to_string(), p.x),
                ("position.y".to_string(), p.y),
            ],
            (AnimationKeyPath::Bounds, KeyframeValue::Size(s)) => vec![
                ("bounds.size.width".to_string(), s.w),
                ("bounds.size.height".to_string(), s.h),
            ],
            (kp, KeyframeValue::Number(x))
                if !matches!(kp, AnimationKeyPath::Position | AnimationKeyPath::Bounds) =>
            {
                vec![(kp.as_str().to_string(), x)]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_anim(values: &[f64], duration_seconds: f64) -> Animation {
        Animation::new(
            AnimationKeyPath::Opacity,
            values.iter().map(|v| KeyframeValue::Number(*v)).collect(),
            duration_seconds,
        )
    }

    #[test]
    fn boundary_values_loop() {
        let anim = scalar_anim(&[0.0, 100.0], 1.0);
        assert_eq!(anim.sample(0.0), Some(KeyframeValue::Number(0.0)));
        assert_eq!(anim.sample(500.0), Some(KeyframeValue::Number(50.0)));
        // One full loop wraps back to the start.
        assert_eq!(anim.sample(1000.0), Some(KeyframeValue::Number(0.0)));
    }

    #[test]
    fn autoreverse_doubles_the_cycle() {
        let mut anim = scalar_anim(&[0.0, 100.0], 1.0);
        anim.autoreverses = 1;
        assert_eq!(anim.cycle_ms(), 2000.0);
        // 3/4 through the reflected cycle is halfway down the descending leg.
        assert_eq!(anim.sample(1500.0), Some(KeyframeValue::Number(50.0)));
        assert_eq!(anim.sample(1000.0), Some(KeyframeValue::Number(100.0)));
    }

    #[test]
    fn autoreverse_reflects_interior_points() {
        let mut anim = scalar_anim(&[0.0, 100.0, 20.0], 2.0);
        anim.autoreverses = 1;
        // Path is [0, 100, 20, 100, 0] over four 1000ms segments.
        assert_eq!(anim.cycle_ms(), 4000.0);
        assert_eq!(anim.sample(2000.0), Some(KeyframeValue::Number(20.0)));
        assert_eq!(anim.sample(3000.0), Some(KeyframeValue::Number(100.0)));
        assert_eq!(anim.sample(4000.0), Some(KeyframeValue::Number(0.0)));
    }

    #[test]
    fn holds_first_value_before_delay() {
        let mut anim = scalar_anim(&[10.0, 90.0], 1.0);
        anim.delay_ms = 250.0;
        assert_eq!(anim.sample(0.0), Some(KeyframeValue::Number(10.0)));
        assert_eq!(anim.sample(249.9), Some(KeyframeValue::Number(10.0)));
        assert_eq!(anim.sample(750.0), Some(KeyframeValue::Number(50.0)));
    }

    #[test]
    fn speed_prescales_elapsed_time() {
        let mut anim = scalar_anim(&[0.0, 100.0], 1.0);
        anim.speed = 2.0;
        assert_eq!(anim.sample(250.0), Some(KeyframeValue::Number(50.0)));
        assert_eq!(anim.sample(500.0), Some(KeyframeValue::Number(0.0)));
    }

    #[test]
    fn degenerate_tracks_produce_nothing() {
        let mut anim = scalar_anim(&[5.0], 1.0);
        assert_eq!(anim.sample(100.0), None);

        anim = scalar_anim(&[0.0, 1.0], 0.0);
        assert_eq!(anim.sample(100.0), None);

        anim = scalar_anim(&[0.0, 1.0], 1.0);
        anim.enabled = false;
        assert_eq!(anim.sample(100.0), None);

        anim = scalar_anim(&[0.0, 1.0], 1.0);
        anim.speed = 0.0;
        assert_eq!(anim.sample(100.0), None);
    }

    #[test]
    fn position_fans_out_into_two_channels() {
        let anim = Animation::new(
            AnimationKeyPath::Position,
            vec![
                KeyframeValue::Point(Vec2::new(0.0, 0.0)),
                KeyframeValue::Point(Vec2::new(100.0, 200.0)),
            ],
            1.0,
        );
        let channels = anim.override_channels(500.0);
        assert_eq!(
            channels,
            vec![
                ("position.x".to_string(), 50.0),
                ("position.y".to_string(), 100.0)
            ]
        );
    }

    #[test]
    fn bounds_fans_out_into_size_channels() {
        let anim = Animation::new(
            AnimationKeyPath::Bounds,
            vec![
                KeyframeValue::Size(Size::new(10.0, 10.0)),
                KeyframeValue::Size(Size::new(20.0, 40.0)),
            ],
            1.0,
        );
        let channels = anim.override_channels(500.0);
        assert_eq!(
            channels,
            vec![
                ("bounds.size.width".to_string(), 15.0),
                ("bounds.size.height".to_string(), 25.0)
            ]
        );
    }

    #[test]
    fn mismatched_value_shape_is_dropped() {
        let anim = Animation::new(
            AnimationKeyPath::Position,
            vec![KeyframeValue::Number(0.0), KeyframeValue::Number(1.0)],
            1.0,
        );
        assert!(anim.override_channels(500.0).is_empty());
    }

    #[test]
    fn key_path_strings_roundtrip() {
        for kp in [
            AnimationKeyPath::Position,
            AnimationKeyPath::PositionX,
            AnimationKeyPath::PositionY,
            AnimationKeyPath::Bounds,
            AnimationKeyPath::Opacity,
            AnimationKeyPath::RotationX,
            AnimationKeyPath::RotationY,
            AnimationKeyPath::RotationZ,
        ] {
            assert_eq!(AnimationKeyPath::parse(kp.as_str()), Some(kp));
        }
        assert_eq!(AnimationKeyPath::parse("scale"), None);
    }
}
