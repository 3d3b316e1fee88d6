//! Per-element transform state and its clamping rules.
//!
//! Every numeric field stays inside its limit after any mutation path; the
//! step and slider paths both funnel through [`TransformState::apply`].

use serde::{Deserialize, Serialize};

/// Minimum position offset in preview pixels.
pub const POSITION_MIN: f64 = -150.0;
/// Maximum position offset in preview pixels.
pub const POSITION_MAX: f64 = 150.0;
/// Minimum zoom in percent.
pub const ZOOM_MIN: f64 = 10.0;
/// Maximum zoom in percent.
pub const ZOOM_MAX: f64 = 300.0;
/// Minimum rotation in degrees.
pub const ROTATION_MIN: f64 = -180.0;
/// Maximum rotation in degrees.
pub const ROTATION_MAX: f64 = 180.0;
/// Default zoom in percent.
pub const ZOOM_DEFAULT: f64 = 100.0;

/// Clamp a position offset to [`POSITION_MIN`]..=[`POSITION_MAX`].
#[must_use]
pub fn clamp_position(v: f64) -> f64 {
    v.clamp(POSITION_MIN, POSITION_MAX)
}

/// Clamp a zoom percentage to [`ZOOM_MIN`]..=[`ZOOM_MAX`].
#[must_use]
pub fn clamp_zoom(v: f64) -> f64 {
    v.clamp(ZOOM_MIN, ZOOM_MAX)
}

/// Wrap a rotation after a single increment.
///
/// One ±360° correction, not a general modulo: an increment of +90 from 170
/// yields -100, matching single-step wraparound semantics.
#[must_use]
pub fn normalize_rotation(v: f64) -> f64 {
    if v > ROTATION_MAX {
        v - 360.0
    } else if v < ROTATION_MIN {
        v + 360.0
    } else {
        v
    }
}

/// A UI-originated transform change carrying an absolute target value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformDelta {
    /// Absolute rotation in degrees.
    Rotation(f64),
    /// Absolute zoom in percent.
    Zoom(f64),
    /// Absolute X offset in preview pixels.
    PositionX(f64),
    /// Absolute Y offset in preview pixels.
    PositionY(f64),
}

/// Position, rotation, zoom and stacking state of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformState {
    /// X offset in preview pixels, clamped to [-150, 150].
    pub position_x: f64,
    /// Y offset in preview pixels, clamped to [-150, 150].
    pub position_y: f64,
    /// Rotation in degrees, within [-180, 180].
    pub rotation: f64,
    /// Zoom in percent, clamped to [10, 300].
    pub zoom: f64,
    /// Stacking order among elements (0 = bottommost), dense per collection.
    pub layer_index: usize,
    /// Whether the element renders above the mockup template.
    #[serde(default)]
    pub layer_front: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position_x: 0.0,
            position_y: 0.0,
            rotation: 0.0,
            zoom: ZOOM_DEFAULT,
            layer_index: 0,
            layer_front: false,
        }
    }
}

impl TransformState {
    /// Create a default transform at the given stacking position.
    #[must_use]
    pub fn at_layer(layer_index: usize) -> Self {
        Self {
            layer_index,
            ..Self::default()
        }
    }

    /// Set the X offset, clamping to the position limits.
    pub fn set_position_x(&mut self, x: f64) {
        self.position_x = clamp_position(x);
    }

    /// Set the Y offset, clamping to the position limits.
    pub fn set_position_y(&mut self, y: f64) {
        self.position_y = clamp_position(y);
    }

    /// Set both offsets, clamping each.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.set_position_x(x);
        self.set_position_y(y);
    }

    /// Rotate by a delta in degrees, wrapping once past ±180°.
    pub fn rotate_by(&mut self, degrees: f64) {
        self.rotation = normalize_rotation(self.rotation + degrees);
    }

    /// Change zoom by a delta in percent, clamping to the zoom limits.
    pub fn zoom_by(&mut self, amount: f64) {
        self.zoom = clamp_zoom(self.zoom + amount);
    }

    /// Apply an absolute control value through the single mutation entry
    /// point. Rotation changes go through the wrapping increment path so the
    /// ±step buttons and the slider share one rule.
    pub fn apply(&mut self, delta: TransformDelta) {
        match delta {
            TransformDelta::Rotation(v) => self.rotate_by(v - self.rotation),
            TransformDelta::Zoom(v) => self.zoom = clamp_zoom(v),
            TransformDelta::PositionX(v) => self.set_position_x(v),
            TransformDelta::PositionY(v) => self.set_position_y(v),
        }
    }

    /// Reset position, rotation and zoom to defaults.
    ///
    /// Layer order is deliberately untouched; it survives a reset, as does
    /// the collection-level background color.
    pub fn reset(&mut self) {
        self.position_x = 0.0;
        self.position_y = 0.0;
        self.rotation = 0.0;
        self.zoom = ZOOM_DEFAULT;
    }

    /// Move the element back to the preview center, keeping rotation/zoom.
    pub fn center(&mut self) {
        self.position_x = 0.0;
        self.position_y = 0.0;
    }

    /// The CSS transform the live preview applies for this state.
    ///
    /// Translate is outermost and scale innermost, so rotation and scale
    /// occur about the element's own center after translation.
    #[must_use]
    pub fn to_css_transform(&self) -> String {
        let scale = self.zoom * 0.01;
        format!(
            "translate(calc(-50% + {}px), calc(-50% + {}px)) rotate({}deg) scale({})",
            self.position_x, self.position_y, self.rotation, scale
        )
    }

    /// Check that every numeric field lies within its limits.
    #[must_use]
    pub fn is_within_limits(&self) -> bool {
        (POSITION_MIN..=POSITION_MAX).contains(&self.position_x)
            && (POSITION_MIN..=POSITION_MAX).contains(&self.position_y)
            && (ROTATION_MIN..=ROTATION_MAX).contains(&self.rotation)
            && (ZOOM_MIN..=ZOOM_MAX).contains(&self.zoom)
    }
}
