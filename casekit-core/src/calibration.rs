//! Export-time calibration factors.
//!
//! The live preview is a CSS-transformed DOM element whose on-screen size
//! differs from the raster canvas used at export; a plain linear rescale of
//! position and zoom does not reproduce the visual composition exactly, so
//! empirically tuned multiplicative corrections are applied during export
//! only. The preview and the export are allowed to diverge slightly; these
//! factors reconcile them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Default X position correction factor.
pub const DEFAULT_X_POSITION_FACTOR: f64 = 1.65;
/// Default Y position correction factor.
pub const DEFAULT_Y_POSITION_FACTOR: f64 = 1.65;
/// Default zoom correction factor.
pub const DEFAULT_ZOOM_FACTOR: f64 = 0.64;

/// Well-known file name for the persisted profile.
pub const CALIBRATION_FILE: &str = "calibration.json";

/// User-adjustable correction factors, persisted independently of
/// per-element state and applied uniformly to all elements at export time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProfile {
    /// Multiplier on the X position when mapped to canvas space.
    pub x_position_factor: f64,
    /// Multiplier on the Y position when mapped to canvas space.
    pub y_position_factor: f64,
    /// Multiplier on the zoom when mapped to canvas space.
    pub zoom_factor: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            x_position_factor: DEFAULT_X_POSITION_FACTOR,
            y_position_factor: DEFAULT_Y_POSITION_FACTOR,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
        }
    }
}

impl CalibrationProfile {
    /// Load the profile from `path`, falling back to defaults when the file
    /// is missing or unparsable. The fallback is silent apart from a warning
    /// log; a broken calibration file must never block the editor.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!(
                        "unparsable calibration at {}, using defaults: {e}",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the profile to `path`, overwriting any prior value wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Restore the factory defaults.
    pub fn reset_to_default(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = CalibrationProfile::default();
        assert!((p.x_position_factor - 1.65).abs() < f64::EPSILON);
        assert!((p.y_position_factor - 1.65).abs() < f64::EPSILON);
        assert!((p.zoom_factor - 0.64).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_discards_saved_values() {
        let mut p = CalibrationProfile {
            x_position_factor: 2.0,
            y_position_factor: 0.5,
            zoom_factor: 1.0,
        };
        p.reset_to_default();
        assert_eq!(p, CalibrationProfile::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CALIBRATION_FILE);

        let p = CalibrationProfile {
            x_position_factor: 1.2,
            y_position_factor: 1.3,
            zoom_factor: 0.7,
        };
        p.save_to(&path).expect("save");
        assert_eq!(CalibrationProfile::load_from(&path), p);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = CalibrationProfile::load_from(&dir.path().join("nope.json"));
        assert_eq!(loaded, CalibrationProfile::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CALIBRATION_FILE);
        std::fs::write(&path, "{not json").expect("write");
        assert_eq!(
            CalibrationProfile::load_from(&path),
            CalibrationProfile::default()
        );
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(CalibrationProfile::default()).expect("serialize");
        assert!(json.get("xPositionFactor").is_some());
        assert!(json.get("yPositionFactor").is_some());
        assert!(json.get("zoomFactor").is_some());
    }
}
