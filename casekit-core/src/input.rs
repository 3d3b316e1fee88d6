//! Pointer-drag tracking for the active element.
//!
//! Only the element marked active is draggable; selection happens first via
//! a click that is not on a drag-enabled control, then the drag session maps
//! pointer deltas onto the element's position. Clamping is left to the
//! transform path so dragging and sliders share one rule.

/// Rotation step applied by the rotate buttons, in degrees.
pub const ROTATE_STEP_DEGREES: f64 = 90.0;
/// Zoom step applied by the zoom buttons, in percent.
pub const ZOOM_STEP_PERCENT: f64 = 10.0;

/// Live drag state between pointer press and release.
#[derive(Debug, Default, Clone, Copy)]
pub struct DragSession {
    dragging: bool,
    start_x: f64,
    start_y: f64,
    initial_x: f64,
    initial_y: f64,
}

impl DragSession {
    /// Create an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start tracking: record the pointer position and the active element's
    /// current position.
    pub fn press(&mut self, pointer_x: f64, pointer_y: f64, element_x: f64, element_y: f64) {
        self.dragging = true;
        self.start_x = pointer_x;
        self.start_y = pointer_y;
        self.initial_x = element_x;
        self.initial_y = element_y;
    }

    /// Compute the element position for the current pointer location:
    /// `initial + delta`. Returns `None` when no drag is active.
    #[must_use]
    pub fn drag(&self, pointer_x: f64, pointer_y: f64) -> Option<(f64, f64)> {
        if !self.dragging {
            return None;
        }
        let dx = pointer_x - self.start_x;
        let dy = pointer_y - self.start_y;
        Some((self.initial_x + dx, self.initial_y + dy))
    }

    /// Stop tracking.
    pub fn release(&mut self) {
        self.dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_computes_initial_plus_delta() {
        let mut drag = DragSession::new();
        drag.press(100.0, 200.0, 10.0, -5.0);

        let (x, y) = drag.drag(130.0, 180.0).expect("dragging");
        assert!((x - 40.0).abs() < f64::EPSILON);
        assert!((y - (-25.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_position_without_press() {
        let drag = DragSession::new();
        assert!(drag.drag(10.0, 10.0).is_none());
    }

    #[test]
    fn test_release_stops_tracking() {
        let mut drag = DragSession::new();
        drag.press(0.0, 0.0, 0.0, 0.0);
        assert!(drag.is_dragging());
        drag.release();
        assert!(!drag.is_dragging());
        assert!(drag.drag(50.0, 50.0).is_none());
    }
}
