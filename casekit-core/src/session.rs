//! The editor session: explicit wiring between selector, store and input.
//!
//! Selecting a mockup runs begin-select, image load and the store's
//! switch policy as one sequence of direct calls; there is no event bus and
//! no shared global state, so ordering and double-delivery hazards cannot
//! arise.

use std::sync::Arc;
use std::time::Instant;

use crate::collection::LayerDirection;
use crate::error::CoreResult;
use crate::input::{ROTATE_STEP_DEGREES, ZOOM_STEP_PERCENT};
use crate::mockup::{ImageInfo, SelectionChanged};
use crate::store::ElementsRepository;
use crate::{
    CalibrationProfile, DragSession, ElementId, ElementSource, ElementStore, MockupSelector,
    MockupTemplate, TransformDelta,
};

/// Values the on-screen controls display for the active element.
///
/// Controls are always re-derived from the active element, never from a
/// previously displayed one.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsSnapshot {
    /// Rotation slider value in degrees.
    pub rotation: f64,
    /// Zoom slider value in percent.
    pub zoom: f64,
    /// X position slider value.
    pub position_x: f64,
    /// Y position slider value.
    pub position_y: f64,
    /// Shared background color.
    pub background_color: String,
    /// CSS transform string the preview applies.
    pub css_transform: String,
}

/// One editor instance: active mockup, its element set, calibration and
/// pointer input. Constructed with its dependencies injected, so multiple
/// independent sessions can coexist.
pub struct EditorSession {
    selector: MockupSelector,
    store: ElementStore,
    calibration: CalibrationProfile,
    drag: DragSession,
}

impl EditorSession {
    /// Create a session over the given element repository and calibration.
    #[must_use]
    pub fn new(repository: Arc<dyn ElementsRepository>, calibration: CalibrationProfile) -> Self {
        Self {
            selector: MockupSelector::new(),
            store: ElementStore::new(repository),
            calibration,
            drag: DragSession::new(),
        }
    }

    /// The mockup selector.
    #[must_use]
    pub fn selector(&self) -> &MockupSelector {
        &self.selector
    }

    /// The element store.
    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// The calibration profile used at export time.
    #[must_use]
    pub fn calibration(&self) -> &CalibrationProfile {
        &self.calibration
    }

    /// Replace the calibration profile.
    pub fn set_calibration(&mut self, calibration: CalibrationProfile) {
        self.calibration = calibration;
    }

    /// Select a mockup template, completing its image load with `load`.
    ///
    /// The store reacts only once the image is usable (real or
    /// placeholder); it persists the previous mockup's elements under the
    /// previous id before adopting the new one.
    ///
    /// # Errors
    ///
    /// Propagates selector errors; a failed image *load* is not an error
    /// here, the selector substitutes a placeholder.
    pub fn select_mockup(
        &mut self,
        template: MockupTemplate,
        load: Result<ImageInfo, String>,
    ) -> CoreResult<SelectionChanged> {
        self.selector.begin_select(template);
        let changed = self.selector.complete_load(load)?;
        self.store.on_mockup_changed(changed.mockup_id);
        Ok(changed)
    }

    /// Add an element from an uploaded or dropped image.
    pub fn add_element(&mut self, source: ElementSource, now: Instant) -> ElementId {
        self.store.add_element(source, now)
    }

    /// Delete an element by index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ElementNotFound`] if `index` is invalid.
    pub fn delete_element(&mut self, index: usize, now: Instant) -> CoreResult<()> {
        self.store.delete_element(index, now)?;
        Ok(())
    }

    /// Move an element one step in stacking order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ElementNotFound`] if `index` is invalid.
    pub fn move_layer(
        &mut self,
        index: usize,
        direction: LayerDirection,
        now: Instant,
    ) -> CoreResult<bool> {
        self.store.move_layer(index, direction, now)
    }

    /// Activate the element at `index`; a drag in progress is cancelled so
    /// the new element does not inherit it.
    pub fn set_active(&mut self, index: usize) -> bool {
        let changed = self.store.set_active(index);
        if changed {
            self.drag.release();
        }
        changed
    }

    /// Pointer pressed on the active element's preview.
    ///
    /// Ignored when no element is active; inactive elements are not
    /// draggable directly.
    pub fn pointer_pressed(&mut self, x: f64, y: f64) {
        let position = self
            .store
            .collection()
            .active_element()
            .map(|e| (e.transform.position_x, e.transform.position_y));
        if let Some((element_x, element_y)) = position {
            self.drag.press(x, y, element_x, element_y);
        }
    }

    /// Pointer moved while pressed: apply `initial + delta`, clamped.
    pub fn pointer_moved(&mut self, x: f64, y: f64, now: Instant) {
        if let Some((px, py)) = self.drag.drag(x, y) {
            let _ = self.store.apply_transform(TransformDelta::PositionX(px), now);
            let _ = self.store.apply_transform(TransformDelta::PositionY(py), now);
        }
    }

    /// Pointer released: stop tracking.
    pub fn pointer_released(&mut self) {
        self.drag.release();
    }

    /// Apply an absolute slider value to the active element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn apply_control(&mut self, delta: TransformDelta, now: Instant) -> CoreResult<()> {
        self.store.apply_transform(delta, now)
    }

    /// Rotate the active element by one button step (`steps` may be
    /// negative).
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn rotate_step(&mut self, steps: f64, now: Instant) -> CoreResult<()> {
        let current = self.active_rotation()?;
        self.store.apply_transform(
            TransformDelta::Rotation(current + steps * ROTATE_STEP_DEGREES),
            now,
        )
    }

    /// Zoom the active element by one button step (`steps` may be negative).
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn zoom_step(&mut self, steps: f64, now: Instant) -> CoreResult<()> {
        let current = self
            .store
            .collection()
            .active_element()
            .ok_or(crate::CoreError::NoActiveElement)?
            .transform
            .zoom;
        self.store
            .apply_transform(TransformDelta::Zoom(current + steps * ZOOM_STEP_PERCENT), now)
    }

    /// Reset the active element's position/rotation/zoom.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn reset_transformations(&mut self, now: Instant) -> CoreResult<()> {
        self.store.reset_active(now)
    }

    /// Center the active element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn center_image(&mut self, now: Instant) -> CoreResult<()> {
        self.store.center_active(now)
    }

    /// Set the shared background color.
    pub fn set_background_color(&mut self, color: impl Into<String>, now: Instant) {
        self.store.set_background_color(color, now);
    }

    /// Snapshot of the control values for the active element, or `None`
    /// when the collection is empty (element-dependent controls hide).
    #[must_use]
    pub fn controls_snapshot(&self) -> Option<ControlsSnapshot> {
        let collection = self.store.collection();
        let element = collection.active_element()?;
        Some(ControlsSnapshot {
            rotation: element.transform.rotation,
            zoom: element.transform.zoom,
            position_x: element.transform.position_x,
            position_y: element.transform.position_y,
            background_color: collection.background_color().to_string(),
            css_transform: element.transform.to_css_transform(),
        })
    }

    /// Run due debounced saves.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.store.tick(now)
    }

    /// Flush pending saves immediately (page-exit beacon path).
    pub fn flush(&mut self) {
        self.store.flush();
    }

    fn active_rotation(&self) -> CoreResult<f64> {
        Ok(self
            .store
            .collection()
            .active_element()
            .ok_or(crate::CoreError::NoActiveElement)?
            .transform
            .rotation)
    }
}
