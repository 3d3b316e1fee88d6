//! Ordered element collections with dense layer indices.
//!
//! Array position is a bookkeeping detail; stacking is governed entirely by
//! each element's `layer_index`. After every add/delete/move the layer
//! indices form the exact set `{0..n-1}`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::{Element, ElementId, ElementSource, TransformDelta};

/// Default shared background color behind the composite.
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// Direction for a stacking-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerDirection {
    /// Toward the top of the stack.
    Up,
    /// Toward the bottom of the stack.
    Down,
}

/// The set of elements composited over one mockup template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCollection {
    elements: Vec<Element>,
    /// Index of the active element, or `None` when empty.
    active: Option<usize>,
    /// Shared background color, hex `#RRGGBB`. Not per-element.
    background_color: String,
    next_id: u64,
}

impl Default for ElementCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            active: None,
            background_color: DEFAULT_BACKGROUND.to_string(),
            next_id: 1,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the collection holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in array order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Elements sorted by ascending stacking order, for rendering.
    #[must_use]
    pub fn ordered_by_layer(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by_key(|e| e.transform.layer_index);
        ordered
    }

    /// Index of the active element, or `None` when the collection is empty.
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active element, if any.
    #[must_use]
    pub fn active_element(&self) -> Option<&Element> {
        self.active.and_then(|i| self.elements.get(i))
    }

    /// Mutable access to the active element, if any.
    pub fn active_element_mut(&mut self) -> Option<&mut Element> {
        match self.active {
            Some(i) => self.elements.get_mut(i),
            None => None,
        }
    }

    /// The shared background color.
    #[must_use]
    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    /// Set the shared background color.
    pub fn set_background_color(&mut self, color: impl Into<String>) {
        self.background_color = color.into();
    }

    /// Add a new element on top of the stack and make it active.
    ///
    /// The element gets the next unused id and the default name
    /// `"Element {n}"`.
    pub fn add_element(&mut self, source: ElementSource) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;

        let name = format!("Element {}", self.elements.len() + 1);
        let element = Element::new(id, source, name, self.elements.len());
        self.elements.push(element);
        self.active = Some(self.elements.len() - 1);
        id
    }

    /// Remove the element at `index`.
    ///
    /// Layer indices are re-normalized to a dense permutation and the active
    /// pointer keeps tracking the same logical element where possible: if the
    /// deleted element was active, the element now at `min(index, len - 1)`
    /// becomes active; deleting below the active index shifts it down by one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if `index` is out of range.
    pub fn delete_element(&mut self, index: usize) -> CoreResult<Element> {
        if index >= self.elements.len() {
            return Err(CoreError::ElementNotFound(format!("index {index}")));
        }
        let removed = self.elements.remove(index);

        self.active = match self.active {
            _ if self.elements.is_empty() => None,
            Some(a) if a == index => Some(index.min(self.elements.len() - 1)),
            Some(a) if a > index => Some(a - 1),
            other => other,
        };

        self.normalize_layers();
        Ok(removed)
    }

    /// Remove every element and clear the active pointer.
    ///
    /// The shared background color is collection-level state and survives.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.active = None;
    }

    /// Swap the element at `index` with its neighbor in stacking order.
    ///
    /// The neighbor is found by `layer_index`, not array position. Returns
    /// `false` without changes when the element is already at the boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if `index` is out of range.
    pub fn move_layer(&mut self, index: usize, direction: LayerDirection) -> CoreResult<bool> {
        let layer = self
            .elements
            .get(index)
            .ok_or_else(|| CoreError::ElementNotFound(format!("index {index}")))?
            .transform
            .layer_index;

        let target = match direction {
            LayerDirection::Up if layer + 1 < self.elements.len() => layer + 1,
            LayerDirection::Down if layer > 0 => layer - 1,
            _ => return Ok(false),
        };

        let Some(neighbor) = self
            .elements
            .iter()
            .position(|e| e.transform.layer_index == target)
        else {
            return Ok(false);
        };

        self.elements[index].transform.layer_index = target;
        self.elements[neighbor].transform.layer_index = layer;
        Ok(true)
    }

    /// Make the element at `index` active.
    ///
    /// No-op (returns `false`) when out of range or already active.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.elements.len() || self.active == Some(index) {
            return false;
        }
        self.active = Some(index);
        true
    }

    /// Route an absolute control value to the active element's transform.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoActiveElement`] when nothing is active.
    pub fn apply_to_active(&mut self, delta: TransformDelta) -> CoreResult<()> {
        let element = self
            .active_element_mut()
            .ok_or(CoreError::NoActiveElement)?;
        element.transform.apply(delta);
        Ok(())
    }

    /// Replace the element list wholesale (loading a persisted set).
    ///
    /// Continues id assignment above the highest loaded id, re-normalizes
    /// layers, and activates the first element.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.next_id = self
            .elements
            .iter()
            .map(|e| e.id.0)
            .max()
            .map_or(1, |max| max + 1);
        self.normalize_layers();
        self.active = if self.elements.is_empty() {
            None
        } else {
            Some(0)
        };
    }

    /// Reassign layer indices to the dense permutation `0..n-1`, preserving
    /// the current relative stacking order.
    fn normalize_layers(&mut self) {
        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| self.elements[i].transform.layer_index);
        for (layer, i) in order.into_iter().enumerate() {
            self.elements[i].transform.layer_index = layer;
        }
    }

    /// Whether layer indices currently form the exact set `{0..n-1}`.
    #[must_use]
    pub fn layers_are_dense(&self) -> bool {
        let mut seen = vec![false; self.elements.len()];
        for e in &self.elements {
            match seen.get_mut(e.transform.layer_index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: u32) -> ElementSource {
        ElementSource::from(format!("/uploads/user/{n}.png"))
    }

    #[test]
    fn test_add_assigns_monotonic_ids_and_top_layer() {
        let mut c = ElementCollection::new();
        let a = c.add_element(source(1));
        let b = c.add_element(source(2));
        assert_eq!(a, ElementId(1));
        assert_eq!(b, ElementId(2));
        assert_eq!(c.elements()[0].transform.layer_index, 0);
        assert_eq!(c.elements()[1].transform.layer_index, 1);
        assert_eq!(c.active_index(), Some(1));
        assert_eq!(c.elements()[1].name, "Element 2");
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut c = ElementCollection::new();
        c.add_element(source(1));
        c.add_element(source(2));
        c.delete_element(1).expect("delete");
        let id = c.add_element(source(3));
        assert_eq!(id, ElementId(3));
    }

    #[test]
    fn test_layers_stay_dense_through_operations() {
        let mut c = ElementCollection::new();
        for n in 0..5 {
            c.add_element(source(n));
        }
        c.delete_element(2).expect("delete");
        assert!(c.layers_are_dense());
        c.move_layer(0, LayerDirection::Up).expect("move");
        assert!(c.layers_are_dense());
        c.move_layer(3, LayerDirection::Down).expect("move");
        assert!(c.layers_are_dense());
    }

    #[test]
    fn test_move_layer_swaps_stacking_neighbors() {
        let mut c = ElementCollection::new();
        c.add_element(source(1)); // A, layer 0
        c.add_element(source(2)); // B, layer 1

        let moved = c.move_layer(0, LayerDirection::Up).expect("move");
        assert!(moved);
        assert_eq!(c.elements()[0].transform.layer_index, 1); // A on top
        assert_eq!(c.elements()[1].transform.layer_index, 0); // B below

        let ordered = c.ordered_by_layer();
        assert_eq!(ordered[0].id, ElementId(2));
        assert_eq!(ordered[1].id, ElementId(1));
    }

    #[test]
    fn test_move_layer_noop_at_boundary() {
        let mut c = ElementCollection::new();
        c.add_element(source(1));
        c.add_element(source(2));
        assert!(!c.move_layer(1, LayerDirection::Up).expect("move"));
        assert!(!c.move_layer(0, LayerDirection::Down).expect("move"));
    }

    #[test]
    fn test_delete_adjusts_active_pointer() {
        let mut c = ElementCollection::new();
        c.add_element(source(1));
        c.add_element(source(2));
        c.add_element(source(3));

        // Deleting below the active index shifts it down.
        c.set_active(2);
        c.delete_element(0).expect("delete");
        assert_eq!(c.active_index(), Some(1));
        assert_eq!(c.active_element().expect("active").id, ElementId(3));

        // Deleting the active element activates min(index, len - 1).
        c.delete_element(1).expect("delete");
        assert_eq!(c.active_index(), Some(0));
    }

    #[test]
    fn test_delete_last_clears_active() {
        let mut c = ElementCollection::new();
        c.add_element(source(1));
        c.delete_element(0).expect("delete");
        assert_eq!(c.active_index(), None);
        assert!(c.is_empty());
    }

    #[test]
    fn test_set_active_noop_when_invalid() {
        let mut c = ElementCollection::new();
        c.add_element(source(1));
        assert!(!c.set_active(5));
        assert!(!c.set_active(0)); // already active
        c.add_element(source(2));
        assert!(c.set_active(0));
    }

    #[test]
    fn test_apply_to_active_requires_active() {
        let mut c = ElementCollection::new();
        assert!(matches!(
            c.apply_to_active(TransformDelta::Zoom(120.0)),
            Err(CoreError::NoActiveElement)
        ));
        c.add_element(source(1));
        c.apply_to_active(TransformDelta::Zoom(120.0)).expect("apply");
        assert!((c.active_element().expect("active").transform.zoom - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_replace_elements_continues_ids() {
        let mut c = ElementCollection::new();
        let stored = vec![
            Element::new(ElementId(4), source(1), "Element 1".into(), 0),
            Element::new(ElementId(9), source(2), "Element 2".into(), 1),
        ];
        c.replace_elements(stored);
        assert_eq!(c.active_index(), Some(0));
        let id = c.add_element(source(3));
        assert_eq!(id, ElementId(10));
    }

    #[test]
    fn test_background_survives_clear() {
        let mut c = ElementCollection::new();
        c.set_background_color("#112233");
        c.add_element(source(1));
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.background_color(), "#112233");
    }
}
