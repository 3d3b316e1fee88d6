//! Per-mockup element persistence with coalesced saves.
//!
//! [`ElementStore`] owns the in-memory [`ElementCollection`] and talks to the
//! storage collaborator through the [`ElementsRepository`] seam. Remote
//! writes are debounced through [`SaveScheduler`] so a slider drag does not
//! produce a network write per frame; after the debounce window the last
//! write wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collection::LayerDirection;
use crate::error::CoreResult;
use crate::{Element, ElementCollection, ElementId, ElementSource, TransformDelta};

/// Debounce window between the last mutation and the remote save.
pub const SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Identifier of a mockup template, the partition key for persisted sets.
pub type MockupId = u64;

/// Storage collaborator for element sets, keyed by mockup id.
///
/// Implementations are expected to be cheap to call and fallible; the store
/// treats every failure as non-fatal and keeps the in-memory state
/// authoritative.
pub trait ElementsRepository: Send + Sync {
    /// Persist the ordered element list for a mockup, overwriting any prior
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend write fails.
    fn save_elements(&self, mockup_id: MockupId, elements: &[Element]) -> CoreResult<()>;

    /// Load the element list previously saved for a mockup, or `None` when
    /// nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend read fails.
    fn load_elements(&self, mockup_id: MockupId) -> CoreResult<Option<Vec<Element>>>;

    /// Remove the persisted element list for a mockup.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend delete fails.
    fn delete_elements(&self, mockup_id: MockupId) -> CoreResult<()>;
}

/// Coalescing save scheduler.
///
/// One pending deadline per mockup id: marking an already-dirty id pushes
/// its deadline out, so a burst of mutations yields a single save. Time is
/// injected by the caller, which keeps the scheduler deterministic.
#[derive(Debug)]
pub struct SaveScheduler {
    delay: Duration,
    deadlines: HashMap<MockupId, Instant>,
}

impl SaveScheduler {
    /// Create a scheduler with the given debounce window.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    /// Record a mutation for `id` at time `now`, (re)arming its deadline.
    pub fn mark_dirty(&mut self, id: MockupId, now: Instant) {
        self.deadlines.insert(id, now + self.delay);
    }

    /// Whether a save for `id` is pending.
    #[must_use]
    pub fn is_pending(&self, id: MockupId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Drain the ids whose debounce window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<MockupId> {
        let due: Vec<MockupId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            self.deadlines.remove(id);
        }
        due
    }

    /// Drain every pending id regardless of deadline (page-exit flush).
    pub fn drain_all(&mut self) -> Vec<MockupId> {
        self.deadlines.drain().map(|(id, _)| id).collect()
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(SAVE_DEBOUNCE)
    }
}

/// The element collection of the currently selected mockup, plus its
/// persistence policy.
pub struct ElementStore {
    collection: ElementCollection,
    current_mockup: Option<MockupId>,
    repository: Arc<dyn ElementsRepository>,
    scheduler: SaveScheduler,
}

impl ElementStore {
    /// Create a store over the given repository.
    #[must_use]
    pub fn new(repository: Arc<dyn ElementsRepository>) -> Self {
        Self {
            collection: ElementCollection::new(),
            current_mockup: None,
            repository,
            scheduler: SaveScheduler::default(),
        }
    }

    /// The in-memory collection.
    #[must_use]
    pub fn collection(&self) -> &ElementCollection {
        &self.collection
    }

    /// The mockup id the collection is currently keyed under.
    #[must_use]
    pub fn current_mockup(&self) -> Option<MockupId> {
        self.current_mockup
    }

    /// React to the active mockup changing.
    ///
    /// Write-then-switch: the current elements are persisted under the
    /// *previous* id before anything else happens, so in-flight edits are
    /// never lost. A non-empty collection then travels to the new mockup
    /// unchanged and is persisted under the new id immediately; an empty
    /// collection instead loads whatever was saved for the new id.
    pub fn on_mockup_changed(&mut self, new_id: MockupId) {
        if let Some(previous) = self.current_mockup {
            if previous != new_id && !self.collection.is_empty() {
                self.save_now(previous);
            }
        }

        self.current_mockup = Some(new_id);

        if self.collection.is_empty() {
            match self.repository.load_elements(new_id) {
                Ok(Some(elements)) => {
                    tracing::debug!(
                        mockup_id = new_id,
                        count = elements.len(),
                        "loaded persisted elements"
                    );
                    self.collection.replace_elements(elements);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(mockup_id = new_id, "failed to load elements: {e}");
                }
            }
        } else {
            // Carry-forward policy: the elements travel with the user.
            self.save_now(new_id);
        }
    }

    /// Add an element, make it active, and schedule a persist.
    pub fn add_element(&mut self, source: ElementSource, now: Instant) -> ElementId {
        let id = self.collection.add_element(source);
        self.mark_dirty(now);
        id
    }

    /// Delete an element and persist the result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ElementNotFound`] if `index` is invalid.
    pub fn delete_element(&mut self, index: usize, now: Instant) -> CoreResult<Element> {
        let removed = self.collection.delete_element(index)?;
        self.mark_dirty(now);
        Ok(removed)
    }

    /// Move an element one step in stacking order and persist on change.
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
        let moved = self.collection.move_layer(index, direction)?;
        if moved {
            self.mark_dirty(now);
        }
        Ok(moved)
    }

    /// Change the active element. No persistence; selection is session state.
    pub fn set_active(&mut self, index: usize) -> bool {
        self.collection.set_active(index)
    }

    /// Route a control change to the active element and schedule a persist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn apply_transform(&mut self, delta: TransformDelta, now: Instant) -> CoreResult<()> {
        self.collection.apply_to_active(delta)?;
        self.mark_dirty(now);
        Ok(())
    }

    /// Reset the active element's transform and schedule a persist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn reset_active(&mut self, now: Instant) -> CoreResult<()> {
        let element = self
            .collection
            .active_element_mut()
            .ok_or(crate::CoreError::NoActiveElement)?;
        element.transform.reset();
        self.mark_dirty(now);
        Ok(())
    }

    /// Center the active element and schedule a persist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoActiveElement`] when nothing is active.
    pub fn center_active(&mut self, now: Instant) -> CoreResult<()> {
        let element = self
            .collection
            .active_element_mut()
            .ok_or(crate::CoreError::NoActiveElement)?;
        element.transform.center();
        self.mark_dirty(now);
        Ok(())
    }

    /// Set the shared background color and schedule a persist.
    pub fn set_background_color(&mut self, color: impl Into<String>, now: Instant) {
        self.collection.set_background_color(color);
        self.mark_dirty(now);
    }

    /// Run due saves. Call periodically with the current time.
    ///
    /// Only the current mockup's set is still in memory; a deadline left over
    /// from before a switch was already satisfied by the write-then-switch
    /// save and is dropped.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut saved = 0;
        for id in self.scheduler.take_due(now) {
            if Some(id) == self.current_mockup {
                self.save_now(id);
                saved += 1;
            } else {
                tracing::debug!(mockup_id = id, "dropping stale save deadline");
            }
        }
        saved
    }

    /// Persist immediately, ignoring the debounce window (page-exit beacon).
    ///
    /// A pending deadline implies an unpersisted mutation, so the set is
    /// written even when it is empty (the mutation may have been a delete).
    pub fn flush(&mut self) {
        let pending = self.scheduler.drain_all();
        if let Some(id) = self.current_mockup {
            if !self.collection.is_empty() || pending.contains(&id) {
                self.save_now(id);
            }
        }
    }

    /// Whether a save is pending for the current mockup.
    #[must_use]
    pub fn save_pending(&self) -> bool {
        self.current_mockup
            .is_some_and(|id| self.scheduler.is_pending(id))
    }

    fn mark_dirty(&mut self, now: Instant) {
        if let Some(id) = self.current_mockup {
            self.scheduler.mark_dirty(id, now);
        }
    }

    /// Best-effort immediate save. Failures are reported, never rolled back.
    fn save_now(&self, id: MockupId) {
        if let Err(e) = self.repository.save_elements(id, self.collection.elements()) {
            tracing::warn!(mockup_id = id, "failed to persist elements: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory repository for tests.
    #[derive(Default)]
    struct MemoryRepository {
        sets: Mutex<HashMap<MockupId, Vec<Element>>>,
    }

    impl ElementsRepository for MemoryRepository {
        fn save_elements(&self, mockup_id: MockupId, elements: &[Element]) -> CoreResult<()> {
            self.sets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(mockup_id, elements.to_vec());
            Ok(())
        }

        fn load_elements(&self, mockup_id: MockupId) -> CoreResult<Option<Vec<Element>>> {
            Ok(self
                .sets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(&mockup_id)
                .cloned())
        }

        fn delete_elements(&self, mockup_id: MockupId) -> CoreResult<()> {
            self.sets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&mockup_id);
            Ok(())
        }
    }

    fn source(n: u32) -> ElementSource {
        ElementSource::from(format!("/uploads/user/{n}.png"))
    }

    #[test]
    fn test_scheduler_coalesces() {
        let mut s = SaveScheduler::new(Duration::from_secs(1));
        let t0 = Instant::now();
        s.mark_dirty(7, t0);
        s.mark_dirty(7, t0 + Duration::from_millis(500));

        // First deadline was pushed out by the second mutation.
        assert!(s.take_due(t0 + Duration::from_millis(1100)).is_empty());
        let due = s.take_due(t0 + Duration::from_millis(1600));
        assert_eq!(due, vec![7]);
        assert!(!s.is_pending(7));
    }

    #[test]
    fn test_switch_persists_under_previous_id() {
        let repo = Arc::new(MemoryRepository::default());
        let mut store = ElementStore::new(repo.clone());
        let now = Instant::now();

        store.on_mockup_changed(1);
        store.add_element(source(1), now);
        store
            .apply_transform(TransformDelta::Zoom(150.0), now)
            .expect("apply");

        store.on_mockup_changed(2);

        // Round-trip: what was saved under the old id equals what was in
        // memory at switch time.
        let saved = repo.load_elements(1).expect("load").expect("saved set");
        assert_eq!(saved.len(), 1);
        assert!((saved[0].transform.zoom - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nonempty_collection_carries_forward() {
        let repo = Arc::new(MemoryRepository::default());
        // Mockup 2 has its own saved set that must NOT win.
        repo.save_elements(
            2,
            &[Element::new(ElementId(99), source(9), "Old".into(), 0)],
        )
        .expect("seed");

        let mut store = ElementStore::new(repo.clone());
        store.on_mockup_changed(1);
        store.add_element(source(1), Instant::now());

        store.on_mockup_changed(2);
        assert_eq!(store.collection().len(), 1);
        assert_eq!(store.collection().elements()[0].id, ElementId(1));

        // And the carried set was immediately persisted under the new id.
        let saved = repo.load_elements(2).expect("load").expect("saved set");
        assert_eq!(saved[0].id, ElementId(1));
    }

    #[test]
    fn test_empty_collection_loads_saved_set() {
        let repo = Arc::new(MemoryRepository::default());
        repo.save_elements(
            5,
            &[
                Element::new(ElementId(1), source(1), "Element 1".into(), 0),
                Element::new(ElementId(2), source(2), "Element 2".into(), 1),
            ],
        )
        .expect("seed");

        let mut store = ElementStore::new(repo);
        store.on_mockup_changed(5);
        assert_eq!(store.collection().len(), 2);
        assert_eq!(store.collection().active_index(), Some(0));
    }

    #[test]
    fn test_empty_collection_and_no_saved_set_stays_empty() {
        let repo = Arc::new(MemoryRepository::default());
        let mut store = ElementStore::new(repo);
        store.on_mockup_changed(3);
        assert!(store.collection().is_empty());
        assert_eq!(store.collection().active_index(), None);
    }

    #[test]
    fn test_debounced_save_fires_after_window() {
        let repo = Arc::new(MemoryRepository::default());
        let mut store = ElementStore::new(repo.clone());
        let t0 = Instant::now();

        store.on_mockup_changed(1);
        store.add_element(source(1), t0);
        // add_element persisted nothing yet beyond the carry/load path;
        // the mutation save is debounced.
        store
            .apply_transform(TransformDelta::PositionX(42.0), t0)
            .expect("apply");

        assert_eq!(store.tick(t0 + Duration::from_millis(100)), 0);
        assert_eq!(store.tick(t0 + Duration::from_millis(1100)), 1);

        let saved = repo.load_elements(1).expect("load").expect("saved");
        assert!((saved[0].transform.position_x - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flush_saves_immediately() {
        let repo = Arc::new(MemoryRepository::default());
        let mut store = ElementStore::new(repo.clone());
        let t0 = Instant::now();

        store.on_mockup_changed(1);
        store.add_element(source(1), t0);
        store.flush();

        assert!(!store.save_pending());
        assert!(repo.load_elements(1).expect("load").is_some());
    }

    #[test]
    fn test_failed_save_keeps_memory_authoritative() {
        struct FailingRepository;
        impl ElementsRepository for FailingRepository {
            fn save_elements(&self, _: MockupId, _: &[Element]) -> CoreResult<()> {
                Err(crate::CoreError::Persistence("backend down".into()))
            }
            fn load_elements(&self, _: MockupId) -> CoreResult<Option<Vec<Element>>> {
                Err(crate::CoreError::Persistence("backend down".into()))
            }
            fn delete_elements(&self, _: MockupId) -> CoreResult<()> {
                Err(crate::CoreError::Persistence("backend down".into()))
            }
        }

        let mut store = ElementStore::new(Arc::new(FailingRepository));
        let t0 = Instant::now();
        store.on_mockup_changed(1); // failed load -> stays empty, no panic
        store.add_element(source(1), t0);
        store.tick(t0 + Duration::from_secs(2)); // failed save -> warn only
        assert_eq!(store.collection().len(), 1);
    }
}
