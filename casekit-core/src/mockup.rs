//! Mockup templates and the active-template selector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::MockupId;

/// Placeholder dimensions substituted when a template image fails to load.
pub const PLACEHOLDER_INFO: ImageInfo = ImageInfo {
    width: 400,
    height: 800,
};

/// Model label used when a template carries none.
pub const DEFAULT_MODEL: &str = "Inne";

/// Pixel dimensions of a loaded template image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
}

impl ImageInfo {
    /// Whether the image is perfectly square.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

/// A device-case template, read-only to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockupTemplate {
    /// Numeric identity, also encoded in the on-disk filename.
    pub id: MockupId,
    /// Display name (the model label doubles as the name).
    pub name: String,
    /// Device-model label used for grouping and export naming.
    pub model: String,
    /// Server-relative URL of the template image.
    pub path: String,
}

/// Group templates by model for display. Grouping has no core semantics;
/// the map is ordered so galleries render deterministically.
#[must_use]
pub fn group_by_model(templates: &[MockupTemplate]) -> BTreeMap<String, Vec<&MockupTemplate>> {
    let mut groups: BTreeMap<String, Vec<&MockupTemplate>> = BTreeMap::new();
    for template in templates {
        let model = if template.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            template.model.clone()
        };
        groups.entry(model).or_default().push(template);
    }
    groups
}

/// Load state of the selected template image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No template selected yet.
    #[default]
    Unselected,
    /// A template is selected and its image is loading.
    Loading,
    /// The template image loaded.
    Ready(ImageInfo),
    /// The image failed to load; a placeholder was substituted so the rest
    /// of the system never waits on an image that will not arrive.
    Failed(ImageInfo),
}

/// Notification payload emitted when a selection begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChanging {
    /// Id of the previously selected template, if any. Collaborators persist
    /// state keyed by this id before the switch completes.
    pub previous_id: Option<MockupId>,
}

/// Notification payload emitted once the new template is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    /// Id of the newly selected template.
    pub mockup_id: MockupId,
    /// Image path of the new template.
    pub path: String,
    /// Model label of the new template.
    pub model: String,
}

/// Tracks which mockup template is active and its image load state.
///
/// State machine: `Unselected -> Loading -> Ready`, or
/// `Loading -> Failed -> Ready` on a later successful select. No state is
/// terminal; `begin_select` may be called again from any state.
#[derive(Debug, Default)]
pub struct MockupSelector {
    current: Option<MockupTemplate>,
    state: LoadState,
}

impl MockupSelector {
    /// Create a selector with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected template, if any.
    #[must_use]
    pub fn current(&self) -> Option<&MockupTemplate> {
        self.current.as_ref()
    }

    /// The current load state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Dimensions of the usable template image (real or placeholder).
    #[must_use]
    pub fn image_info(&self) -> Option<ImageInfo> {
        match self.state {
            LoadState::Ready(info) | LoadState::Failed(info) => Some(info),
            LoadState::Unselected | LoadState::Loading => None,
        }
    }

    /// Start selecting a template. Returns the "changing" notification
    /// carrying the previous template's id; the selector enters `Loading`.
    pub fn begin_select(&mut self, template: MockupTemplate) -> SelectionChanging {
        let previous_id = self.current.as_ref().map(|t| t.id);
        tracing::debug!(
            mockup_id = template.id,
            model = %template.model,
            "selecting mockup"
        );
        self.current = Some(template);
        self.state = LoadState::Loading;
        SelectionChanging { previous_id }
    }

    /// Finish the in-flight selection with the image load result.
    ///
    /// A failed load substitutes placeholder dimensions and still yields the
    /// "changed" notification, so downstream consumers never deadlock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidOperation`] when called without a
    /// preceding [`Self::begin_select`].
    pub fn complete_load(
        &mut self,
        result: Result<ImageInfo, String>,
    ) -> crate::CoreResult<SelectionChanged> {
        let template = self.current.as_ref().ok_or_else(|| {
            crate::CoreError::InvalidOperation("complete_load without begin_select".into())
        })?;

        self.state = match result {
            Ok(info) => LoadState::Ready(info),
            Err(reason) => {
                tracing::warn!(
                    mockup_id = template.id,
                    path = %template.path,
                    "mockup image failed to load, substituting placeholder: {reason}"
                );
                LoadState::Failed(PLACEHOLDER_INFO)
            }
        };

        Ok(SelectionChanged {
            mockup_id: template.id,
            path: template.path.clone(),
            model: template.model.clone(),
        })
    }
}
