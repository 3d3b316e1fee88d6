//! User-supplied image layers and their identity.

use serde::{Deserialize, Serialize};

use crate::TransformState;

/// Unique identifier for an element.
///
/// Ids are positive, assigned monotonically by the owning collection, and
/// never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an element's image data lives. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementSource {
    /// Inline base64 data URI (`data:image/...;base64,...`).
    DataUri(String),
    /// Server-relative path (e.g. `/uploads/mockups/7_Inne.png`).
    ServerPath(String),
}

impl ElementSource {
    /// The raw source string as stored on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::DataUri(s) | Self::ServerPath(s) => s,
        }
    }
}

impl From<String> for ElementSource {
    fn from(s: String) -> Self {
        if s.starts_with("data:") {
            Self::DataUri(s)
        } else {
            Self::ServerPath(s)
        }
    }
}

impl From<ElementSource> for String {
    fn from(source: ElementSource) -> Self {
        match source {
            ElementSource::DataUri(s) | ElementSource::ServerPath(s) => s,
        }
    }
}

/// One user-supplied image layer with its own transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Image data reference.
    #[serde(rename = "src")]
    pub source: ElementSource,
    /// Display label ("Element {n}" at creation, not guaranteed unique).
    pub name: String,
    /// Position, rotation, zoom and stacking state.
    pub transform: TransformState,
}

impl Element {
    /// Create an element with a default transform at the given layer.
    #[must_use]
    pub fn new(id: ElementId, source: ElementSource, name: String, layer_index: usize) -> Self {
        Self {
            id,
            source,
            name,
            transform: TransformState::at_layer(layer_index),
        }
    }
}
