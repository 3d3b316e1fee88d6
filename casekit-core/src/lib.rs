//! # Casekit Core
//!
//! Editor-state engine for the casekit phone-case mockup editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                casekit-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Element Store   │  Mockup Selector         │
//! │  - Transforms    │  - Template metadata     │
//! │  - Layer order   │  - Load state machine    │
//! │  - Persistence   │  - Placeholder fallback  │
//! ├─────────────────────────────────────────────┤
//! │  Editor Session  │  Calibration             │
//! │  - Drag input    │  - Export-only factors   │
//! │  - Control sync  │  - JSON persistence      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The crate holds no I/O beyond the persistence seams: element sets are
//! written through an [`ElementsRepository`] implementation supplied by the
//! embedding application, and the calibration profile reads/writes one JSON
//! file. Rendering lives in `casekit-renderer`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calibration;
pub mod collection;
pub mod element;
pub mod error;
pub mod input;
pub mod mockup;
pub mod session;
pub mod store;
pub mod transform;

pub use calibration::CalibrationProfile;
pub use collection::{ElementCollection, LayerDirection};
pub use element::{Element, ElementId, ElementSource};
pub use error::{CoreError, CoreResult};
pub use input::DragSession;
pub use mockup::{ImageInfo, LoadState, MockupSelector, MockupTemplate};
pub use session::{ControlsSnapshot, EditorSession};
pub use store::{ElementStore, ElementsRepository, SaveScheduler};
pub use transform::{TransformDelta, TransformState};

/// Casekit core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
