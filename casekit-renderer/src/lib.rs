//! # Casekit Renderer
//!
//! Deterministic raster compositor for the casekit mockup editor.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              casekit-renderer               │
//! ├─────────────────────────────────────────────┤
//! │  Assets          │  Compositor              │
//! │  - bytes/files   │  - background fill       │
//! │  - data URIs     │  - aspect-fit mockup     │
//! │  - fan-in+timeout│  - calibrated elements   │
//! ├─────────────────────────────────────────────┤
//! │  Encoding        │  Batch export            │
//! │  - PNG lossless  │  - per-mockup files      │
//! │  - JPEG q=90     │  - selection restore     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering the same element collection, mockup, calibration profile and
//! target twice produces pixel-identical output; there is no randomness in
//! the pipeline.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod batch;
pub mod compose;
pub mod error;
pub mod image_io;

pub use assets::{AssetRoot, LoadedAssets, LOAD_TIMEOUT};
pub use batch::{render_batch, NamedExport};
pub use compose::{
    encode, export_file_name, Compositor, ExportFormat, ExportTarget, Layer, PreviewGeometry,
    CANONICAL_SIZES, DEFAULT_SIZE, JPEG_QUALITY,
};
pub use error::{RenderError, RenderResult};

/// Casekit renderer version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
