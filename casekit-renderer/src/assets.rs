//! Asset resolution and fan-in loading.
//!
//! Composition may only start once every required image — the mockup
//! template and each element source — has finished loading or errored. The
//! fan-in runs under a single deadline; a stalled load fails the whole
//! render instead of hanging it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbaImage;

use casekit_core::{Element, ElementSource};

use crate::error::{RenderError, RenderResult};
use crate::image_io;

/// Deadline for the whole image fan-in.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Every image a render needs, decoded. `elements` is index-aligned with the
/// element slice passed to [`AssetRoot::load_all`].
#[derive(Debug)]
pub struct LoadedAssets {
    /// The mockup template image.
    pub mockup: RgbaImage,
    /// One decoded image per element, in input order.
    pub elements: Vec<RgbaImage>,
}

/// Resolves server-relative source paths against the uploads directory and
/// loads images off the blocking pool.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    /// Create a resolver rooted at the uploads directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a server-relative path (`/uploads/mockups/7_Inne.png`) onto disk.
    #[must_use]
    pub fn resolve(&self, server_path: &str) -> PathBuf {
        self.root.join(server_path.trim_start_matches('/'))
    }

    /// Load and decode one element source.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] naming the failing asset.
    pub async fn load_source(&self, source: &ElementSource) -> RenderResult<RgbaImage> {
        match source {
            ElementSource::DataUri(uri) => {
                let uri = uri.clone();
                run_decode(move || image_io::load_from_data_uri(&uri), "data URI image").await
            }
            ElementSource::ServerPath(path) => self.load_server_path(path).await,
        }
    }

    /// Load and decode an image by its server-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] naming the failing asset.
    pub async fn load_server_path(&self, server_path: &str) -> RenderResult<RgbaImage> {
        let path = self.resolve(server_path);
        let asset = server_path.to_string();
        run_decode(move || image_io::load_from_path(&path), &asset).await
    }

    /// Load the mockup image and every element image, joining under one
    /// deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Timeout`] when the deadline elapses, or the
    /// first [`RenderError::Resource`] when any image fails; the render is
    /// aborted wholesale either way.
    pub async fn load_all(
        &self,
        mockup_path: &str,
        elements: &[Element],
        deadline: Duration,
    ) -> RenderResult<LoadedAssets> {
        let mockup = self.load_server_path(mockup_path);
        let element_images =
            futures::future::try_join_all(elements.iter().map(|e| self.load_source(&e.source)));

        let joined = async {
            let (mockup, elements) = futures::future::try_join(mockup, element_images).await?;
            Ok(LoadedAssets { mockup, elements })
        };

        tokio::time::timeout(deadline, joined)
            .await
            .map_err(|_| RenderError::Timeout(deadline))?
    }
}

/// Run a blocking decode on the blocking pool.
async fn run_decode<F>(decode: F, asset: &str) -> RenderResult<RgbaImage>
where
    F: FnOnce() -> RenderResult<RgbaImage> + Send + 'static,
{
    tokio::task::spawn_blocking(decode)
        .await
        .map_err(|e| RenderError::resource(asset, e))?
}
