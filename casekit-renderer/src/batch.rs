//! Batch export over a list of mockup templates.
//!
//! Each selected mockup is switched to (awaiting its image), rendered at one
//! target, and named deterministically from its model, name and position in
//! the batch. Whatever mockup was active before the batch began is restored
//! afterwards, also when the batch fails partway.

use tokio::time::timeout;

use casekit_core::store::MockupId;
use casekit_core::{CalibrationProfile, Element, ImageInfo, MockupSelector, MockupTemplate};

use crate::assets::{AssetRoot, LOAD_TIMEOUT};
use crate::compose::{sanitize_name, Compositor, ExportTarget, Layer, PreviewGeometry};
use crate::error::{RenderError, RenderResult};

/// One rendered batch entry.
#[derive(Debug, Clone)]
pub struct NamedExport {
    /// Deterministic output file name with a sequential suffix.
    pub file_name: String,
    /// Which mockup produced it.
    pub mockup_id: MockupId,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

/// Render the current element set over each mockup in `mockups`.
///
/// The elements travel unchanged across the batch, matching the carry-over
/// policy of the element store. Any image load failure or timeout aborts the
/// whole batch with no partial output.
///
/// # Errors
///
/// Returns the first load, timeout, composition or encoding error.
pub async fn render_batch(
    selector: &mut MockupSelector,
    mockups: &[MockupTemplate],
    elements: &[Element],
    background: &str,
    calibration: &CalibrationProfile,
    assets: &AssetRoot,
    target: ExportTarget,
) -> RenderResult<Vec<NamedExport>> {
    let original = selector.current().cloned();

    let result = run_batch(
        selector,
        mockups,
        elements,
        background,
        calibration,
        assets,
        target,
    )
    .await;

    if let Some(template) = original {
        restore_selection(selector, template, assets).await;
    }

    result
}

#[allow(clippy::too_many_arguments)]
async fn run_batch(
    selector: &mut MockupSelector,
    mockups: &[MockupTemplate],
    elements: &[Element],
    background: &str,
    calibration: &CalibrationProfile,
    assets: &AssetRoot,
    target: ExportTarget,
) -> RenderResult<Vec<NamedExport>> {
    // Element sources are identical for every mockup; decode them once.
    let element_images = with_deadline(futures::future::try_join_all(
        elements.iter().map(|e| assets.load_source(&e.source)),
    ))
    .await?;

    let compositor = Compositor::new(target);
    let mut exports = Vec::with_capacity(mockups.len());

    for (i, mockup) in mockups.iter().enumerate() {
        tracing::debug!(
            mockup_id = mockup.id,
            "batch render {}/{}",
            i + 1,
            mockups.len()
        );

        selector.begin_select(mockup.clone());
        let image = match with_deadline(assets.load_server_path(&mockup.path)).await {
            Ok(image) => {
                let info = ImageInfo {
                    width: image.width(),
                    height: image.height(),
                };
                selector
                    .complete_load(Ok(info))
                    .map_err(|e| RenderError::Compose(e.to_string()))?;
                image
            }
            Err(e) => {
                // The selector still resolves (placeholder), but the export
                // aborts rather than producing a partial file.
                selector
                    .complete_load(Err(e.to_string()))
                    .map_err(|e| RenderError::Compose(e.to_string()))?;
                return Err(e);
            }
        };

        let layers: Vec<Layer<'_>> = elements
            .iter()
            .zip(&element_images)
            .map(|(element, image)| Layer { element, image })
            .collect();

        let preview = PreviewGeometry::natural(ImageInfo {
            width: image.width(),
            height: image.height(),
        });
        let bytes =
            compositor.render_encoded(&image, &layers, background, calibration, preview)?;

        exports.push(NamedExport {
            file_name: format!(
                "{}_{}_{}.{}",
                sanitize_name(&mockup.model),
                sanitize_name(&mockup.name),
                i + 1,
                target.format.extension()
            ),
            mockup_id: mockup.id,
            bytes,
        });
    }

    Ok(exports)
}

/// Point the selector back at the pre-batch template.
async fn restore_selection(
    selector: &mut MockupSelector,
    template: MockupTemplate,
    assets: &AssetRoot,
) {
    let path = template.path.clone();
    selector.begin_select(template);
    let load = match with_deadline(assets.load_server_path(&path)).await {
        Ok(image) => Ok(ImageInfo {
            width: image.width(),
            height: image.height(),
        }),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = selector.complete_load(load) {
        tracing::warn!("failed to restore pre-batch mockup selection: {e}");
    }
}

async fn with_deadline<T>(
    fut: impl std::future::Future<Output = RenderResult<T>>,
) -> RenderResult<T> {
    timeout(LOAD_TIMEOUT, fut)
        .await
        .map_err(|_| RenderError::Timeout(LOAD_TIMEOUT))?
}
