//! API route handlers.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;

use casekit_core::collection::DEFAULT_BACKGROUND;
use casekit_core::store::ElementsRepository as _;
use casekit_core::{CalibrationProfile, Element, ImageInfo};
use casekit_renderer::image_io::SniffedFormat;
use casekit_renderer::{
    Compositor, ExportFormat, ExportTarget, Layer, PreviewGeometry, DEFAULT_SIZE, LOAD_TIMEOUT,
};

use crate::error::{ApiError, ApiResult};
use crate::library::LibraryError;
use crate::validation;
use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy".
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Individual component checks.
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Mockup directory is readable.
    pub mockup_library: bool,
    /// Element-set storage responds.
    pub elements_store: bool,
}

/// Readiness probe.
#[tracing::instrument(name = "health", skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let library_ok = state.library.list().is_ok();
    let elements_ok = state.elements.load_elements(0).is_ok();
    let all_ok = library_ok && elements_ok;

    let status = HealthStatus {
        status: if all_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            mockup_library: library_ok,
            elements_store: elements_ok,
        },
    };
    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// GET `/api/mockups` - list available templates, sorted by id.
#[tracing::instrument(name = "list_mockups", skip(state))]
pub async fn list_mockups(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let mockups = state.library.list().map_err(ApiError::from)?;
    Ok(Json(json!({ "success": true, "mockups": mockups })))
}

/// GET `/api/models` - distinct model labels.
#[tracing::instrument(name = "list_models", skip(state))]
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let models = state.library.models().map_err(ApiError::from)?;
    Ok(Json(json!({ "success": true, "models": models })))
}

/// POST `/api/upload/mockup` - multipart upload of a PNG template.
///
/// Fields: `mockup` (the file), `mockupNumber` (numeric id, defaults to a
/// timestamp), `mockupModel` (label, defaults to "Inne").
#[tracing::instrument(name = "upload_mockup", skip(state, multipart))]
pub async fn upload_mockup(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut file: Option<Vec<u8>> = None;
    let mut number: Option<u64> = None;
    let mut model = String::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("mockup") => file = Some(field.bytes().await?.to_vec()),
            Some("mockupNumber") => {
                let text = field.text().await?;
                let parsed = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("invalid mockupNumber: {text}")))?;
                number = Some(parsed);
            }
            Some("mockupModel") => model = field.text().await?,
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("no file was uploaded".into()))?;
    validation::validate_mockup_upload(&file)?;

    let number = number.unwrap_or_else(current_timestamp_ms);
    let entry = state.library.save(number, &model, &file)?;

    Ok(Json(json!({
        "success": true,
        "filePath": entry.path,
        "mockupNumber": entry.id,
        "mockupName": entry.name,
        "mockupModel": entry.model,
    })))
}

/// POST `/api/upload/user-image` - multipart upload of a user image.
///
/// Nothing is written to disk; the image is returned as a base64 data URI
/// and travels with the element set from then on.
#[tracing::instrument(name = "upload_user_image", skip(multipart))]
pub async fn upload_user_image(mut multipart: Multipart) -> ApiResult<Json<serde_json::Value>> {
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            file = Some(field.bytes().await?.to_vec());
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("no file was uploaded".into()))?;
    validation::validate_image_upload(&file)?;

    let mime = match SniffedFormat::from_magic_bytes(&file) {
        SniffedFormat::Png => "image/png",
        SniffedFormat::Jpeg => "image/jpeg",
        SniffedFormat::WebP => "image/webp",
        SniffedFormat::Unknown => "application/octet-stream",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&file);

    Ok(Json(json!({
        "success": true,
        "imageData": format!("data:{mime};base64,{encoded}"),
    })))
}

/// Body of the model-rename request.
#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    /// The new model label.
    pub model: String,
}

/// PUT `/api/mockups/{id}/model` - rename a template's model label.
#[tracing::instrument(name = "update_mockup_model", skip(state, body))]
pub async fn update_mockup_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateModelRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    let entry = state.library.rename_model(id, &body.model)?;
    Ok(Json(json!({
        "success": true,
        "message": "mockup model updated",
        "newFileName": entry.file_name,
    })))
}

/// DELETE `/api/mockups/{id}` - remove a template from disk.
#[tracing::instrument(name = "delete_mockup", skip(state))]
pub async fn delete_mockup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.library.delete(id)?;
    Ok(Json(json!({ "success": true, "message": "mockup deleted" })))
}

/// Body carrying an element set.
#[derive(Debug, Deserialize)]
pub struct ElementsRequest {
    /// The ordered element list.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// POST `/api/mockup-elements/{id}` - persist the element set for a mockup.
#[tracing::instrument(name = "save_elements", skip(state, body))]
pub async fn save_elements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ElementsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.elements.save_elements(id, &body.elements)?;
    Ok(Json(json!({ "success": true })))
}

/// GET `/api/mockup-elements/{id}` - load the element set for a mockup.
///
/// A mockup with nothing saved yields an empty list, not an error.
#[tracing::instrument(name = "load_elements", skip(state))]
pub async fn load_elements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    let elements = state.elements.load_elements(id)?.unwrap_or_default();
    Ok(Json(json!({ "success": true, "elements": elements })))
}

/// DELETE `/api/mockup-elements/{id}` - drop the element set for a mockup.
#[tracing::instrument(name = "delete_elements", skip(state))]
pub async fn delete_elements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.elements.delete_elements(id)?;
    Ok(Json(json!({ "success": true })))
}

/// POST `/api/mockup-elements/{id}/beacon` - fire-and-forget flush.
///
/// The client sends this on page exit without awaiting a response, so the
/// handler always answers 204; a failed write is only logged.
#[tracing::instrument(name = "beacon_elements", skip(state, body))]
pub async fn beacon_elements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ElementsRequest>,
) -> StatusCode {
    match parse_id(&id) {
        Ok(id) => {
            if let Err(e) = state.elements.save_elements(id, &body.elements) {
                tracing::warn!(mockup_id = id, "beacon save failed: {e}");
            }
        }
        Err(e) => tracing::warn!("beacon with invalid id {id}: {e}"),
    }
    StatusCode::NO_CONTENT
}

/// Body of the server-side export request. Everything is optional; the
/// defaults are the canonical 1200x1200 PNG over a white background with
/// the stored calibration defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    /// Output width in pixels.
    pub width: Option<u32>,
    /// Output height in pixels.
    pub height: Option<u32>,
    /// Output encoding.
    pub format: Option<ExportFormat>,
    /// Background color, hex `#RRGGBB`.
    pub background: Option<String>,
    /// Calibration factors to apply.
    pub calibration: Option<CalibrationProfile>,
    /// On-screen preview geometry; defaults to the mockup's natural size.
    pub preview: Option<PreviewGeometry>,
}

/// POST `/api/export/{id}` - composite the saved element set over the stored
/// template and return the encoded raster.
#[tracing::instrument(name = "export_mockup", skip(state, body))]
pub async fn export_mockup(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExportRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let width = body.width.unwrap_or(DEFAULT_SIZE);
    let height = body.height.unwrap_or(DEFAULT_SIZE);
    if width == 0 || height == 0 {
        return Err(ApiError::BadRequest("target size must be positive".into()));
    }
    let target = ExportTarget {
        width,
        height,
        format: body.format.unwrap_or(ExportFormat::Png),
    };

    let entry = state.library.get(id)?;
    let elements = state.elements.load_elements(id)?.unwrap_or_default();

    let assets = state
        .assets
        .load_all(&entry.path, &elements, LOAD_TIMEOUT)
        .await?;
    let layers: Vec<Layer<'_>> = elements
        .iter()
        .zip(&assets.elements)
        .map(|(element, image)| Layer { element, image })
        .collect();

    let preview = body.preview.unwrap_or_else(|| {
        PreviewGeometry::natural(ImageInfo {
            width: assets.mockup.width(),
            height: assets.mockup.height(),
        })
    });
    let calibration = body.calibration.unwrap_or_default();
    let background = body.background.as_deref().unwrap_or(DEFAULT_BACKGROUND);

    let compositor = Compositor::new(target);
    let bytes = compositor.render_encoded(&assets.mockup, &layers, background, &calibration, preview)?;

    let mime = match target.format {
        ExportFormat::Png => "image/png",
        ExportFormat::Jpg => "image/jpeg",
    };
    let file_name = casekit_renderer::export_file_name(&entry.model, target);

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

/// Parse a path id into the numeric mockup identity.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| LibraryError::InvalidId(raw.to_string()).into())
}

/// Current Unix timestamp in milliseconds, the fallback mockup number.
fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
