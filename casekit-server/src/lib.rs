//! # Casekit Server Library
//!
//! Shared state and router assembly for the casekit file server.
//! This library is used by both the binary and integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use casekit_renderer::AssetRoot;

pub mod elements_repo;
pub mod error;
pub mod library;
pub mod routes;
pub mod validation;

pub use elements_repo::FsElementsRepository;
pub use error::{ApiError, ApiResult};
pub use library::MockupLibrary;

/// Request body ceiling: a 10 MB upload plus multipart framing.
const BODY_LIMIT: usize = 12 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// On-disk mockup template library.
    pub library: Arc<MockupLibrary>,
    /// On-disk per-mockup element sets.
    pub elements: Arc<FsElementsRepository>,
    /// Resolver for rendering assets under the data directory.
    pub assets: AssetRoot,
    /// Root data directory (also served at `/uploads`).
    pub data_dir: PathBuf,
}

impl AppState {
    /// Create state rooted at `data_dir`, creating the directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the directories cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let data_dir = data_dir.into();
        Ok(Self {
            library: Arc::new(MockupLibrary::new(&data_dir)?),
            elements: Arc::new(FsElementsRepository::new(&data_dir)?),
            assets: AssetRoot::new(&data_dir),
            data_dir,
        })
    }

    /// The directory served at `/uploads`.
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Assemble the full router over the given state.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let uploads_service = ServeDir::new(state.uploads_dir());

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/mockups", get(routes::list_mockups))
        .route("/api/models", get(routes::list_models))
        .route("/api/upload/mockup", post(routes::upload_mockup))
        .route("/api/upload/user-image", post(routes::upload_user_image))
        .route("/api/mockups/{id}/model", put(routes::update_mockup_model))
        .route("/api/mockups/{id}", axum::routing::delete(routes::delete_mockup))
        .route(
            "/api/mockup-elements/{id}",
            get(routes::load_elements)
                .post(routes::save_elements)
                .delete(routes::delete_elements),
        )
        .route(
            "/api/mockup-elements/{id}/beacon",
            post(routes::beacon_elements),
        )
        .route("/api/export/{id}", post(routes::export_mockup))
        .nest_service("/uploads", uploads_service)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Convenience for tests: state plus router from a data directory.
///
/// # Errors
///
/// Returns an error when the directory tree cannot be created.
pub fn app(data_dir: impl Into<PathBuf>) -> std::io::Result<Router> {
    let state = AppState::new(data_dir)?;
    Ok(build_router(state))
}
