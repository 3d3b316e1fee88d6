//! # Casekit Server
//!
//! File server for the casekit mockup editor. Binds to localhost only.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use casekit_server::{build_router, AppState};

/// Default port for the casekit server.
const DEFAULT_PORT: u16 = 3000;

/// Default data directory when `CASEKIT_DATA_DIR` is unset.
const DEFAULT_DATA_DIR: &str = "./data";

/// Build a CORS layer that only allows localhost origins.
///
/// The server is designed to run on the local machine; requests from other
/// origins are rejected.
fn build_cors_layer(port: u16) -> CorsLayer {
    let localhost_origins = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        // Common dev-server ports
        "http://localhost:5173".to_string(),
        "http://localhost:8080".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8080".to_string(),
    ];

    let origins: Vec<HeaderValue> = localhost_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Initialize structured tracing with optional JSON format.
///
/// `RUST_LOG` controls levels (default: info,casekit_server=debug,tower_http=debug).
/// `RUST_LOG_FORMAT=json` switches to JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,casekit_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let port = std::env::var("CASEKIT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let data_dir = std::env::var("CASEKIT_DATA_DIR")
        .map_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

    tracing::info!("Data directory: {}", data_dir.display());

    let state = AppState::new(&data_dir)?;
    let app = build_router(state).layer(build_cors_layer(port));

    // Bind to localhost only.
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Casekit server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
