//! Axum router for the package server Web API
//!
//! Routes (relative to the configured application path):
//! - GET /                   - Service overview
//! - GET /packages           - Package listing
//! - GET /packages/:query    - Modules matching a query expression

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use pkgsrv_core::service::{ModuleListing, PackageListing, ServiceDescriptor};
use pkgsrv_core::CatalogService;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

type SharedService = Arc<CatalogService>;

/// Create the application router, mounted under `app_path`
pub fn router(service: SharedService, app_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/", get(service_overview))
        .route("/packages", get(list_packages))
        .route("/packages/:query", get(resolve_modules))
        .with_state(service);

    let app_path = app_path.trim_end_matches('/');
    let app = if app_path.is_empty() {
        api
    } else if app_path.starts_with('/') {
        Router::new().nest(app_path, api)
    } else {
        Router::new().nest(&format!("/{}", app_path), api)
    };

    app.layer(cors)
}

/// Bind `addr` and serve until interrupted
pub async fn serve(service: SharedService, app_path: &str, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Package server listening on http://{}{}", addr, app_path);

    axum::serve(listener, router(service, app_path))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// GET /
async fn service_overview(State(service): State<SharedService>) -> Json<ServiceDescriptor> {
    Json(service.service_overview().clone())
}

/// GET /packages
async fn list_packages(
    State(service): State<SharedService>,
) -> Result<Json<PackageListing>, ApiError> {
    let listing = run_blocking(move || service.list_packages()).await?;
    Ok(Json(listing))
}

/// GET /packages/:query
async fn resolve_modules(
    State(service): State<SharedService>,
    Path(query): Path<String>,
) -> Result<Json<ModuleListing>, ApiError> {
    let expression = query.clone();
    match run_blocking(move || service.resolve_modules(&expression)).await? {
        Some(listing) => Ok(Json(listing)),
        None => Err(ApiError::NotFound(format!(
            "unknown package or module '{}'",
            query
        ))),
    }
}

/// Catalog loads read files synchronously; keep them off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> pkgsrv_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Error responses of the Web API
#[derive(Debug)]
enum ApiError {
    /// Unknown package or module (404)
    NotFound(String),
    /// Failure while loading the catalog (500)
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                warn!("{}", message);
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Internal(error) => {
                error!("Request failed: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": error })),
                )
                    .into_response()
            }
        }
    }
}
