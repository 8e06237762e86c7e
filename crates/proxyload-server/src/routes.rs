//! HTTP routes for the proxyload server.
//!
//! Everything under the dist directory is served as static files. Artifacts
//! under `/items` are content-addressed and never change, so they carry an
//! immutable cache policy; release bootstraps and documents do not.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path as AxumPath, State},
    http::{HeaderValue, StatusCode, header},
    response::Json,
    routing::get,
};
use proxyload_core::{DistLayout, ReleaseIndex};
use serde_json::{Value, json};
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

/// Cache policy for content-addressed artifacts.
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Cache policy for bootstraps and documents, which change on rebuild.
pub const REVALIDATE: &str = "no-cache";

/// Application state shared across handlers.
pub struct AppState {
    /// Dist directory being served.
    pub layout: DistLayout,
}

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let items = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE),
    )
    .layer(ServeDir::new(&state.layout.items_dir));

    let documents = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(REVALIDATE),
    )
    .layer(ServeDir::new(&state.layout.root));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/releases", get(releases_handler))
        .route("/api/releases/{id}", get(release_handler))
        .nest_service("/items", items)
        .fallback_service(documents)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn load_index(state: &AppState) -> Result<ReleaseIndex, (StatusCode, Json<Value>)> {
    ReleaseIndex::load(state.layout.release_index()).map_err(|e| {
        tracing::error!("Failed to read release index: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

/// Releases, most recently updated first.
async fn releases_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let index = load_index(&state)?;
    let releases: Vec<Value> = index
        .newest_first()
        .into_iter()
        .map(|(id, record)| {
            json!({
                "id": id,
                "createdAt": record.created_at,
                "updatedAt": record.updated_at,
            })
        })
        .collect();
    Ok(Json(json!({ "releases": releases })))
}

/// One release record.
async fn release_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let index = load_index(&state)?;
    match index.get(&id) {
        Some(record) => Ok(Json(json!({
            "id": id,
            "createdAt": record.created_at,
            "updatedAt": record.updated_at,
        }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("release {id} not found") })),
        )),
    }
}
