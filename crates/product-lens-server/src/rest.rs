//! HTTP entry point for product-lens.
//!
//! Storefront pages call `/api/hanwha-image` cross-origin, so every route
//! sits behind a permissive CORS layer. Handlers always answer with JSON.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use product_lens::{ResolveError, Resolver};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum Router with all endpoints.
pub fn router(resolver: Arc<Resolver>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/hanwha-image", get(hanwha_image))
        .layer(cors)
        .with_state(resolver)
}

/// Serve until the listener fails.
pub async fn start(addr: SocketAddr, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    let app = router(resolver);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("product-lens listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct ImageParams {
    sku: Option<String>,
    debug: Option<String>,
}

/// `debug=1` and `debug=true` enable the trace; anything else does not.
fn debug_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true")
    )
}

async fn hanwha_image(
    params: Result<Query<ImageParams>, QueryRejection>,
    State(resolver): State<Arc<Resolver>>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    let sku = params.sku.as_deref().unwrap_or("").trim().to_string();
    if sku.is_empty() {
        return missing_sku();
    }
    let debug = debug_flag(params.debug.as_deref());

    let task_sku = sku.clone();
    let joined =
        tokio::task::spawn(async move { resolver.resolve(&task_sku, debug).await }).await;

    match joined {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(ResolveError::InvalidInput(_))) => missing_sku(),
        Ok(Err(e)) => internal_error(&sku, &e),
        Err(e) => internal_error(
            &sku,
            &ResolveError::InternalFailure(format!("task panicked: {e}")),
        ),
    }
}

fn missing_sku() -> Response {
    bad_request("missing sku")
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn internal_error(sku: &str, error: &ResolveError) -> Response {
    tracing::error!("resolving {sku} failed: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "sku": sku, "error": error.to_string() })),
    )
        .into_response()
}

async fn health(State(resolver): State<Arc<Resolver>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "index_built": resolver.index().is_built(),
        "indexed_products": resolver.index().product_count(),
    }))
}
