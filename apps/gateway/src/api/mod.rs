//! HTTP surface: router and handlers.

pub mod handlers;

use axum::http::HeaderValue;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/keys/public", get(handlers::health::public_keys))
        .route("/verify/:bundle_id", get(handlers::verify::verify_bundle))
        .route("/certificates/:profile", post(handlers::certificates::issue))
        // The Bundle endpoint signs (and for document creates, expands);
        // everything else passes through to the upstream store.
        .route("/fhir/Bundle", any(handlers::bundle::bundle))
        .route("/fhir", any(handlers::proxy::forward_root))
        .route("/fhir/*path", any(handlers::proxy::forward))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
