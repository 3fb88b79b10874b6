//! API Route Configuration

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, on, MethodFilter},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{
    logging_middleware, no_cache_middleware, request_id_middleware, security_headers_middleware,
};
use crate::utils::constants::REQUEST_ID_HEADER;

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public demo endpoint, any origin
    let launchpad_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)]);

    let launchpad = Router::new()
        .route(
            "/ping",
            get(handlers::launchpad_ping)
                .options(handlers::launchpad_options)
                .fallback(handlers::method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(launchpad_cors);

    let api = Router::new()
        // Health & Status
        .route(
            "/health",
            get(handlers::health_check).fallback(handlers::method_not_allowed),
        )
        .route("/ping", get(handlers::ping).fallback(handlers::method_not_allowed))
        // Scan
        .route(
            "/scan",
            get(handlers::scan_get)
                .post(handlers::scan_post)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        // Apply form, forwarded as-is
        .route(
            "/apply",
            on(
                MethodFilter::GET.or(MethodFilter::POST).or(MethodFilter::OPTIONS),
                handlers::apply,
            )
            .fallback(handlers::method_not_allowed),
        )
        .nest("/launchpad", launchpad);

    // Unknown paths get a JSON 404, known paths with the wrong method a JSON 405
    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state)
        // Outermost first: the request id must exist before logging sees the request
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(middleware::from_fn(logging_middleware))
                .layer(middleware::from_fn(no_cache_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
}
