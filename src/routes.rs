// src/routes.rs
use axum::{
    middleware,
    routing::{any, delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{api, history, proxy, repositories, search};
use crate::middleware::rate_limit::proxy_rate_limit;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // The proxy spends the server's credential, so it is throttled per client.
    let proxy_routes = Router::new()
        .route("/api/github/*path", any(proxy::forward))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            proxy_rate_limit,
        ));

    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/rate-limit", get(api::rate_limit))
        .route("/api/cache", delete(api::clear_cache))
        // ==================
        // SEARCH
        // ==================
        .route("/api/search/issues", get(search::search_issues))
        .route("/api/search/repositories", get(search::search_repositories))
        // ==================
        // REPOSITORIES
        // ==================
        .route("/api/repositories/trending", get(repositories::trending))
        .route("/api/repositories/popular", get(repositories::popular))
        .route("/api/repositories/featured", get(repositories::featured))
        .route("/api/repositories/topic/:topic", get(repositories::by_topic))
        .route("/api/repositories/owner/:owner", get(repositories::by_owner))
        .route(
            "/api/repositories/:owner/:repo",
            get(repositories::get_repository),
        )
        // ==================
        // ISSUE HISTORY
        // ==================
        .route(
            "/api/history",
            get(history::list_history).post(history::create_history),
        )
        .route("/api/history/:id", delete(history::delete_history))
        .merge(proxy_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
