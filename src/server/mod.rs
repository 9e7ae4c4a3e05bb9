pub mod routes;
pub mod user;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let index = static_dir.join("index.html");

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/accounts",
            get(routes::list_accounts).post(routes::create_account),
        )
        .route(
            "/api/trades",
            get(routes::list_trades).post(routes::create_trade),
        )
        .route("/api/trades/bulk-delete", post(routes::bulk_delete_trades))
        .route(
            "/api/trades/{id}",
            get(routes::get_trade)
                .put(routes::update_trade)
                .delete(routes::delete_trade),
        )
        .route("/api/dashboard/metrics", get(routes::get_dashboard_metrics))
        .route(
            "/api/dashboard/calendar-heatmap",
            get(routes::get_calendar_heatmap),
        )
        .route("/api/counters", get(routes::get_counters))
        .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
