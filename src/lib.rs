pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod workflow;

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    services::reconciler::Reconciler,
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

/// Webhook and admin routes. Transport layers (timeouts, tracing) are added
/// by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/adyen/notify/{method_code}",
            post(adapters::adyen::notify_handler),
        )
        .route(
            "/admin/payments/{payment_id}/capture",
            post(adapters::admin::capture),
        )
        .route(
            "/admin/payments/{payment_id}/cancel",
            post(adapters::admin::cancel),
        )
        .route(
            "/admin/payments/{payment_id}/reverse",
            post(adapters::admin::reverse),
        )
        .route(
            "/admin/payments/{payment_id}/refunds",
            post(adapters::admin::refund),
        )
        .route(
            "/admin/orders/{order_id}/take-over",
            post(adapters::admin::take_over),
        )
        .layer(DefaultBodyLimit::max(256 * 1024)) // notification batches hold at most a few dozen items
        .with_state(state)
}
