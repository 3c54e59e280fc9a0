pub mod api;
pub mod errors;
pub mod kafka;

use std::sync::Arc;

use axum::Router;
use provisioner_core::Provisioner;
use tower_http::trace::TraceLayer;

pub const DEFAULT_LOG_FILTER: &str =
    "provisioner_server=info,provisioner_core=info,tower_http=debug,rdkafka=info";

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Provisioner,
}

/// Every request lands on the provisioning handler; it does its own method
/// and path checks.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(api::provision)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
