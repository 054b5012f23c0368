use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::service::SharedService;
use crate::{conversations, health, push, webhook};

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/webhook", post(webhook::receive))
        .route("/conversations", get(conversations::list))
        .route("/conversations/{id}", get(conversations::detail))
        .route("/ws", get(push::events))
        .route("/ws/diagnostics", get(push::diagnostics))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
