use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::service::SharedService;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub knowledge_base: HealthCheck,
    pub conversations: usize,
    pub subscribers: usize,
    pub diagnostic_subscribers: usize,
    pub reply_tasks_in_flight: usize,
    pub checked_at: String,
}

/// Always 200 while the process serves requests; a missing knowledge base
/// only degrades replies.
pub async fn health(State(service): State<SharedService>) -> (StatusCode, Json<HealthResponse>) {
    let knowledge_base = knowledge_check(&service);
    let ready = knowledge_base.status != "degraded";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "hookrelay-server accepting webhooks".to_string(),
        },
        knowledge_base,
        conversations: service.store.len().await,
        subscribers: service.notifier.subscriber_count(),
        diagnostic_subscribers: service.notifier.diagnostic_subscriber_count(),
        reply_tasks_in_flight: service.tasks.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

fn knowledge_check(service: &SharedService) -> HealthCheck {
    let knowledge = service.pipeline.knowledge();
    let path = knowledge.path().display();
    match knowledge.is_loaded() {
        None => HealthCheck { status: "pending", detail: format!("`{path}` loads on first message") },
        Some(true) => HealthCheck { status: "ready", detail: format!("`{path}` loaded") },
        Some(false) => HealthCheck { status: "degraded", detail: format!("`{path}` unreadable") },
    }
}
