use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hookrelay_core::notify::{
    AuthOutcome, AuthenticationDiagnostic, CustomerMessageFrame, SuggestionFrame,
};
use hookrelay_core::{
    Customer, DiagnosticEvent, InboundMessage, InterfaceError, NotificationEvent, Sender,
};
use hookrelay_platform::auth::{FORWARDED_FOR_HEADER, SIGNATURE_HEADER};
use hookrelay_platform::{
    normalize, AuthRejection, ForwardedFor, NormalizedEvent, WebhookEnvelope, WebhookRequest,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::service::{RelayService, SharedService};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Received {
    pub status: &'static str,
}

fn received() -> Response {
    (StatusCode::OK, Json(Received { status: "received" })).into_response()
}

/// `POST /webhook`: authenticate, normalize, record, notify, then hand the
/// reply work to a background task.
pub async fn receive(State(service): State<SharedService>, request: Request) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let peer_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip().to_canonical().to_string());
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(error) => {
            warn!(
                event_name = "ingress.webhook.body_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "webhook body could not be read"
            );
            return ApiError(InterfaceError::BadRequest {
                message: "body_unreadable".to_string(),
                correlation_id,
            })
            .into_response();
        }
    };

    let envelope = WebhookEnvelope::parse(&body);
    let null = Value::Null;
    let payload = envelope.as_ref().map_or(&null, |envelope| &envelope.payload);

    let webhook_request = WebhookRequest {
        forwarded_for: forwarded_for(&parts.headers),
        peer_address: peer_address.as_deref(),
        signature: header(&parts.headers, SIGNATURE_HEADER),
        payload,
    };
    let source_address = webhook_request.source_address();

    if let Err(rejection) = service.authenticator.authenticate(&webhook_request) {
        return reject(&service, rejection, source_address, correlation_id);
    }
    record_authentication(&service, &correlation_id, AuthOutcome::Accepted, None, source_address);

    let Some(envelope) = envelope else {
        debug!(
            event_name = "ingress.webhook.unparseable",
            correlation_id = %correlation_id,
            "authenticated webhook body was not a JSON object; ignored"
        );
        return received();
    };

    let Some(event) = normalize(&envelope.hook, &envelope.payload) else {
        debug!(
            event_name = "ingress.webhook.ignored",
            correlation_id = %correlation_id,
            hook = %envelope.hook,
            "webhook carried no customer message"
        );
        return received();
    };

    accept(&service, event, &correlation_id).await;
    received()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn forwarded_for(headers: &HeaderMap) -> ForwardedFor<'_> {
    match headers.get(FORWARDED_FOR_HEADER) {
        None => ForwardedFor::Absent,
        Some(value) => value.to_str().map_or(ForwardedFor::Unreadable, ForwardedFor::Header),
    }
}

fn reject(
    service: &RelayService,
    rejection: AuthRejection,
    source_address: Option<String>,
    correlation_id: String,
) -> Response {
    let reason = rejection.reason().as_str();
    warn!(
        event_name = "ingress.webhook.rejected",
        correlation_id = %correlation_id,
        reason,
        source_address = source_address.as_deref().unwrap_or("unknown"),
        "webhook authentication failed"
    );
    record_authentication(
        service,
        &correlation_id,
        AuthOutcome::Rejected,
        Some(reason.to_string()),
        source_address,
    );

    let message = reason.to_string();
    let error = match rejection {
        AuthRejection::Forbidden(_) => InterfaceError::Forbidden { message, correlation_id },
        AuthRejection::BadRequest(_) => InterfaceError::BadRequest { message, correlation_id },
    };
    ApiError(error).into_response()
}

fn record_authentication(
    service: &RelayService,
    correlation_id: &str,
    outcome: AuthOutcome,
    reason: Option<String>,
    source_address: Option<String>,
) {
    service.notifier.diagnose(DiagnosticEvent::Authentication(AuthenticationDiagnostic {
        correlation_id: correlation_id.to_string(),
        outcome,
        reason,
        source_address,
        at: Utc::now(),
    }));
}

async fn accept(service: &SharedService, event: NormalizedEvent, correlation_id: &str) {
    let NormalizedEvent { message, customer } = event;
    let conversation_id = message.conversation_id.clone();
    let content = message.content.clone();
    let received_at = message.received_at;

    let outcome = service.store.append(&customer, message).await;
    let customer_name = service
        .store
        .customer(&conversation_id)
        .await
        .unwrap_or(customer)
        .display_name()
        .to_string();

    info!(
        event_name = "ingress.webhook.accepted",
        correlation_id = %correlation_id,
        conversation_id = %conversation_id,
        created = outcome.created,
        message_count = outcome.message_count,
        "customer message recorded"
    );
    if let Some(evicted) = &outcome.evicted {
        info!(
            event_name = "store.conversation.evicted",
            correlation_id = %correlation_id,
            conversation_id = %evicted,
            "least recently active conversation evicted"
        );
    }

    service.notifier.broadcast(NotificationEvent::CustomerMessage(CustomerMessageFrame {
        conversation_id: conversation_id.clone(),
        customer_name,
        content: content.clone(),
        received_at,
        message_count: outcome.message_count,
    }));

    let task_service = Arc::clone(service);
    let correlation_id = correlation_id.to_string();
    service.tasks.spawn(async move {
        run_reply(task_service, conversation_id, content, correlation_id).await;
    });
}

async fn run_reply(
    service: SharedService,
    conversation_id: String,
    content: String,
    correlation_id: String,
) {
    let budget = Duration::from_secs(service.config.reply.task_timeout_secs);
    let outcome =
        match tokio::time::timeout(budget, service.pipeline.handle(&conversation_id, &content))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    event_name = "reply.task.timed_out",
                    correlation_id = %correlation_id,
                    conversation_id = %conversation_id,
                    timeout_secs = budget.as_secs(),
                    "reply task exceeded its budget"
                );
                return;
            }
        };

    if outcome.auto_sent {
        service
            .store
            .append(
                &Customer::default(),
                InboundMessage {
                    conversation_id: conversation_id.clone(),
                    sender: Sender::Agent,
                    content: outcome.suggestion.clone(),
                    received_at: Utc::now(),
                },
            )
            .await;
    }

    info!(
        event_name = "reply.task.completed",
        correlation_id = %correlation_id,
        conversation_id = %conversation_id,
        auto_sent = outcome.auto_sent,
        degraded = outcome.degraded,
        send_failed = outcome.send_error.is_some(),
        "reply task completed"
    );

    service.notifier.broadcast(NotificationEvent::AiSuggestion(SuggestionFrame {
        conversation_id,
        suggestion: outcome.suggestion,
        auto_sent: outcome.auto_sent,
        degraded: outcome.degraded,
    }));
}
