//! Fan-out of business events and authentication diagnostics to push subscribers.
//!
//! Delivery is best effort: no backlog, no replay, and emitting with zero
//! subscribers is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum NotificationEvent {
    CustomerMessage(CustomerMessageFrame),
    AiSuggestion(SuggestionFrame),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMessageFrame {
    pub conversation_id: String,
    pub customer_name: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
    pub message_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFrame {
    pub conversation_id: String,
    pub suggestion: String,
    pub auto_sent: bool,
    pub degraded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum DiagnosticEvent {
    Authentication(AuthenticationDiagnostic),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationDiagnostic {
    pub correlation_id: String,
    pub outcome: AuthOutcome,
    pub reason: Option<String>,
    pub source_address: Option<String>,
    pub at: DateTime<Utc>,
}

/// JSON text frame for the push channel.
pub trait Frame: Serialize {
    fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                "{{\"type\":\"error\",\"payload\":{{\"message\":\"{}\"}}}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    }
}

impl Frame for NotificationEvent {}
impl Frame for DiagnosticEvent {}

#[derive(Clone, Debug)]
pub struct Notifier {
    events: broadcast::Sender<NotificationEvent>,
    diagnostics: broadcast::Sender<DiagnosticEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (events, _) = broadcast::channel(capacity);
        let (diagnostics, _) = broadcast::channel(capacity);
        Self { events, diagnostics }
    }

    /// Returns how many subscribers the event was handed to.
    pub fn broadcast(&self, event: NotificationEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn diagnose(&self, event: DiagnosticEvent) -> usize {
        self.diagnostics.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.diagnostics.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn diagnostic_subscriber_count(&self) -> usize {
        self.diagnostics.receiver_count()
    }
}
