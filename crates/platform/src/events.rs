use chrono::{DateTime, Utc};
use hookrelay_core::{Customer, InboundMessage, Sender};
use serde::Deserialize;
use serde_json::Value;

pub const MESSAGE_CREATED: &str = "message.created";
pub const CONVERSATION_CREATED: &str = "conversation.created";

/// Raw webhook body: `{hook, payload}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub payload: Value,
}

impl WebhookEnvelope {
    /// Parses a request body; anything that is not a JSON object yields `None`.
    pub fn parse(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn hook_type(&self) -> HookType {
        HookType::parse(&self.hook)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookType {
    MessageCreated,
    ConversationCreated,
    Unsupported,
}

impl HookType {
    pub fn parse(hook: &str) -> Self {
        match hook {
            MESSAGE_CREATED => Self::MessageCreated,
            CONVERSATION_CREATED => Self::ConversationCreated,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated => MESSAGE_CREATED,
            Self::ConversationCreated => CONVERSATION_CREATED,
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub message: InboundMessage,
    pub customer: Customer,
}

/// Reduces a webhook payload to a customer message, or `None` when the event should be ignored.
pub fn normalize(hook: &str, payload: &Value) -> Option<NormalizedEvent> {
    normalize_at(hook, payload, Utc::now())
}

pub fn normalize_at(
    hook: &str,
    payload: &Value,
    received_at: DateTime<Utc>,
) -> Option<NormalizedEvent> {
    let (conversation_id, content, customer) = match HookType::parse(hook) {
        HookType::MessageCreated => {
            // Agent-authored messages carry no customer.
            let customer = present(payload.get("customer"))?;
            (
                identifier(payload.get("conversationId"))?,
                payload.get("content")?.as_str()?,
                customer_from(customer),
            )
        }
        HookType::ConversationCreated => {
            let messages = present(payload.get("messages"))?;
            let first = match messages {
                Value::Array(items) => items.first()?,
                other => other,
            };
            (
                identifier(payload.get("uuid"))?,
                first.get("content")?.as_str()?,
                present(payload.get("customer")).map(customer_from).unwrap_or_default(),
            )
        }
        HookType::Unsupported => return None,
    };

    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    Some(NormalizedEvent {
        message: InboundMessage {
            conversation_id,
            sender: Sender::Customer,
            content: content.to_owned(),
            received_at,
        },
        customer,
    })
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn identifier(value: Option<&Value>) -> Option<String> {
    let id = match present(value)? {
        Value::String(id) => id.trim().to_owned(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

fn customer_from(value: &Value) -> Customer {
    let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
    Customer { name: field("name"), phone_number: field("phoneNumber") }
}
