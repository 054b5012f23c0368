use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const UNKNOWN_CUSTOMER: &str = "Unknown";
const PREVIEW_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sender {
    Customer,
    Agent,
}

/// A single message reduced from any supported webhook shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub conversation_id: String,
    pub sender: Sender,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> &str {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.phone_number.as_deref()))
            .unwrap_or(UNKNOWN_CUSTOMER)
    }

    pub fn is_anonymous(&self) -> bool {
        non_blank(self.name.as_deref()).is_none()
            && non_blank(self.phone_number.as_deref()).is_none()
    }

    /// Fills in identity fields that `other` knows and `self` does not.
    pub fn merge_from(&mut self, other: &Customer) {
        if let Some(name) = non_blank(other.name.as_deref()) {
            self.name = Some(name.to_string());
        }
        if let Some(phone_number) = non_blank(other.phone_number.as_deref()) {
            self.phone_number = Some(phone_number.to_string());
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub customer: Customer,
    pub messages: Vec<InboundMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, customer: Customer) -> Self {
        Self { id: id.into(), customer, messages: Vec::new() }
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|message| message.received_at)
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            name: self.customer.display_name().to_string(),
            last_message_preview: self
                .messages
                .last()
                .map(|message| preview(&message.content))
                .unwrap_or_default(),
            message_count: self.messages.len(),
            last_activity: self.last_activity(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub name: String,
    pub last_message_preview: String,
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Conversation, Customer, InboundMessage, Sender};

    #[test]
    fn display_name_falls_back_to_phone_then_unknown() {
        let named = Customer { name: Some("Ada".into()), phone_number: Some("+90555".into()) };
        assert_eq!(named.display_name(), "Ada");

        let phone_only = Customer { name: Some("  ".into()), phone_number: Some("+90555".into()) };
        assert_eq!(phone_only.display_name(), "+90555");

        assert_eq!(Customer::default().display_name(), "Unknown");
        assert!(Customer::default().is_anonymous());
    }

    #[test]
    fn merge_keeps_existing_fields_when_other_is_blank() {
        let mut customer = Customer { name: Some("Ada".into()), phone_number: None };
        customer.merge_from(&Customer { name: None, phone_number: Some("+90555".into()) });

        assert_eq!(customer.name.as_deref(), Some("Ada"));
        assert_eq!(customer.phone_number.as_deref(), Some("+90555"));
    }

    #[test]
    fn summary_truncates_long_previews_on_char_boundaries() {
        let mut conversation = Conversation::new("c1", Customer::default());
        conversation.messages.push(InboundMessage {
            conversation_id: "c1".into(),
            sender: Sender::Customer,
            content: "ş".repeat(150),
            received_at: Utc::now(),
        });

        let summary = conversation.summary();
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.name, "Unknown");
        assert_eq!(summary.last_message_preview.chars().count(), 101);
        assert!(summary.last_message_preview.ends_with('…'));
    }

    #[test]
    fn summary_serializes_with_camel_case_keys() {
        let conversation = Conversation::new("c1", Customer::default());
        let value = serde_json::to_value(conversation.summary()).expect("serialize");

        assert!(value.get("lastMessagePreview").is_some());
        assert!(value.get("messageCount").is_some());
        assert!(value.get("lastActivity").is_some());
    }
}
