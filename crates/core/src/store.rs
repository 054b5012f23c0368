//! In-memory conversation map.
//!
//! Conversations live for the life of the process. The map is capped at
//! `max_conversations`; inserting a new id past the cap evicts the least
//! recently touched conversation. Messages are appended as received with no
//! deduplication, so a replayed webhook produces a second message.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, ConversationSummary, Customer, InboundMessage};

#[derive(Debug)]
pub struct ConversationStore {
    state: RwLock<StoreState>,
    max_conversations: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    conversations: HashMap<String, Entry>,
    sequence: u64,
}

#[derive(Debug)]
struct Entry {
    conversation: Conversation,
    touched: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    pub created: bool,
    pub message_count: usize,
    pub evicted: Option<String>,
}

impl ConversationStore {
    pub fn new(max_conversations: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            max_conversations: max_conversations.max(1),
        }
    }

    pub async fn append(&self, customer: &Customer, message: InboundMessage) -> AppendOutcome {
        let mut state = self.state.write().await;
        state.sequence += 1;
        let touched = state.sequence;

        let mut evicted = None;
        let created = !state.conversations.contains_key(&message.conversation_id);
        if created && state.conversations.len() >= self.max_conversations {
            evicted = state.evict_least_recent();
        }

        let entry = state.conversations.entry(message.conversation_id.clone()).or_insert_with(|| {
            Entry {
                conversation: Conversation::new(message.conversation_id.clone(), Customer::default()),
                touched,
            }
        });
        entry.touched = touched;
        entry.conversation.customer.merge_from(customer);
        entry.conversation.messages.push(message);

        AppendOutcome { created, message_count: entry.conversation.messages.len(), evicted }
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state.conversations.get(id).map(|entry| entry.conversation.clone())
    }

    pub async fn customer(&self, id: &str) -> Option<Customer> {
        let state = self.state.read().await;
        state.conversations.get(id).map(|entry| entry.conversation.customer.clone())
    }

    /// Summaries ordered by most recent activity first.
    pub async fn list(&self) -> Vec<ConversationSummary> {
        let state = self.state.read().await;
        let mut summaries: Vec<ConversationSummary> =
            state.conversations.values().map(|entry| entry.conversation.summary()).collect();
        summaries.sort_by(|left, right| {
            right.last_activity.cmp(&left.last_activity).then_with(|| left.id.cmp(&right.id))
        });
        summaries
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_conversations
    }
}

impl StoreState {
    fn evict_least_recent(&mut self) -> Option<String> {
        let oldest = self
            .conversations
            .iter()
            .min_by_key(|(_, entry)| entry.touched)
            .map(|(id, _)| id.clone())?;
        self.conversations.remove(&oldest);
        Some(oldest)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::ConversationStore;
    use crate::domain::conversation::{Customer, InboundMessage, Sender};

    fn message(conversation_id: &str, content: &str) -> InboundMessage {
        InboundMessage {
            conversation_id: conversation_id.to_owned(),
            sender: Sender::Customer,
            content: content.to_owned(),
            received_at: Utc::now(),
        }
    }

    fn ada() -> Customer {
        Customer { name: Some("Ada".to_owned()), phone_number: None }
    }

    #[tokio::test]
    async fn first_message_creates_conversation_and_later_ones_append() {
        let store = ConversationStore::new(10);

        let first = store.append(&ada(), message("c1", "Hello")).await;
        let second = store.append(&Customer::default(), message("c1", "Still there?")).await;

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.message_count, 2);

        let conversation = store.get("c1").await.expect("conversation exists");
        assert_eq!(conversation.customer.display_name(), "Ada");
        assert_eq!(conversation.messages[1].content, "Still there?");
    }

    #[tokio::test]
    async fn replayed_message_is_appended_twice() {
        let store = ConversationStore::new(10);
        let replay = message("c1", "Hello");

        store.append(&ada(), replay.clone()).await;
        let outcome = store.append(&ada(), replay).await;

        assert_eq!(outcome.message_count, 2);
    }

    #[tokio::test]
    async fn evicts_least_recently_touched_conversation_at_capacity() {
        let store = ConversationStore::new(2);

        store.append(&ada(), message("c1", "one")).await;
        store.append(&ada(), message("c2", "two")).await;
        store.append(&ada(), message("c1", "one again")).await;
        let outcome = store.append(&ada(), message("c3", "three")).await;

        assert_eq!(outcome.evicted.as_deref(), Some("c2"));
        assert_eq!(store.len().await, 2);
        assert!(store.get("c2").await.is_none());
        assert!(store.get("c1").await.is_some());
    }

    #[tokio::test]
    async fn list_orders_by_last_activity_descending() {
        let store = ConversationStore::new(10);
        let now = Utc::now();

        let mut older = message("old", "earlier");
        older.received_at = now - Duration::minutes(5);
        let mut newer = message("new", "later");
        newer.received_at = now;

        store.append(&ada(), older).await;
        store.append(&Customer::default(), newer).await;

        let summaries = store.list().await;
        let ids: Vec<&str> = summaries.iter().map(|summary| summary.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(summaries[1].name, "Ada");
        assert_eq!(summaries[0].name, "Unknown");
    }

    #[tokio::test]
    async fn unknown_conversation_returns_none() {
        let store = ConversationStore::new(1);
        assert!(store.get("missing").await.is_none());
        assert!(store.is_empty().await);
    }
}
