pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod outbound;
pub mod store;

pub use domain::conversation::{Conversation, ConversationSummary, Customer, InboundMessage, Sender};
pub use errors::{ApplicationError, InterfaceError};
pub use notify::{DiagnosticEvent, NotificationEvent, Notifier};
pub use outbound::OutboundReply;
pub use store::{AppendOutcome, ConversationStore};
