//! Conversation platform adapter: webhook authentication, event
//! normalization, and authenticated outbound replies.

pub mod auth;
pub mod client;
pub mod events;
pub mod token;

pub use auth::{
    AuthRejection, Authenticator, Authorized, ForwardedFor, RejectReason, WebhookRequest,
};
pub use client::{CredentialClient, PlatformClient, PlatformError};
pub use events::{normalize, HookType, NormalizedEvent, WebhookEnvelope};
pub use token::{Clock, CredentialSource, SystemClock, TokenCache};
