//! Reply generation for inbound customer messages.
//!
//! The pipeline grounds every answer in a static knowledge base:
//! 1. **Knowledge** (`knowledge`) - read once per process, failure cached
//! 2. **Prompt** (`prompt`) - bounded knowledge plus the verbatim message
//! 3. **Completion** (`llm`) - pluggable `LlmClient` for OpenAI/Anthropic/Ollama
//! 4. **Delivery** (`pipeline`) - assist or auto-reply through `OutboundReply`
//!
//! Provider and knowledge failures never propagate; callers always receive
//! text, marked degraded when it is a fixed fallback.

pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod prompt;

pub use knowledge::{KnowledgeBase, KnowledgeState};
pub use llm::{HttpLlmClient, LlmClient, LlmError};
pub use pipeline::{
    PipelineSettings, ReplyOutcome, ReplyPipeline, Suggestion, APOLOGY_REPLY,
    KNOWLEDGE_UNAVAILABLE_REPLY,
};
