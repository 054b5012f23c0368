//! Static knowledge base read once per process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KnowledgeState {
    Loaded(Arc<str>),
    Unavailable(String),
}

impl KnowledgeState {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Loaded(text) => Some(&**text),
            Self::Unavailable(_) => None,
        }
    }
}

/// Lazily loaded knowledge base. The first load outcome, success or failure,
/// is kept for the life of the process.
#[derive(Debug)]
pub struct KnowledgeBase {
    path: PathBuf,
    state: OnceCell<KnowledgeState>,
}

impl KnowledgeBase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: OnceCell::new() }
    }

    /// Already-loaded knowledge, used by tests and tooling.
    pub fn from_text(text: impl Into<Arc<str>>) -> Self {
        Self {
            path: PathBuf::new(),
            state: OnceCell::new_with(Some(KnowledgeState::Loaded(text.into()))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> &KnowledgeState {
        self.state.get_or_init(|| read_knowledge(&self.path)).await
    }

    pub fn is_loaded(&self) -> Option<bool> {
        self.state.get().map(|state| matches!(state, KnowledgeState::Loaded(_)))
    }
}

async fn read_knowledge(path: &Path) -> KnowledgeState {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            info!(
                event_name = "agent.knowledge.loaded",
                path = %path.display(),
                chars = text.chars().count(),
                "knowledge base loaded"
            );
            KnowledgeState::Loaded(text.into())
        }
        Err(source) => {
            error!(
                event_name = "agent.knowledge.unavailable",
                path = %path.display(),
                error = %source,
                "knowledge base could not be read; replies will degrade"
            );
            KnowledgeState::Unavailable(source.to_string())
        }
    }
}
