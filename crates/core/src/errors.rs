use thiserror::Error;

/// Failures raised after a webhook has been acknowledged; logged, never surfaced to the sender.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("upstream credential failure: {0}")]
    UpstreamCredential(String),
    #[error("upstream delivery failure: {0}")]
    Delivery(String),
    #[error("generative provider failure: {0}")]
    Generative(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UpstreamCredential(_) => "upstream_credential",
            Self::Delivery(_) => "upstream_delivery",
            Self::Generative(_) => "generative_provider",
            Self::Configuration(_) => "configuration",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden { .. } => 403,
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Forbidden { .. } => "The request could not be authenticated.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Forbidden { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}
