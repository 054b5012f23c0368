pub mod check;
pub mod config;
pub mod doctor;
pub mod sign;

use hookrelay_core::config::{AppConfig, LlmProvider, ReplyMode, SignatureScheme};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Why a command refused to proceed. Each class owns its exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    ConfigValidation,
    InvalidArgument,
    UpstreamClient,
    LlmClient,
}

impl ErrorClass {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation | Self::InvalidArgument => 2,
            Self::UpstreamClient | Self::LlmClient => 3,
        }
    }
}

/// How the relay would run with the loaded configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayProfile {
    pub signature_scheme: SignatureScheme,
    pub allowlist_enabled: bool,
    pub reply_mode: ReplyMode,
    pub llm_provider: LlmProvider,
    pub knowledge_base_present: bool,
}

impl RelayProfile {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            signature_scheme: config.webhook.signature_scheme,
            allowlist_enabled: config.webhook.allowed_ip.is_some(),
            reply_mode: config.reply.mode,
            llm_provider: config.llm.provider,
            knowledge_base_present: config.reply.knowledge_base_path.is_file(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<ErrorClass>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    relay: Option<RelayProfile>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, relay: RelayProfile) -> Self {
        Self::render(
            0,
            CommandOutcome {
                command,
                status: "ok",
                error_class: None,
                message: message.into(),
                relay: Some(relay),
            },
        )
    }

    pub fn failure(command: &str, error_class: ErrorClass, message: impl Into<String>) -> Self {
        Self::render(
            error_class.exit_code(),
            CommandOutcome {
                command,
                status: "error",
                error_class: Some(error_class),
                message: message.into(),
                relay: None,
            },
        )
    }

    fn render(exit_code: u8, outcome: CommandOutcome<'_>) -> Self {
        let output = serde_json::to_string(&outcome).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                outcome.command,
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        Self { exit_code, output }
    }
}
