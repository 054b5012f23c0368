use hookrelay_agent::HttpLlmClient;
use hookrelay_core::config::{AppConfig, LoadOptions};
use hookrelay_platform::client::http_client;

use crate::commands::{CommandResult, ErrorClass, RelayProfile};

/// Startup preflight: everything the server does before it binds its port.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "check",
                ErrorClass::ConfigValidation,
                format!("configuration issue: {error}"),
            );
        }
    };

    if let Err(error) = http_client(config.upstream.timeout_secs) {
        return CommandResult::failure(
            "check",
            ErrorClass::UpstreamClient,
            format!("failed to build upstream client: {error}"),
        );
    }

    if let Err(error) = HttpLlmClient::from_config(&config.llm) {
        return CommandResult::failure(
            "check",
            ErrorClass::LlmClient,
            format!("failed to build llm client: {error}"),
        );
    }

    let profile = RelayProfile::from_config(&config);
    let knowledge = if profile.knowledge_base_present {
        "knowledge base present"
    } else {
        "knowledge base missing; replies will degrade"
    };

    CommandResult::success("check", format!("preflight passed, {knowledge}"), profile)
}
