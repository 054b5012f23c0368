use hookrelay_core::config::{AppConfig, LoadOptions};
use hookrelay_platform::auth::sign_channel_uuid;
use secrecy::ExposeSecret;

use crate::commands::{CommandResult, ErrorClass};

/// Prints the `X-Webhook-Sign` value the `channel_hmac` scheme accepts for `channel_uuid`.
pub fn run(channel_uuid: &str) -> CommandResult {
    if channel_uuid.trim().is_empty() {
        return CommandResult::failure(
            "sign",
            ErrorClass::InvalidArgument,
            "--uuid must not be empty",
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "sign",
                ErrorClass::ConfigValidation,
                format!("configuration issue: {error}"),
            );
        }
    };

    CommandResult {
        exit_code: 0,
        output: sign_channel_uuid(config.webhook.secret.expose_secret(), channel_uuid),
    }
}
