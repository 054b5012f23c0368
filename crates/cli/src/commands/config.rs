use std::env;
use std::fs;
use std::path::Path;

use hookrelay_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        let source = field_source(
            key_path,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn field(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key_path, value, env_keys)
}

fn effective_values(config: &AppConfig) -> Vec<Field> {
    let upstream = &config.upstream;
    let webhook = &config.webhook;
    let llm = &config.llm;
    let reply = &config.reply;

    vec![
        field("upstream.base_url", or_unset(&upstream.base_url), &["HOOKRELAY_UPSTREAM_BASE_URL"]),
        field("upstream.username", or_unset(&upstream.username), &["HOOKRELAY_UPSTREAM_USERNAME"]),
        field(
            "upstream.password",
            redact_secret(upstream.password.expose_secret()),
            &["HOOKRELAY_UPSTREAM_PASSWORD"],
        ),
        field(
            "upstream.login_path",
            upstream.login_path.clone(),
            &["HOOKRELAY_UPSTREAM_LOGIN_PATH"],
        ),
        field(
            "upstream.reply_path",
            upstream.reply_path.clone(),
            &["HOOKRELAY_UPSTREAM_REPLY_PATH"],
        ),
        field(
            "upstream.timeout_secs",
            upstream.timeout_secs.to_string(),
            &["HOOKRELAY_UPSTREAM_TIMEOUT_SECS"],
        ),
        field(
            "webhook.secret",
            redact_secret(webhook.secret.expose_secret()),
            &["HOOKRELAY_WEBHOOK_SECRET"],
        ),
        field(
            "webhook.allowed_ip",
            webhook.allowed_ip.clone().unwrap_or_else(|| "<disabled>".to_string()),
            &["HOOKRELAY_WEBHOOK_ALLOWED_IP"],
        ),
        field(
            "webhook.signature_scheme",
            format!("{:?}", webhook.signature_scheme),
            &["HOOKRELAY_WEBHOOK_SIGNATURE_SCHEME"],
        ),
        field("llm.provider", format!("{:?}", llm.provider), &["HOOKRELAY_LLM_PROVIDER"]),
        field("llm.model", llm.model.clone(), &["HOOKRELAY_LLM_MODEL"]),
        field(
            "llm.base_url",
            llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
            &["HOOKRELAY_LLM_BASE_URL"],
        ),
        field(
            "llm.api_key",
            llm.api_key
                .as_ref()
                .map(|key| redact_secret(key.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
            &["HOOKRELAY_LLM_API_KEY"],
        ),
        field("llm.timeout_secs", llm.timeout_secs.to_string(), &["HOOKRELAY_LLM_TIMEOUT_SECS"]),
        field("reply.mode", format!("{:?}", reply.mode), &["HOOKRELAY_REPLY_MODE"]),
        field(
            "reply.knowledge_base_path",
            reply.knowledge_base_path.display().to_string(),
            &["HOOKRELAY_REPLY_KNOWLEDGE_BASE_PATH"],
        ),
        field("reply.language", reply.language.clone(), &["HOOKRELAY_REPLY_LANGUAGE"]),
        field(
            "reply.task_timeout_secs",
            reply.task_timeout_secs.to_string(),
            &["HOOKRELAY_REPLY_TASK_TIMEOUT_SECS"],
        ),
        field(
            "store.max_conversations",
            config.store.max_conversations.to_string(),
            &["HOOKRELAY_STORE_MAX_CONVERSATIONS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["HOOKRELAY_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["HOOKRELAY_SERVER_PORT"]),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["HOOKRELAY_LOGGING_LEVEL", "HOOKRELAY_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["HOOKRELAY_LOGGING_FORMAT", "HOOKRELAY_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
