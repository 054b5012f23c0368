use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub webhook: WebhookConfig,
    pub llm: LlmConfig,
    pub reply: ReplyConfig,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Conversation platform the relay receives webhooks from and replies through.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
    pub login_path: String,
    /// Path template for outbound replies; `{id}` is replaced by the conversation id.
    pub reply_path: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: SecretString,
    pub allowed_ip: Option<String>,
    pub signature_scheme: SignatureScheme,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ReplyConfig {
    pub mode: ReplyMode,
    pub knowledge_base_path: PathBuf,
    pub language: String,
    pub max_knowledge_chars: usize,
    pub task_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub max_conversations: usize,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub channel_capacity: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// `X-Webhook-Sign` carries the raw shared secret.
    SharedSecret,
    /// `X-Webhook-Sign` carries base64(HMAC-SHA256(secret, payload.channel.uuid)).
    ChannelHmac,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    Assist,
    AutoReply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub upstream_base_url: Option<String>,
    pub upstream_username: Option<String>,
    pub upstream_password: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_allowed_ip: Option<String>,
    pub signature_scheme: Option<SignatureScheme>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub reply_mode: Option<ReplyMode>,
    pub knowledge_base_path: Option<PathBuf>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpstreamUrlError {
    #[error("upstream.base_url `{0}` cannot carry a reply path")]
    InvalidBase(String),
    #[error("conversation id `{0}` is not a usable path segment")]
    InvalidConversationId(String),
}

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["hookrelay.toml", "config/hookrelay.toml"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: String::new(),
                username: String::new(),
                password: String::new().into(),
                login_path: "/auth/login".to_string(),
                reply_path: "/conversations/{id}/messages".to_string(),
                timeout_secs: 15,
            },
            webhook: WebhookConfig {
                secret: String::new().into(),
                allowed_ip: None,
                signature_scheme: SignatureScheme::ChannelHmac,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            reply: ReplyConfig {
                mode: ReplyMode::Assist,
                knowledge_base_path: PathBuf::from("knowledge_base.txt"),
                language: "Turkish".to_string(),
                max_knowledge_chars: 24_000,
                task_timeout_secs: 60,
            },
            store: StoreConfig { max_conversations: 1_000 },
            notify: NotifyConfig { channel_capacity: 64 },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for SignatureScheme {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "shared_secret" => Ok(Self::SharedSecret),
            "channel_hmac" => Ok(Self::ChannelHmac),
            other => Err(ConfigError::Validation(format!(
                "unsupported signature scheme `{other}` (expected shared_secret|channel_hmac)"
            ))),
        }
    }
}

impl std::str::FromStr for ReplyMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "assist" => Ok(Self::Assist),
            "auto_reply" | "auto" => Ok(Self::AutoReply),
            other => Err(ConfigError::Validation(format!(
                "unsupported reply mode `{other}` (expected assist|auto_reply)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Resolves the outbound reply URL for a conversation.
    ///
    /// Each template segment is appended as one percent-encoded path segment,
    /// so a conversation id can never add segments, a query or a fragment.
    pub fn reply_url(&self, conversation_id: &str) -> Result<Url, UpstreamUrlError> {
        let mut url = Url::parse(&self.upstream.base_url)
            .map_err(|_| UpstreamUrlError::InvalidBase(self.upstream.base_url.clone()))?;
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| UpstreamUrlError::InvalidBase(self.upstream.base_url.clone()))?;
        segments.pop_if_empty();

        for template in self.upstream.reply_path.split('/').filter(|part| !part.is_empty()) {
            let segment = template.replace("{id}", conversation_id);
            if segment.trim().is_empty() || segment == "." || segment == ".." {
                return Err(UpstreamUrlError::InvalidConversationId(conversation_id.to_string()));
            }
            segments.push(&segment);
        }
        drop(segments);

        Ok(url)
    }

    /// Reply path template joined to the base url, for display.
    pub fn reply_url_template(&self) -> String {
        format!("{}{}", self.upstream.base_url.trim_end_matches('/'), self.upstream.reply_path)
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.upstream.base_url.trim_end_matches('/'), self.upstream.login_path)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(upstream) = patch.upstream {
            if let Some(base_url) = upstream.base_url {
                self.upstream.base_url = base_url;
            }
            if let Some(username) = upstream.username {
                self.upstream.username = username;
            }
            if let Some(password) = upstream.password {
                self.upstream.password = secret_value(password);
            }
            if let Some(login_path) = upstream.login_path {
                self.upstream.login_path = login_path;
            }
            if let Some(reply_path) = upstream.reply_path {
                self.upstream.reply_path = reply_path;
            }
            if let Some(timeout_secs) = upstream.timeout_secs {
                self.upstream.timeout_secs = timeout_secs;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(secret) = webhook.secret {
                self.webhook.secret = secret_value(secret);
            }
            if let Some(allowed_ip) = webhook.allowed_ip {
                self.webhook.allowed_ip = non_blank(allowed_ip);
            }
            if let Some(signature_scheme) = webhook.signature_scheme {
                self.webhook.signature_scheme = signature_scheme;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(reply) = patch.reply {
            if let Some(mode) = reply.mode {
                self.reply.mode = mode;
            }
            if let Some(knowledge_base_path) = reply.knowledge_base_path {
                self.reply.knowledge_base_path = knowledge_base_path;
            }
            if let Some(language) = reply.language {
                self.reply.language = language;
            }
            if let Some(max_knowledge_chars) = reply.max_knowledge_chars {
                self.reply.max_knowledge_chars = max_knowledge_chars;
            }
            if let Some(task_timeout_secs) = reply.task_timeout_secs {
                self.reply.task_timeout_secs = task_timeout_secs;
            }
        }

        if let Some(store) = patch.store {
            if let Some(max_conversations) = store.max_conversations {
                self.store.max_conversations = max_conversations;
            }
        }

        if let Some(notify) = patch.notify {
            if let Some(channel_capacity) = notify.channel_capacity {
                self.notify.channel_capacity = channel_capacity;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_BASE_URL") {
            self.upstream.base_url = value;
        }
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_USERNAME") {
            self.upstream.username = value;
        }
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_PASSWORD") {
            self.upstream.password = secret_value(value);
        }
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_LOGIN_PATH") {
            self.upstream.login_path = value;
        }
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_REPLY_PATH") {
            self.upstream.reply_path = value;
        }
        if let Some(value) = read_env("HOOKRELAY_UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse_u64("HOOKRELAY_UPSTREAM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HOOKRELAY_WEBHOOK_SECRET") {
            self.webhook.secret = secret_value(value);
        }
        if let Some(value) = read_env("HOOKRELAY_WEBHOOK_ALLOWED_IP") {
            self.webhook.allowed_ip = Some(value);
        }
        if let Some(value) = read_env("HOOKRELAY_WEBHOOK_SIGNATURE_SCHEME") {
            self.webhook.signature_scheme = value.parse()?;
        }

        if let Some(value) = read_env("HOOKRELAY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("HOOKRELAY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("HOOKRELAY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("HOOKRELAY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("HOOKRELAY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("HOOKRELAY_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HOOKRELAY_REPLY_MODE") {
            self.reply.mode = value.parse()?;
        }
        if let Some(value) = read_env("HOOKRELAY_REPLY_KNOWLEDGE_BASE_PATH") {
            self.reply.knowledge_base_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("HOOKRELAY_REPLY_LANGUAGE") {
            self.reply.language = value;
        }
        if let Some(value) = read_env("HOOKRELAY_REPLY_TASK_TIMEOUT_SECS") {
            self.reply.task_timeout_secs = parse_u64("HOOKRELAY_REPLY_TASK_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HOOKRELAY_STORE_MAX_CONVERSATIONS") {
            self.store.max_conversations =
                parse_usize("HOOKRELAY_STORE_MAX_CONVERSATIONS", &value)?;
        }

        if let Some(value) = read_env("HOOKRELAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HOOKRELAY_SERVER_PORT") {
            self.server.port = parse_u16("HOOKRELAY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("HOOKRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("HOOKRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("HOOKRELAY_LOGGING_LEVEL").or_else(|| read_env("HOOKRELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HOOKRELAY_LOGGING_FORMAT").or_else(|| read_env("HOOKRELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.upstream_base_url {
            self.upstream.base_url = base_url;
        }
        if let Some(username) = overrides.upstream_username {
            self.upstream.username = username;
        }
        if let Some(password) = overrides.upstream_password {
            self.upstream.password = secret_value(password);
        }
        if let Some(secret) = overrides.webhook_secret {
            self.webhook.secret = secret_value(secret);
        }
        if let Some(allowed_ip) = overrides.webhook_allowed_ip {
            self.webhook.allowed_ip = non_blank(allowed_ip);
        }
        if let Some(signature_scheme) = overrides.signature_scheme {
            self.webhook.signature_scheme = signature_scheme;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(reply_mode) = overrides.reply_mode {
            self.reply.mode = reply_mode;
        }
        if let Some(knowledge_base_path) = overrides.knowledge_base_path {
            self.reply.knowledge_base_path = knowledge_base_path;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_upstream(&self.upstream, self.reply.mode)?;
        validate_webhook(&self.webhook)?;
        validate_llm(&self.llm)?;
        validate_reply(&self.reply)?;
        validate_store(&self.store, &self.notify)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_upstream(upstream: &UpstreamConfig, mode: ReplyMode) -> Result<(), ConfigError> {
    let base_url = upstream.base_url.trim();
    if !base_url.is_empty() && !is_http_url(base_url) {
        return Err(ConfigError::Validation(
            "upstream.base_url must start with http:// or https://".to_string(),
        ));
    }

    if upstream.timeout_secs == 0 || upstream.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "upstream.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !upstream.reply_path.contains("{id}") {
        return Err(ConfigError::Validation(
            "upstream.reply_path must contain the `{id}` placeholder".to_string(),
        ));
    }

    if mode == ReplyMode::AutoReply {
        if base_url.is_empty() {
            return Err(ConfigError::Validation(
                "upstream.base_url is required when reply.mode is auto_reply".to_string(),
            ));
        }
        if upstream.username.trim().is_empty()
            || upstream.password.expose_secret().trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "upstream.username and upstream.password are required when reply.mode is auto_reply"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if webhook.secret.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "webhook.secret is required. Copy it from the conversation platform's webhook settings"
                .to_string(),
        ));
    }

    if let Some(allowed_ip) = &webhook.allowed_ip {
        if allowed_ip.trim() != allowed_ip || allowed_ip.contains(',') {
            return Err(ConfigError::Validation(
                "webhook.allowed_ip must be a single address without whitespace".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if matches!(llm.provider, LlmProvider::OpenAi | LlmProvider::Anthropic) {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for openai/anthropic providers".to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url.trim()) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_reply(reply: &ReplyConfig) -> Result<(), ConfigError> {
    if reply.language.trim().is_empty() {
        return Err(ConfigError::Validation("reply.language must not be empty".to_string()));
    }

    if reply.max_knowledge_chars == 0 {
        return Err(ConfigError::Validation(
            "reply.max_knowledge_chars must be greater than zero".to_string(),
        ));
    }

    if reply.task_timeout_secs == 0 || reply.task_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "reply.task_timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig, notify: &NotifyConfig) -> Result<(), ConfigError> {
    if store.max_conversations == 0 {
        return Err(ConfigError::Validation(
            "store.max_conversations must be greater than zero".to_string(),
        ));
    }

    if notify.channel_capacity == 0 {
        return Err(ConfigError::Validation(
            "notify.channel_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    upstream: Option<UpstreamPatch>,
    webhook: Option<WebhookPatch>,
    llm: Option<LlmPatch>,
    reply: Option<ReplyPatch>,
    store: Option<StorePatch>,
    notify: Option<NotifyPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct UpstreamPatch {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    login_path: Option<String>,
    reply_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    secret: Option<String>,
    allowed_ip: Option<String>,
    signature_scheme: Option<SignatureScheme>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyPatch {
    mode: Option<ReplyMode>,
    knowledge_base_path: Option<PathBuf>,
    language: Option<String>,
    max_knowledge_chars: Option<usize>,
    task_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    max_conversations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyPatch {
    channel_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
