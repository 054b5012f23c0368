use std::env;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hookrelay_cli::commands::{check, config, doctor, sign};
use serde_json::Value;

#[test]
fn check_returns_success_with_valid_env() {
    let mut knowledge = tempfile::NamedTempFile::new().expect("temp file");
    write!(knowledge, "Dr. Ayşe works Mondays").expect("write knowledge");
    let knowledge_path = knowledge.path().display().to_string();

    with_env(
        &[
            ("HOOKRELAY_WEBHOOK_SECRET", "whsec-test"),
            ("HOOKRELAY_REPLY_KNOWLEDGE_BASE_PATH", &knowledge_path),
        ],
        || {
            let result = check::run();
            assert_eq!(result.exit_code, 0, "expected successful preflight");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "check");
            assert_eq!(payload["status"], "ok");
            assert!(payload["message"]
                .as_str()
                .is_some_and(|message| message.contains("knowledge base present")));
            assert_eq!(payload["relay"]["signature_scheme"], "channel_hmac");
            assert_eq!(payload["relay"]["allowlist_enabled"], false);
            assert_eq!(payload["relay"]["knowledge_base_present"], true);
        },
    );
}

#[test]
fn check_returns_config_failure_without_secret() {
    with_env(&[], || {
        let result = check::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "check");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn check_rejects_auto_reply_without_upstream_credentials() {
    with_env(
        &[("HOOKRELAY_WEBHOOK_SECRET", "whsec-test"), ("HOOKRELAY_REPLY_MODE", "auto_reply")],
        || {
            let result = check::run();
            assert_eq!(result.exit_code, 2);

            let payload = parse_payload(&result.output);
            assert!(payload["message"]
                .as_str()
                .is_some_and(|message| message.contains("upstream.base_url")));
        },
    );
}

#[test]
fn sign_prints_verifiable_hmac() {
    with_env(&[("HOOKRELAY_WEBHOOK_SECRET", "whsec-test")], || {
        let result = sign::run("chan-1");
        assert_eq!(result.exit_code, 0);

        let decoded = BASE64.decode(result.output.trim()).expect("base64 signature");
        assert_eq!(decoded.len(), 32);
        assert_eq!(result.output, sign::run("chan-1").output);
        assert_ne!(result.output, sign::run("chan-2").output);
    });
}

#[test]
fn sign_rejects_blank_uuid() {
    with_env(&[("HOOKRELAY_WEBHOOK_SECRET", "whsec-test")], || {
        let result = sign::run("   ");
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_argument");
    });
}

#[test]
fn config_attributes_env_sources_and_redacts_secrets() {
    with_env(
        &[("HOOKRELAY_WEBHOOK_SECRET", "whsec-super-secret"), ("HOOKRELAY_LOG_LEVEL", "debug")],
        || {
            let output = config::run();

            assert!(output.contains(
                "- webhook.secret = <redacted> (source: env (HOOKRELAY_WEBHOOK_SECRET))"
            ));
            assert!(output.contains("- logging.level = debug (source: env (HOOKRELAY_LOG_LEVEL))"));
            assert!(output.contains("- webhook.allowed_ip = <disabled> (source: default)"));
            assert!(!output.contains("whsec-super-secret"));
        },
    );
}

#[test]
fn doctor_json_reports_skipped_checks_without_config() {
    with_env(&[], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HOOKRELAY_UPSTREAM_BASE_URL",
        "HOOKRELAY_UPSTREAM_USERNAME",
        "HOOKRELAY_UPSTREAM_PASSWORD",
        "HOOKRELAY_WEBHOOK_SECRET",
        "HOOKRELAY_WEBHOOK_ALLOWED_IP",
        "HOOKRELAY_WEBHOOK_SIGNATURE_SCHEME",
        "HOOKRELAY_LLM_PROVIDER",
        "HOOKRELAY_LLM_API_KEY",
        "HOOKRELAY_LLM_BASE_URL",
        "HOOKRELAY_LLM_MODEL",
        "HOOKRELAY_REPLY_MODE",
        "HOOKRELAY_REPLY_KNOWLEDGE_BASE_PATH",
        "HOOKRELAY_SERVER_PORT",
        "HOOKRELAY_LOGGING_LEVEL",
        "HOOKRELAY_LOGGING_FORMAT",
        "HOOKRELAY_LOG_LEVEL",
        "HOOKRELAY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
