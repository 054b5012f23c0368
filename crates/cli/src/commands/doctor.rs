use std::fs;

use hookrelay_core::config::{AppConfig, LoadOptions, ReplyMode, SignatureScheme};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] =
    ["knowledge_base_readability", "signature_readiness", "upstream_credentials"];

pub fn run(json_output: bool) -> String {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| error.to_string());
    let report = build_report(config);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_knowledge_base(&config));
            checks.push(check_signature(&config));
            checks.push(check_upstream_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_knowledge_base(config: &AppConfig) -> DoctorCheck {
    let path = &config.reply.knowledge_base_path;
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => DoctorCheck {
            name: "knowledge_base_readability",
            status: CheckStatus::Fail,
            details: format!("`{}` is empty", path.display()),
        },
        Ok(text) => DoctorCheck {
            name: "knowledge_base_readability",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` readable ({} chars, prompt keeps {})",
                path.display(),
                text.chars().count(),
                config.reply.max_knowledge_chars
            ),
        },
        Err(error) => DoctorCheck {
            name: "knowledge_base_readability",
            status: CheckStatus::Fail,
            details: format!("`{}` unreadable: {error}; replies will degrade", path.display()),
        },
    }
}

fn check_signature(config: &AppConfig) -> DoctorCheck {
    let scheme = match config.webhook.signature_scheme {
        SignatureScheme::SharedSecret => "shared_secret",
        SignatureScheme::ChannelHmac => "channel_hmac",
    };
    let allowlist = match &config.webhook.allowed_ip {
        Some(address) => format!("allowlist {address}"),
        None => "allowlist disabled".to_string(),
    };
    DoctorCheck {
        name: "signature_readiness",
        status: CheckStatus::Pass,
        details: format!("scheme {scheme}, {allowlist}"),
    }
}

fn check_upstream_credentials(config: &AppConfig) -> DoctorCheck {
    match config.reply.mode {
        ReplyMode::AutoReply => DoctorCheck {
            name: "upstream_credentials",
            status: CheckStatus::Pass,
            details: format!("auto replies post to {}", config.reply_url_template()),
        },
        ReplyMode::Assist => DoctorCheck {
            name: "upstream_credentials",
            status: CheckStatus::Skipped,
            details: "assist mode does not send replies".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hookrelay_core::config::AppConfig;

    use super::{build_report, render_human, CheckStatus};

    fn config_with_knowledge(path: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.webhook.secret = "whsec-test".to_string().into();
        config.reply.knowledge_base_path = path.to_path_buf();
        config
    }

    #[test]
    fn passes_with_readable_knowledge_base() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "Dr. Ayşe works Mondays").expect("write knowledge");

        let report = build_report(Ok(config_with_knowledge(file.path())));

        assert_eq!(report.overall_status, CheckStatus::Pass);
        let upstream = report
            .checks
            .iter()
            .find(|check| check.name == "upstream_credentials")
            .expect("upstream check present");
        assert_eq!(upstream.status, CheckStatus::Skipped);
    }

    #[test]
    fn fails_when_knowledge_base_is_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let report = build_report(Ok(config_with_knowledge(&dir.path().join("missing.txt"))));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert!(render_human(&report).contains("- [fail] knowledge_base_readability"));
    }

    #[test]
    fn config_failure_skips_dependent_checks() {
        let report = build_report(Err("webhook.secret is required".to_string()));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(report.checks.len(), 4);
        assert!(report.checks[1..].iter().all(|check| check.status == CheckStatus::Skipped));
    }
}
