use serde::Serialize;
use sfquery_agent::build_client;
use sfquery_core::config::{AppConfig, LlmProvider, LoadOptions};

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_OK};

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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()).map_err(|e| e.to_string()));
    let exit_code = if report.overall_status == CheckStatus::Pass { EXIT_OK } else { EXIT_CONFIG };

    if json_output {
        return CommandResult::json("doctor", &report, exit_code);
    }
    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(loaded: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_credential(&config));
            checks.push(check_llm_client(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["llm_credential", "llm_client"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credential(config: &AppConfig) -> DoctorCheck {
    let (status, details) = match (config.llm.provider, config.llm.api_key.is_some()) {
        (LlmProvider::Gemini, true) => (CheckStatus::Pass, "gemini api key is configured"),
        (LlmProvider::Gemini, false) => (CheckStatus::Fail, "gemini requires SFQUERY_LLM_API_KEY"),
        (LlmProvider::Ollama, _) => (CheckStatus::Pass, "ollama does not need an api key"),
    };
    DoctorCheck { name: "llm_credential", status, details: details.to_string() }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match build_client(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Pass,
            details: format!(
                "model `{}` via {}",
                client.model(),
                config.llm.effective_base_url()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "llm_client", status: CheckStatus::Fail, details: error.to_string() }
        }
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

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use sfquery_core::config::{AppConfig, LlmProvider};

    use super::{build_report, render_human, CheckStatus};

    #[test]
    fn gemini_with_key_passes_every_check() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some(SecretString::from("test-key".to_string()));

        let report = build_report(Ok(config));
        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert_eq!(report.checks.len(), 3);
        assert!(render_human(&report).contains("- [ok] llm_client: model `gemini-1.5-flash`"));
    }

    #[test]
    fn config_failure_skips_dependent_checks() {
        let report = build_report(Err("llm.api_key is required".to_string()));
        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(report.checks[0].status, CheckStatus::Fail);
        assert!(report.checks[1..].iter().all(|check| check.status == CheckStatus::Skipped));
    }

    #[test]
    fn ollama_needs_no_credential() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Ollama;

        let report = build_report(Ok(config));
        assert_eq!(report.overall_status, CheckStatus::Pass);
    }
}
