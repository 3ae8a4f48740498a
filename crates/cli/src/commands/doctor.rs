use std::collections::BTreeMap;

use serde::Serialize;
use tanya_core::catalog::EndpointCatalog;
use tanya_core::config::{AppConfig, LoadOptions};
use tanya_erp::{Credentials, ErpGateway, HttpErpGateway};

/// Resource read by the connectivity check; readable by every tenant.
const CONNECTIVITY_RESOURCE: &str = "contacts";

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

pub fn run(json_output: bool) -> String {
    let report = build_report();

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

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_vision(&config));
            checks.push(check_erp_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["vision_model", "erp_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_vision(config: &AppConfig) -> DoctorCheck {
    if config.vision.is_configured() {
        DoctorCheck {
            name: "vision_model",
            status: CheckStatus::Pass,
            details: format!("image messages use `{}`", config.vision.model),
        }
    } else {
        DoctorCheck {
            name: "vision_model",
            status: CheckStatus::Skipped,
            details: "vision.api_url/api_key unset; image messages will be rejected".to_string(),
        }
    }
}

fn check_erp_connectivity(config: &AppConfig) -> DoctorCheck {
    if !config.erp.has_default_credentials() {
        return DoctorCheck {
            name: "erp_connectivity",
            status: CheckStatus::Skipped,
            details: "no default bearer token and tenant; requests must carry credentials"
                .to_string(),
        };
    }

    let gateway = match HttpErpGateway::from_config(&config.erp) {
        Ok(gateway) => gateway,
        Err(error) => {
            return DoctorCheck {
                name: "erp_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to build backend client: {error}"),
            };
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "erp_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let params = connectivity_params();
    let credentials = Credentials::from_config(&config.erp);
    let result =
        runtime.block_on(async { gateway.fetch(CONNECTIVITY_RESOURCE, &params, &credentials).await });

    if result.is_ok() {
        DoctorCheck {
            name: "erp_connectivity",
            status: CheckStatus::Pass,
            details: format!("read `{CONNECTIVITY_RESOURCE}` from `{}`", config.erp.base_url),
        }
    } else {
        DoctorCheck {
            name: "erp_connectivity",
            status: CheckStatus::Fail,
            details: format!("backend connectivity check failed: {}", result.message),
        }
    }
}

/// Catalog defaults with pagination forced back on, so the check reads a single
/// record instead of the whole resource.
fn connectivity_params() -> BTreeMap<String, String> {
    let mut params = EndpointCatalog::default()
        .get(CONNECTIVITY_RESOURCE)
        .map(|endpoint| endpoint.default_params())
        .unwrap_or_default();
    params.insert("is_skip_pagination".to_string(), "false".to_string());
    params.insert("page".to_string(), "1".to_string());
    params.insert("per_page".to_string(), "1".to_string());
    params
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

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
    use super::connectivity_params;

    #[test]
    fn connectivity_check_reads_a_single_page_of_one() {
        let params = connectivity_params();

        assert_eq!(params.get("is_skip_pagination").map(String::as_str), Some("false"));
        assert_eq!(params.get("page").map(String::as_str), Some("1"));
        assert_eq!(params.get("per_page").map(String::as_str), Some("1"));
    }
}
