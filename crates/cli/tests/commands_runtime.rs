use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tanya_cli::commands::{ask, config, doctor};

#[test]
fn config_fails_without_language_model_key() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed"));
        assert!(output.contains("llm.api_key"));
    });
}

#[test]
fn config_redacts_secrets_and_attributes_sources() {
    with_env(
        &[
            ("TANYA_LLM_API_KEY", "sk-live-secret"),
            ("TANYA_ERP_BEARER_TOKEN", "eyJhbGciOiJIUzI1NiJ9.secret"),
            ("TANYA_ERP_TENANT", "toko-maju"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("sk-live-secret"));
            assert!(!output.contains("eyJhbGciOiJIUzI1NiJ9.secret"));
            assert!(output.contains("- llm.api_key = sk-*** (source: env (TANYA_LLM_API_KEY))"));
            assert!(output.contains(
                "- erp.bearer_token = <redacted> (source: env (TANYA_ERP_BEARER_TOKEN))"
            ));
            assert!(output.contains("- erp.tenant = toko-maju (source: env (TANYA_ERP_TENANT))"));
            assert!(output.contains(
                "- erp.base_url = https://go.zahironline.com/api/v2 (source: default)"
            ));
            assert!(output.contains("- vision.api_key = <unset> (source: default)"));
        },
    );
}

#[test]
fn config_lists_vision_limits() {
    with_env(
        &[("TANYA_LLM_API_KEY", "sk-test"), ("TANYA_VISION_TIMEOUT_SECS", "90")],
        || {
            let output = config::run();

            assert!(output.contains("- vision.max_tokens = 3500 (source: default)"));
            assert!(output.contains(
                "- vision.timeout_secs = 90 (source: env (TANYA_VISION_TIMEOUT_SECS))"
            ));
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks[1..].iter().all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn doctor_passes_without_default_backend_credentials() {
    with_env(&[("TANYA_LLM_API_KEY", "sk-test")], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "pass");
        let erp = find_check(&payload, "erp_connectivity");
        assert_eq!(erp["status"], "skipped");
        assert_eq!(find_check(&payload, "vision_model")["status"], "skipped");
    });
}

#[test]
fn doctor_reports_unreachable_backend() {
    with_env(
        &[
            ("TANYA_LLM_API_KEY", "sk-test"),
            ("TANYA_ERP_BASE_URL", "http://127.0.0.1:9/api/v2"),
            ("TANYA_ERP_BEARER_TOKEN", "token"),
            ("TANYA_ERP_TENANT", "toko-maju"),
            ("TANYA_ERP_MAX_RETRIES", "0"),
            ("TANYA_ERP_TIMEOUT_SECS", "2"),
        ],
        || {
            let payload = parse_payload(&doctor::run(true));

            assert_eq!(payload["overall_status"], "fail");
            let erp = find_check(&payload, "erp_connectivity");
            assert_eq!(erp["status"], "fail");
            assert!(erp["details"].as_str().unwrap_or("").starts_with("backend connectivity check failed"));
        },
    );
}

#[test]
fn doctor_human_output_lists_checks() {
    with_env(&[("TANYA_LLM_API_KEY", "sk-test")], || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: all readiness checks passed"));
        assert!(output.contains("- [ok] config_validation"));
        assert!(output.contains("- [skip] erp_connectivity"));
    });
}

#[test]
fn ask_returns_config_failure_without_key() {
    with_env(&[], || {
        let result = ask::run(ask::AskArgs {
            message: "tampilkan data customer".to_string(),
            ..ask::AskArgs::default()
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn ask_rejects_empty_message_before_any_call() {
    with_env(
        &[
            ("TANYA_LLM_API_KEY", "sk-test"),
            ("TANYA_LLM_API_URL", "http://127.0.0.1:9/v1/chat/completions"),
            ("TANYA_ERP_BASE_URL", "http://127.0.0.1:9/api/v2"),
        ],
        || {
            let result = ask::run(ask::AskArgs {
                message: "   ".to_string(),
                ..ask::AskArgs::default()
            });
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "intake");
            assert_eq!(payload["message"], "Pesan tidak boleh kosong.");
        },
    );
}

#[test]
fn ask_rejects_unsupported_image_file() {
    with_env(&[("TANYA_LLM_API_KEY", "sk-test")], || {
        let result = ask::run(ask::AskArgs {
            message: "ini apa?".to_string(),
            image: Some("nota.pdf".into()),
            ..ask::AskArgs::default()
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn find_check<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .unwrap_or_else(|| panic!("check `{name}` missing from report"))
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|error| {
        panic!("expected json output, got parse error: {error}; output={output}")
    })
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TANYA_ERP_BASE_URL",
        "TANYA_ERP_BEARER_TOKEN",
        "TANYA_ERP_TENANT",
        "TANYA_ERP_TIMEOUT_SECS",
        "TANYA_ERP_MAX_RETRIES",
        "TANYA_LLM_API_URL",
        "TANYA_LLM_API_KEY",
        "TANYA_LLM_MODEL",
        "TANYA_LLM_MAX_TOKENS",
        "TANYA_LLM_TIMEOUT_SECS",
        "TANYA_LLM_MAX_RETRIES",
        "TANYA_VISION_API_URL",
        "TANYA_VISION_API_KEY",
        "TANYA_VISION_MODEL",
        "TANYA_VISION_MAX_TOKENS",
        "TANYA_VISION_TIMEOUT_SECS",
        "TANYA_SERVER_BIND_ADDRESS",
        "TANYA_SERVER_PORT",
        "TANYA_SERVER_WEBHOOK_URL",
        "TANYA_SERVER_INDEX_PATH",
        "TANYA_LOGGING_LEVEL",
        "TANYA_LOGGING_FORMAT",
        "TANYA_LOG_LEVEL",
        "TANYA_LOG_FORMAT",
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
