//! Integration tests for domain types
//!
//! Covers serialized forms that external consumers (health endpoints, log
//! processors, config files) rely on.

use std::time::Duration;

use recur_domain::{
    Config, EvaluationReason, EvaluationResult, ExecutionResult, PatternConfig, RetryStrategy,
};

/// Test that an execution result serializes with its reason as plain text
///
/// Scenario: a health endpoint renders the last run as JSON
#[test]
fn test_execution_result_json_shape() {
    let result = ExecutionResult::new(
        "ready\n".to_string(),
        String::new(),
        Duration::from_millis(250),
        EvaluationResult {
            success: true,
            exit_code: 0,
            reason: EvaluationReason::SuccessPatternMatched,
        },
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["reason"], "success pattern matched");
    assert_eq!(json["output"], "ready\n");
    assert_eq!(json["success"], true);

    let back: ExecutionResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

/// Test a complete configuration document
///
/// Scenario: operator writes every section by hand
#[test]
fn test_full_config_document() {
    let json = r#"{
        "executor": {
            "timeout_ms": 5000,
            "streaming": true,
            "output_prefix": "[probe] ",
            "patterns": {
                "success_pattern": "OK",
                "failure_pattern": "FATAL",
                "case_insensitive": true
            }
        },
        "retry": { "strategy": "fixed", "max_retries": 2, "initial_delay_ms": 250 },
        "circuit_breaker": { "enabled": true, "failure_threshold": 4, "timeout_ms": 10000 },
        "reporter": {
            "format": "json",
            "trends": false,
            "alerts": [ { "category": "timeout", "count": 3, "window_secs": 60 } ]
        },
        "logging": { "level": "debug", "json": true }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();
    config.validate().unwrap();

    assert_eq!(config.executor.timeout_ms, 5000);
    assert_eq!(config.executor.output_prefix.as_deref(), Some("[probe] "));
    let patterns = config.executor.patterns.as_ref().unwrap();
    assert_eq!(
        patterns,
        &PatternConfig::success("OK").with_failure("FATAL").case_insensitive(true)
    );
    assert_eq!(config.retry.strategy, RetryStrategy::Fixed);
    assert_eq!(config.circuit_breaker.failure_threshold, 4);
    assert_eq!(config.reporter.alerts.len(), 1);
    assert!(!config.reporter.trends);
    assert!(config.logging.json);
}

/// Test that an empty document yields the defaults
#[test]
fn test_empty_document_is_default() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config, Config::default());
}
