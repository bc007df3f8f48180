//! 可观测性模块集成测试
//!
//! 测试 metrics 与 tracing 初始化及指标记录。

use rule_shared::observability::{self, ObservabilityConfig, ObservabilityGuard};

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use rule_shared::observability::metrics::{
        record_registration, record_request, record_request_duration, record_rule_outcome,
    };

    #[test]
    fn test_record_without_recorder() {
        // 未安装 recorder 时记录是空操作
        record_registration("orders", "accepted");
        record_registration("orders", "rejected");
        record_request("ok");
        record_request("invalid");
        record_rule_outcome("orders", "matched");
        record_rule_outcome("orders", "unresolved");
        record_request_duration(0.002);
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_registration("", "accepted");
        record_rule_outcome("命名空间", "not_matched");
        record_request_duration(0.0);
        record_request_duration(f64::MAX);
    }
}

// ============================================================================
// 初始化测试
// ============================================================================

#[test]
fn test_init_installs_recorder_and_renders() {
    let config = ObservabilityConfig {
        log_level: "warn".to_string(),
        ..Default::default()
    }
    .with_service_name("rule-engine-test");

    let guard = observability::init(&config).unwrap();

    rule_shared::observability::metrics::record_request("ok");
    rule_shared::observability::metrics::record_rule_outcome("orders", "matched");

    let rendered = guard.render_metrics().unwrap();
    assert!(rendered.contains("rule_engine_requests_total"));
    assert!(rendered.contains("rule_engine_rule_outcomes_total"));
    assert!(rendered.contains("service_starts_total"));
    assert!(rule_shared::observability::metrics::get_handle().is_some());

    // 全局 subscriber 只能安装一次
    assert!(observability::init(&config).is_err());
}

#[test]
fn test_empty_guard() {
    let guard = ObservabilityGuard::empty();
    assert!(guard.render_metrics().is_none());
    drop(guard);
}

#[test]
fn test_default_config() {
    let config = ObservabilityConfig::default();
    assert_eq!(config.service_name, "unknown-service");
    assert_eq!(config.log_level, "info");
    assert!(!config.json_logs);
    assert!(config.metrics_enabled);
}
