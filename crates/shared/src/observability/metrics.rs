//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集。
//! 只安装 recorder 并保留渲染句柄，不启动 HTTP 监听。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装 Prometheus recorder
pub fn init(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // 保存到全局，供其他地方获取指标快照
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    Ok(handle)
}

/// 注册规则引擎指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "rule_engine_registrations_total",
        "Total number of rule registrations"
    );
    metrics::describe_counter!(
        "rule_engine_requests_total",
        "Total number of execution requests"
    );
    metrics::describe_counter!(
        "rule_engine_rule_outcomes_total",
        "Total number of per-rule outcomes"
    );
    metrics::describe_histogram!(
        "rule_engine_request_duration_seconds",
        "Execution request duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 记录规则注册，status 为 accepted / rejected
#[inline]
pub fn record_registration(namespace: &str, status: &str) {
    metrics::counter!(
        "rule_engine_registrations_total",
        "namespace" => namespace.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录执行请求，status 为 ok / invalid / failed
#[inline]
pub fn record_request(status: &str) {
    metrics::counter!("rule_engine_requests_total", "status" => status.to_string()).increment(1);
}

/// 记录单条规则的结果，outcome 为 matched / not_matched / unresolved
#[inline]
pub fn record_rule_outcome(namespace: &str, outcome: &str) {
    metrics::counter!(
        "rule_engine_rule_outcomes_total",
        "namespace" => namespace.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_request_duration(duration_secs: f64) {
    metrics::histogram!("rule_engine_request_duration_seconds").record(duration_secs);
}
