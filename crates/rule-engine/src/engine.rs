//! 规则引擎门面
//!
//! 每个实例拥有独立的注册表与执行器，实例之间不共享任何状态。

use crate::error::Result;
use crate::executor::RuleExecutor;
use crate::models::{ExecutionResult, Request, Rule};
use crate::operators::VALID_OPERATIONS;
use crate::store::RuleRegistry;
use rule_shared::config::EngineConfig;
use serde_json::Value;

/// 规则引擎
#[derive(Clone)]
pub struct RuleEngine {
    registry: RuleRegistry,
    executor: RuleExecutor,
}

impl RuleEngine {
    /// 使用默认配置创建引擎
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let registry = RuleRegistry::with_policy(config.duplicate_rule_names);
        let mut executor = RuleExecutor::new(registry.clone());
        if config.trace_evaluations {
            executor = executor.with_trace();
        }
        Self { registry, executor }
    }

    /// 注册类型化规则，失败时注册表保持不变
    pub fn register_rule(&self, namespace: &str, rule: Rule) -> Result<()> {
        self.registry.register(namespace, rule)
    }

    /// 注册 JSON 文档形式的规则
    pub fn register_value(&self, namespace: &str, document: &Value) -> Result<()> {
        self.registry.register_value(namespace, document)
    }

    pub fn register_json(&self, namespace: &str, json: &str) -> Result<()> {
        self.registry.register_json(namespace, json)
    }

    /// 执行请求文档，语义见 [`RuleExecutor::execute`]
    pub async fn execute(&self, document: &Value) -> Result<ExecutionResult> {
        self.executor.execute(document).await
    }

    pub async fn execute_request(&self, request: Request) -> Result<ExecutionResult> {
        self.executor.execute_request(request).await
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// 支持的运算符
    pub fn valid_operations(&self) -> &'static [&'static str] {
        &VALID_OPERATIONS
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
