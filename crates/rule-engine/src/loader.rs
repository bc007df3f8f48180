//! 规则文件加载器
//!
//! 文件格式为以命名空间为键、规则数组为值的 JSON 对象：
//!
//! ```json
//! { "orders": [ { "ruleName": "...", "returnVal": ..., "formula": { ... } } ] }
//! ```
//!
//! 每条规则独立注册，单条失败只记录下来，不中断整批加载。

use crate::engine::RuleEngine;
use crate::error::{Result, RuleError};
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 单条规则的加载失败
#[derive(Debug)]
pub struct LoadFailure {
    pub namespace: String,
    /// 规则在数组中的下标
    pub index: usize,
    pub rule_name: Option<String>,
    pub error: RuleError,
}

/// 加载结果汇总
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 规则加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 从文件加载规则
    #[instrument(skip(engine, path), fields(path = %path.as_ref().display()))]
    pub async fn load_file(engine: &RuleEngine, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::load_str(engine, &content)
    }

    /// 从 JSON 字符串加载规则
    pub fn load_str(engine: &RuleEngine, content: &str) -> Result<LoadSummary> {
        let document: Value = serde_json::from_str(content)?;
        Self::load_value(engine, &document)
    }

    pub fn load_value(engine: &RuleEngine, document: &Value) -> Result<LoadSummary> {
        let namespaces = document.as_object().ok_or_else(|| {
            RuleError::InvalidRuleFile("top level must be an object keyed by namespace".to_string())
        })?;

        // 先检查整体结构，避免注册到一半才发现格式错误
        for (namespace, rules) in namespaces {
            if !rules.is_array() {
                return Err(RuleError::InvalidRuleFile(format!(
                    "namespace '{}' must map to an array of rules",
                    namespace
                )));
            }
        }

        let mut summary = LoadSummary::default();
        for (namespace, rules) in namespaces {
            let rules = rules.as_array().map(Vec::as_slice).unwrap_or_default();
            for (index, rule) in rules.iter().enumerate() {
                match engine.register_value(namespace, rule) {
                    Ok(()) => summary.loaded += 1,
                    Err(error) => {
                        let rule_name = rule
                            .get("ruleName")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        warn!(
                            namespace = %namespace,
                            index,
                            rule_name = ?rule_name,
                            error = %error,
                            "Failed to load rule"
                        );
                        summary.failures.push(LoadFailure {
                            namespace: namespace.clone(),
                            index,
                            rule_name,
                            error,
                        });
                    }
                }
            }
        }

        info!(
            loaded = summary.loaded,
            failed = summary.failures.len(),
            "规则文件加载完成"
        );
        Ok(summary)
    }
}
