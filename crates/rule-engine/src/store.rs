//! 规则注册表
//!
//! 按命名空间保存已注册规则。每个命名空间是一个只追加的有序列表，
//! 注册顺序即"执行全部"时的迭代顺序。追加在 DashMap 分片锁内完成，
//! 并发读取者只会看到完整的列表快照。

use crate::compiler::{CompiledRule, RuleCompiler};
use crate::contracts::Violations;
use crate::error::{Result, RuleError};
use crate::models::Rule;
use dashmap::DashMap;
use rule_shared::config::DuplicateRulePolicy;
use rule_shared::observability::metrics;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 规则注册表
#[derive(Clone)]
pub struct RuleRegistry {
    /// 命名空间 -> 按注册顺序排列的规则
    namespaces: Arc<DashMap<String, Vec<Arc<CompiledRule>>>>,
    /// 规则编译器
    compiler: Arc<parking_lot::Mutex<RuleCompiler>>,
    duplicate_policy: DuplicateRulePolicy,
}

impl RuleRegistry {
    /// 创建新的规则注册表
    pub fn new() -> Self {
        Self::with_policy(DuplicateRulePolicy::default())
    }

    pub fn with_policy(duplicate_policy: DuplicateRulePolicy) -> Self {
        Self {
            namespaces: Arc::new(DashMap::new()),
            compiler: Arc::new(parking_lot::Mutex::new(RuleCompiler::new())),
            duplicate_policy,
        }
    }

    /// 注册类型化规则
    #[instrument(skip(self, rule), fields(rule_name = %rule.name))]
    pub fn register(&self, namespace: &str, rule: Rule) -> Result<()> {
        let compiled = self.compiler.lock().compile(rule);
        self.append(namespace, compiled)
    }

    /// 注册 JSON 文档形式的规则
    #[instrument(skip(self, document))]
    pub fn register_value(&self, namespace: &str, document: &Value) -> Result<()> {
        let compiled = self.compiler.lock().compile_value(document);
        self.append(namespace, compiled)
    }

    /// 注册 JSON 字符串形式的规则
    #[instrument(skip(self, json))]
    pub fn register_json(&self, namespace: &str, json: &str) -> Result<()> {
        let compiled = self.compiler.lock().compile_from_json(json);
        self.append(namespace, compiled)
    }

    fn append(&self, namespace: &str, compiled: Result<CompiledRule>) -> Result<()> {
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(namespace, error = %e, "规则注册失败");
                metrics::record_registration(namespace, "rejected");
                return Err(e);
            }
        };

        let mut rules = self.namespaces.entry(namespace.to_string()).or_default();

        if rules.iter().any(|r| r.name() == compiled.name()) {
            match self.duplicate_policy {
                DuplicateRulePolicy::Reject => {
                    warn!(namespace, rule_name = compiled.name(), "拒绝重名规则");
                    metrics::record_registration(namespace, "rejected");
                    return Err(RuleError::RuleInvalid(Violations::single(
                        "ruleName",
                        format!(
                            "namespace '{}' already has a rule named '{}'",
                            namespace,
                            compiled.name()
                        ),
                    )));
                }
                DuplicateRulePolicy::Allow => {
                    warn!(
                        namespace,
                        rule_name = compiled.name(),
                        "重名规则: 按名称查找命中第一条, 执行全部时后者覆盖前者"
                    );
                }
            }
        }

        info!(
            namespace,
            rule_name = compiled.name(),
            compile_version = compiled.compile_version,
            "规则已注册"
        );
        rules.push(Arc::new(compiled));
        metrics::record_registration(namespace, "accepted");
        Ok(())
    }

    /// 按名称查找规则，同名时返回最先注册的一条
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<Arc<CompiledRule>> {
        self.namespaces
            .get(namespace)
            .and_then(|rules| rules.iter().find(|r| r.name() == name).cloned())
    }

    /// 命名空间下全部规则的快照（注册顺序）
    pub fn rules(&self, namespace: &str) -> Vec<Arc<CompiledRule>> {
        self.namespaces
            .get(namespace)
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }

    /// 检查规则是否存在
    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.lookup(namespace, name).is_some()
    }

    /// 命名空间下的规则数量
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, |rules| rules.len())
    }

    /// 规则总数
    pub fn len(&self) -> usize {
        self.namespaces.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部命名空间（排序后）
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn duplicate_policy(&self) -> DuplicateRulePolicy {
        self.duplicate_policy
    }

    /// 获取注册表统计信息
    pub fn stats(&self) -> RegistryStats {
        let namespaces_count = self.namespaces.len();
        let mut rules_count = 0;
        let mut total_params = 0;
        for entry in self.namespaces.iter() {
            rules_count += entry.value().len();
            total_params += entry
                .value()
                .iter()
                .map(|r| r.required_params.len())
                .sum::<usize>();
        }

        RegistryStats {
            namespaces_count,
            rules_count,
            total_params,
            avg_params_per_rule: if rules_count > 0 {
                total_params as f64 / rules_count as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 注册表统计信息
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub namespaces_count: usize,
    /// 规则总数
    pub rules_count: usize,
    /// 所有规则引用的输入参数总数
    pub total_params: usize,
    /// 平均每条规则引用的参数数
    pub avg_params_per_rule: f64,
}
