//! 规则执行器
//!
//! 解析一次执行请求要运行哪些规则，逐条求值并组装结果。

use crate::compiler::CompiledRule;
use crate::contracts::{self, Contract};
use crate::error::{Result, RuleError};
use crate::evaluator::{CriteriaEvaluator, is_truthy};
use crate::models::{ExecutionResult, Inputs, Outcome, Request};
use crate::store::RuleRegistry;
use rule_shared::observability::metrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

/// 规则执行器
#[derive(Clone)]
pub struct RuleExecutor {
    registry: RuleRegistry,
    /// 是否在 debug 级别输出每条规则的评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 执行请求文档
    ///
    /// 调用总是异步完成：请求先被快照，随后让出一次执行权，之后才做
    /// 校验和求值，所以调用方在 `execute` 返回后修改原文档不会影响结果。
    ///
    /// 按名称执行时，注册表中不存在的规则**不会**报错，只在结果中留下
    /// 一个未解析条目（序列化时省略）。拼错的规则名因此会静默地得不到结果，
    /// 需要调用方用 [`Outcome::is_unresolved`] 自行检查。
    pub async fn execute(&self, document: &Value) -> Result<ExecutionResult> {
        let snapshot = document.clone();
        let execution_id = Uuid::new_v4();
        let span = info_span!("execute", %execution_id);

        async move {
            tokio::task::yield_now().await;

            let violations = contracts::validate(Contract::Request, &snapshot);
            if !violations.is_empty() {
                warn!(error = %violations, "执行请求无效");
                metrics::record_request("invalid");
                return Err(RuleError::RequestInvalid(violations));
            }

            let request: Request = serde_json::from_value(snapshot)?;
            self.run(request)
        }
        .instrument(span)
        .await
    }

    /// 执行类型化请求
    ///
    /// 与 [`execute`](Self::execute) 的语义相同。
    pub async fn execute_request(&self, request: Request) -> Result<ExecutionResult> {
        let document = serde_json::to_value(&request)?;
        self.execute(&document).await
    }

    fn run(&self, request: Request) -> Result<ExecutionResult> {
        let start = Instant::now();
        let namespace = request.namespace.as_str();

        let mut outcome = Outcome::new();
        let result: Result<()> = if request.execute_all {
            self.registry
                .rules(namespace)
                .iter()
                .try_for_each(|rule| {
                    let value = self.evaluate_rule(namespace, rule, &request.inputs)?;
                    outcome.insert(rule.name(), Some(value));
                    Ok(())
                })
        } else {
            request.rule_names.iter().try_for_each(|name| {
                match self.registry.lookup(namespace, name) {
                    Some(rule) => {
                        let value = self.evaluate_rule(namespace, &rule, &request.inputs)?;
                        outcome.insert(name.as_str(), Some(value));
                    }
                    None => {
                        debug!(namespace, rule_name = %name, "规则未找到");
                        metrics::record_rule_outcome(namespace, "unresolved");
                        outcome.insert(name.as_str(), None);
                    }
                }
                Ok(())
            })
        };

        metrics::record_request_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                metrics::record_request("ok");
                debug!(namespace, rules = outcome.len(), "执行完成");
                Ok(ExecutionResult { request, outcome })
            }
            Err(e) => {
                warn!(namespace, error = %e, "执行失败");
                metrics::record_request("failed");
                Err(e)
            }
        }
    }

    /// 求值单条规则并应用返回值替换
    fn evaluate_rule(
        &self,
        namespace: &str,
        rule: &Arc<CompiledRule>,
        inputs: &Inputs,
    ) -> Result<Value> {
        let evaluator = if self.trace_enabled {
            CriteriaEvaluator::new().with_trace()
        } else {
            CriteriaEvaluator::new()
        };

        let evaluation = evaluator.evaluate(rule.formula(), inputs)?;
        for line in &evaluation.trace {
            debug!(rule_name = rule.name(), "{}", line);
        }

        let matched = is_truthy(Some(&evaluation.value));
        metrics::record_rule_outcome(namespace, if matched { "matched" } else { "not_matched" });

        if matched && is_truthy(Some(rule.return_value())) {
            Ok(rule.return_value().clone())
        } else {
            Ok(evaluation.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criteria, Rule};
    use crate::operators::ComparisonOperator;
    use serde_json::json;

    fn executor_with(rules: Vec<Rule>) -> RuleExecutor {
        let registry = RuleRegistry::new();
        for rule in rules {
            registry.register("ns", rule).unwrap();
        }
        RuleExecutor::new(registry)
    }

    fn gt(name: &str, threshold: i64) -> Rule {
        Rule::new(
            name,
            Criteria::compare("amount", ComparisonOperator::Greater, threshold),
        )
    }

    #[tokio::test]
    async fn test_execute_by_name() {
        let executor = executor_with(vec![gt("big", 100).returning("BIG"), gt("small", 1)]);

        let result = executor
            .execute(&json!({
                "ruleNameSpace": "ns",
                "rulesToExecute": ["big", "small"],
                "inputs": {"amount": 50}
            }))
            .await
            .unwrap();

        assert_eq!(result.outcome.get("big"), Some(&json!(false)));
        assert_eq!(result.outcome.get("small"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_return_value_substitution() {
        let executor = executor_with(vec![
            gt("labelled", 1).returning("approved"),
            gt("falsy_label", 1).returning(0),
        ]);

        let result = executor
            .execute_request(
                Request::new("ns")
                    .execute_all()
                    .inputs(Inputs::new().with("amount", 5)),
            )
            .await
            .unwrap();

        assert_eq!(result.outcome.get("labelled"), Some(&json!("approved")));
        // 返回值为假值时保留原始结果
        assert_eq!(result.outcome.get("falsy_label"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_missing_rule_is_unresolved() {
        let executor = executor_with(vec![gt("big", 100)]);

        let result = executor
            .execute_request(Request::new("ns").rules(["missing"]))
            .await
            .unwrap();

        assert!(result.outcome.is_unresolved("missing"));
        assert_eq!(
            serde_json::to_value(&result).unwrap()["outcome"],
            json!({})
        );
    }

    #[tokio::test]
    async fn test_unknown_namespace_execute_all_is_empty() {
        let executor = executor_with(vec![gt("big", 100)]);

        let result = executor
            .execute_request(Request::new("elsewhere").execute_all())
            .await
            .unwrap();

        assert!(result.outcome.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let executor = executor_with(vec![]);

        let err = executor
            .execute(&json!({"rulesToExecute": ["a"]}))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "REQUEST_INVALID");
    }

    #[tokio::test]
    async fn test_snapshot_is_returned() {
        let executor = executor_with(vec![gt("big", 100)]);
        let request = Request::new("ns")
            .rules(["big"])
            .inputs(Inputs::new().with("amount", 500));

        let result = executor.execute_request(request.clone()).await.unwrap();

        assert_eq!(result.request, request);
    }

    #[tokio::test]
    async fn test_with_trace_does_not_change_outcome() {
        let executor = executor_with(vec![gt("big", 100)]).with_trace();

        let result = executor
            .execute_request(
                Request::new("ns")
                    .rules(["big"])
                    .inputs(Inputs::new().with("amount", 500)),
            )
            .await
            .unwrap();

        assert_eq!(result.outcome.get("big"), Some(&json!(true)));
    }
}
