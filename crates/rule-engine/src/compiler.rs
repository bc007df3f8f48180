//! 规则编译器
//!
//! 按规则契约校验规则文档，并生成注册表中保存的不可变规则条目，
//! 同时预先提取规则引用到的全部输入参数名。

use crate::contracts::{self, Contract};
use crate::error::{Result, RuleError};
use crate::models::{Criteria, Operand, Rule};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;

/// 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 原始规则
    pub rule: Rule,
    /// 规则中引用的所有输入参数（param 与 compareWith）
    pub required_params: BTreeSet<String>,
    /// 编译版本号
    pub compile_version: u64,
    pub registered_at: DateTime<Utc>,
}

impl CompiledRule {
    /// 获取规则名称
    pub fn name(&self) -> &str {
        &self.rule.name
    }

    /// 获取条件根节点
    pub fn formula(&self) -> &Criteria {
        &self.rule.formula
    }

    pub fn return_value(&self) -> &Value {
        &self.rule.return_value
    }
}

/// 规则编译器
pub struct RuleCompiler {
    compile_version: u64,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self { compile_version: 0 }
    }

    /// 从 JSON 字符串编译规则
    pub fn compile_from_json(&mut self, json: &str) -> Result<CompiledRule> {
        let document: Value = serde_json::from_str(json)?;
        self.compile_value(&document)
    }

    /// 从 JSON 文档编译规则
    ///
    /// 先做契约校验以收集全部违规项，通过后再转换为类型化规则。
    pub fn compile_value(&mut self, document: &Value) -> Result<CompiledRule> {
        Self::validate(document)?;
        let rule: Rule = serde_json::from_value(document.clone())?;
        Ok(self.build(rule))
    }

    /// 编译类型化规则
    pub fn compile(&mut self, rule: Rule) -> Result<CompiledRule> {
        let document = serde_json::to_value(&rule)?;
        Self::validate(&document)?;
        Ok(self.build(rule))
    }

    fn validate(document: &Value) -> Result<()> {
        let violations = contracts::validate(Contract::Rule, document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(RuleError::RuleInvalid(violations))
        }
    }

    fn build(&mut self, rule: Rule) -> CompiledRule {
        let mut required_params = BTreeSet::new();
        Self::collect_params(&rule.formula, &mut required_params);

        self.compile_version += 1;

        CompiledRule {
            rule,
            required_params,
            compile_version: self.compile_version,
            registered_at: Utc::now(),
        }
    }

    /// 递归收集参数名
    fn collect_params(node: &Criteria, params: &mut BTreeSet<String>) {
        match node {
            Criteria::Comparison(cmp) => {
                params.insert(cmp.param.clone());
                if let Operand::Input(other) = &cmp.operand {
                    params.insert(other.clone());
                }
            }
            Criteria::Composite(group) => {
                for child in &group.children {
                    Self::collect_params(child, params);
                }
            }
        }
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::ComparisonOperator;

    fn sample_rule_json() -> &'static str {
        r#"
        {
            "ruleName": "myrule2",
            "returnVal": true,
            "formula": {
                "operator": "&&",
                "criteria": [
                    {
                        "operator": "||",
                        "criteria": [
                            {"operator": "!=", "param": "param1", "value": 1},
                            {"operator": "==", "param": "param1", "value": 2}
                        ]
                    },
                    {
                        "operator": "&&",
                        "criteria": [
                            {"operator": "!=", "param": "param1", "value": null},
                            {"operator": "!=", "param": "param2", "value": null},
                            {"operator": "!=", "param": "param2", "compareWith": "param3"}
                        ]
                    }
                ]
            }
        }
        "#
    }

    #[test]
    fn test_compile_from_json() {
        let mut compiler = RuleCompiler::new();
        let compiled = compiler.compile_from_json(sample_rule_json()).unwrap();

        assert_eq!(compiled.name(), "myrule2");
        assert_eq!(compiled.return_value(), &Value::Bool(true));
        let params: Vec<&str> = compiled.required_params.iter().map(String::as_str).collect();
        assert_eq!(params, vec!["param1", "param2", "param3"]);
    }

    #[test]
    fn test_compile_version() {
        let mut compiler = RuleCompiler::new();

        let compiled1 = compiler.compile_from_json(sample_rule_json()).unwrap();
        let compiled2 = compiler.compile_from_json(sample_rule_json()).unwrap();

        assert_eq!(compiled1.compile_version, 1);
        assert_eq!(compiled2.compile_version, 2);
    }

    #[test]
    fn test_missing_formula() {
        let mut compiler = RuleCompiler::new();
        let result = compiler.compile_from_json(r#"{"ruleName": "r", "returnVal": 1}"#);

        let err = result.unwrap_err();
        assert_eq!(err.code(), "RULE_INVALID");
        assert!(err.to_string().contains("formula"));
    }

    #[test]
    fn test_unknown_operator_reports_path() {
        let mut compiler = RuleCompiler::new();
        let json = r#"
        {
            "ruleName": "r",
            "formula": {
                "operator": "&&",
                "criteria": [{"operator": "<>", "param": "a", "value": 1}]
            }
        }
        "#;

        let err = compiler.compile_from_json(json).unwrap_err();
        let violations = err.violations().unwrap();
        assert!(violations.has_path("formula.criteria[0].operator"));
    }

    #[test]
    fn test_failed_compile_does_not_bump_version() {
        let mut compiler = RuleCompiler::new();
        assert!(compiler.compile_from_json(r#"{"ruleName": "r"}"#).is_err());

        let compiled = compiler.compile_from_json(sample_rule_json()).unwrap();
        assert_eq!(compiled.compile_version, 1);
    }

    #[test]
    fn test_compile_typed_rule_with_empty_group() {
        let mut compiler = RuleCompiler::new();
        let rule = Rule::new("empty", Criteria::or(vec![]));

        let err = compiler.compile(rule).unwrap_err();
        assert!(err.violations().unwrap().has_path("formula.criteria"));
    }

    #[test]
    fn test_compile_typed_rule() {
        let mut compiler = RuleCompiler::new();
        let rule = Rule::new(
            "gt",
            Criteria::compare("amount", ComparisonOperator::Greater, 10),
        )
        .returning("big");

        let compiled = compiler.compile(rule.clone()).unwrap();
        assert_eq!(compiled.rule, rule);
        assert!(compiled.required_params.contains("amount"));
    }

    #[test]
    fn test_invalid_json() {
        let mut compiler = RuleCompiler::new();
        let err = compiler.compile_from_json("{not json").unwrap_err();
        assert_eq!(err.code(), "JSON_ERROR");
    }
}
