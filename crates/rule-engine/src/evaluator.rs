//! 条件评估器
//!
//! 递归求值条件树。比较语义与规则最初所在的宿主保持一致：
//! - `==` / `!=` 为严格相等（类型与值都相同），`"2" == 2` 为假；
//! - `>` `>=` `<` `<=` 两侧均为字符串时按 UTF-16 码元字典序比较，
//!   否则两侧转换为数字（null → 0，布尔 → 0/1，数字字符串 → 数值，
//!   无值或非数字字符串 → NaN），出现 NaN 时比较结果为假。

use crate::contracts::{self, Contract, Violations};
use crate::error::{Result, RuleError};
use crate::models::{Comparison, Composite, Criteria, Inputs, Operand};
use crate::operators::{ComparisonOperator, LogicalOperator};
use serde_json::Value;
use std::cmp::Ordering;

/// 单次求值结果
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    /// 仅在启用追踪时填充，每个访问过的节点一行
    pub trace: Vec<String>,
}

/// 条件树求值器
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaEvaluator {
    trace_enabled: bool,
}

impl CriteriaEvaluator {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 求值条件树
    ///
    /// 先按条件契约校验整棵树，任何违规都使整条规则的求值失败
    /// （`CriteriaInvalid`，携带完整违规列表）。
    pub fn evaluate(&self, node: &Criteria, inputs: &Inputs) -> Result<Evaluation> {
        let document = serde_json::to_value(node)?;
        let violations = contracts::validate(Contract::Criteria, &document);
        if !violations.is_empty() {
            return Err(RuleError::CriteriaInvalid(violations));
        }

        let mut trace = Vec::new();
        let value = self.evaluate_node(node, inputs, &mut trace, "formula")?;
        Ok(Evaluation { value, trace })
    }

    fn evaluate_node(
        &self,
        node: &Criteria,
        inputs: &Inputs,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<Value> {
        match node {
            Criteria::Composite(group) => self.evaluate_composite(group, inputs, trace, path),
            Criteria::Comparison(cmp) => Ok(self.evaluate_comparison(cmp, inputs, trace, path)),
        }
    }

    /// 逻辑组：先求值全部子节点（不短路），再从左到右折叠
    fn evaluate_composite(
        &self,
        group: &Composite,
        inputs: &Inputs,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<Value> {
        let mut results = Vec::with_capacity(group.children.len());
        for (i, child) in group.children.iter().enumerate() {
            let child_path = format!("{}.criteria[{}]", path, i);
            results.push(self.evaluate_node(child, inputs, trace, &child_path)?);
        }

        let folded = results
            .into_iter()
            .reduce(|acc, current| match group.operator {
                LogicalOperator::And if is_truthy(Some(&acc)) => current,
                LogicalOperator::And => acc,
                LogicalOperator::Or if is_truthy(Some(&acc)) => acc,
                LogicalOperator::Or => current,
            })
            .ok_or_else(|| {
                RuleError::CriteriaInvalid(Violations::single(
                    path,
                    "logical node needs at least one child",
                ))
            })?;

        if self.trace_enabled {
            trace.push(format!(
                "{}: {} 组 ({} 个子节点) => {}",
                path,
                group.operator,
                group.children.len(),
                folded
            ));
        }

        Ok(folded)
    }

    fn evaluate_comparison(
        &self,
        cmp: &Comparison,
        inputs: &Inputs,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Value {
        let left = inputs.get(&cmp.param);
        let right = match &cmp.operand {
            Operand::Literal(value) => Some(value),
            Operand::Input(name) => inputs.get(name),
        };

        let matched = ConditionEvaluator::evaluate(left, cmp.operator, right);

        if self.trace_enabled {
            let operand = match &cmp.operand {
                Operand::Literal(value) => value.to_string(),
                Operand::Input(name) => format!("${}={}", name, describe(right)),
            };
            trace.push(format!(
                "{}: {}={} {} {} => {}",
                path,
                cmp.param,
                describe(left),
                cmp.operator,
                operand,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        Value::Bool(matched)
    }
}

/// 求值条件树（不追踪）
pub fn evaluate(node: &Criteria, inputs: &Inputs) -> Result<Value> {
    CriteriaEvaluator::new()
        .evaluate(node, inputs)
        .map(|evaluation| evaluation.value)
}

/// 比较求值
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 比较两个操作数，`None` 表示无值
    pub fn evaluate(
        left: Option<&Value>,
        operator: ComparisonOperator,
        right: Option<&Value>,
    ) -> bool {
        match operator {
            ComparisonOperator::Equal => Self::strict_eq(left, right),
            ComparisonOperator::NotEqual => !Self::strict_eq(left, right),
            ComparisonOperator::Greater => {
                matches!(Self::relational(left, right), Some(Ordering::Greater))
            }
            ComparisonOperator::GreaterOrEqual => matches!(
                Self::relational(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ComparisonOperator::Less => {
                matches!(Self::relational(left, right), Some(Ordering::Less))
            }
            ComparisonOperator::LessOrEqual => matches!(
                Self::relational(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }

    /// 严格相等
    ///
    /// 整数与浮点按数值比较（`1 == 1.0`）；数组和对象永不相等。
    fn strict_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
        match (left, right) {
            (None, None) => true,
            (Some(Value::Null), Some(Value::Null)) => true,
            (Some(Value::Bool(a)), Some(Value::Bool(b))) => a == b,
            (Some(Value::String(a)), Some(Value::String(b))) => a == b,
            (Some(Value::Number(a)), Some(Value::Number(b))) => {
                match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// 关系比较，`None` 表示不可比较（出现 NaN）
    fn relational(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
        if let (Some(Value::String(a)), Some(Value::String(b))) = (left, right) {
            return Some(a.encode_utf16().cmp(b.encode_utf16()));
        }

        to_number(left).partial_cmp(&to_number(right))
    }
}

/// 真值判断：false、null、0、NaN、空字符串和无值为假
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_numeric(s),
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    }
}

/// 数字字符串解析：首尾空白忽略，空串为 0，支持 Infinity 与 0x/0o/0b 前缀
fn parse_numeric(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&trimmed[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    // Rust 额外接受 inf / nan 字样
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("inf") || lower.contains("nan") {
        return f64::NAN;
    }

    trimmed.parse().unwrap_or(f64::NAN)
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<no value>".to_string(),
    }
}
