//! 规则引擎领域模型
//!
//! 所有模型都是值类型：注册和执行时按值移动或克隆，不存在共享可变状态，
//! 因此"不可变快照"是类型本身的性质。

use crate::operators::{ComparisonOperator, LogicalOperator, Operator, OperatorKind};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(rename = "ruleName")]
    pub name: String,
    /// 条件与本值均为真值时替代求值结果返回
    #[serde(rename = "returnVal", default)]
    pub return_value: Value,
    pub formula: Criteria,
}

impl Rule {
    pub fn new(name: impl Into<String>, formula: Criteria) -> Self {
        Self {
            name: name.into(),
            return_value: Value::Null,
            formula,
        }
    }

    pub fn returning(mut self, value: impl Into<Value>) -> Self {
        self.return_value = value.into();
        self
    }
}

/// 条件节点（逻辑组或比较）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CriteriaDocument", into = "CriteriaDocument")]
pub enum Criteria {
    Composite(Composite),
    Comparison(Comparison),
}

impl Criteria {
    pub fn and(children: Vec<Criteria>) -> Self {
        Self::Composite(Composite::new(LogicalOperator::And, children))
    }

    pub fn or(children: Vec<Criteria>) -> Self {
        Self::Composite(Composite::new(LogicalOperator::Or, children))
    }

    /// 输入参数与字面量比较
    pub fn compare(
        param: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Comparison(Comparison {
            operator,
            param: param.into(),
            operand: Operand::Literal(value.into()),
        })
    }

    /// 两个输入参数互相比较
    pub fn compare_with(
        param: impl Into<String>,
        operator: ComparisonOperator,
        other: impl Into<String>,
    ) -> Self {
        Self::Comparison(Comparison {
            operator,
            param: param.into(),
            operand: Operand::Input(other.into()),
        })
    }

    pub fn operator(&self) -> Operator {
        match self {
            Self::Composite(c) => c.operator.into(),
            Self::Comparison(c) => c.operator.into(),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub operator: LogicalOperator,
    pub children: Vec<Criteria>,
}

impl Composite {
    pub fn new(operator: LogicalOperator, children: Vec<Criteria>) -> Self {
        Self { operator, children }
    }
}

/// 比较节点
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub operator: ComparisonOperator,
    pub param: String,
    pub operand: Operand,
}

/// 比较右侧操作数
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// 规则中写死的字面量
    Literal(Value),
    /// 另一个输入参数名（compareWith）
    Input(String),
}

/// 条件节点的线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CriteriaDocument {
    operator: Operator,
    #[serde(default, alias = "children", skip_serializing_if = "Option::is_none")]
    criteria: Option<Vec<Criteria>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    param: Option<String>,
    // 区分缺省与显式 null
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compare_with: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<CriteriaDocument> for Criteria {
    type Error = String;

    fn try_from(doc: CriteriaDocument) -> Result<Self, Self::Error> {
        match doc.operator.kind() {
            OperatorKind::Logical(operator) => {
                if doc.param.is_some() || doc.value.is_some() || doc.compare_with.is_some() {
                    return Err(format!(
                        "逻辑操作符 '{}' 不接受 param/value/compareWith",
                        doc.operator
                    ));
                }
                match doc.criteria {
                    Some(children) if !children.is_empty() => {
                        Ok(Self::Composite(Composite { operator, children }))
                    }
                    _ => Err(format!("逻辑操作符 '{}' 至少需要一个子条件", doc.operator)),
                }
            }
            OperatorKind::Comparison(operator) => {
                if doc.criteria.is_some() {
                    return Err(format!("比较操作符 '{}' 不接受子条件", doc.operator));
                }
                let param = doc
                    .param
                    .ok_or_else(|| format!("比较操作符 '{}' 缺少 param", doc.operator))?;
                let operand = match (doc.compare_with, doc.value) {
                    (Some(other), _) => Operand::Input(other),
                    (None, Some(value)) => Operand::Literal(value),
                    (None, None) => {
                        return Err(format!(
                            "比较操作符 '{}' 需要 value 或 compareWith",
                            doc.operator
                        ));
                    }
                };
                Ok(Self::Comparison(Comparison {
                    operator,
                    param,
                    operand,
                }))
            }
        }
    }
}

impl From<Criteria> for CriteriaDocument {
    fn from(node: Criteria) -> Self {
        match node {
            Criteria::Composite(c) => Self {
                operator: c.operator.into(),
                criteria: Some(c.children),
                param: None,
                value: None,
                compare_with: None,
            },
            Criteria::Comparison(c) => {
                let (value, compare_with) = match c.operand {
                    Operand::Literal(v) => (Some(v), None),
                    Operand::Input(name) => (None, Some(name)),
                };
                Self {
                    operator: c.operator.into(),
                    criteria: None,
                    param: Some(c.param),
                    value,
                    compare_with,
                }
            }
        }
    }
}

/// 输入参数集合
///
/// 查找不存在的参数返回 `None`，即"无值"哨兵；比较时它与其他值一样参与
/// 严格相等和排序语义。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inputs(Map<String, Value>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Inputs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Inputs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 执行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    #[serde(rename = "ruleNameSpace")]
    pub namespace: String,
    #[serde(rename = "executeAllRulesForSpecifiedNameSpace", default)]
    pub execute_all: bool,
    #[serde(rename = "rulesToExecute", default)]
    pub rule_names: Vec<String>,
    #[serde(default)]
    pub inputs: Inputs,
}

impl Request {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            execute_all: false,
            rule_names: Vec::new(),
            inputs: Inputs::new(),
        }
    }

    pub fn execute_all(mut self) -> Self {
        self.execute_all = true;
        self
    }

    pub fn rules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }
}

/// 每条规则的执行结果
///
/// 按名称解析时未找到的规则会留下一个"未解析"条目（值为 `None`），
/// 序列化时省略该条目。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome(BTreeMap<String, Option<Value>>);

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入结果，同名条目后写覆盖先写
    pub fn insert(&mut self, rule_name: impl Into<String>, value: Option<Value>) {
        self.0.insert(rule_name.into(), value);
    }

    /// 已解析的结果值
    pub fn get(&self, rule_name: &str) -> Option<&Value> {
        self.0.get(rule_name).and_then(Option::as_ref)
    }

    /// 是否记录了该规则（包括未解析条目）
    pub fn contains(&self, rule_name: &str) -> bool {
        self.0.contains_key(rule_name)
    }

    /// 该规则是否按名称请求过但未找到
    pub fn is_unresolved(&self, rule_name: &str) -> bool {
        matches!(self.0.get(rule_name), Some(None))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, Option<&Value>)> {
        self.0.iter().map(|(k, v)| (k, v.as_ref()))
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let resolved: Vec<(&String, &Value)> = self
            .0
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
            .collect();

        let mut map = serializer.serialize_map(Some(resolved.len()))?;
        for (k, v) in resolved {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    #[serde(rename = "processMe")]
    pub request: Request,
    pub outcome: Outcome,
}
