//! 结构契约校验
//!
//! 针对规则、条件节点、执行请求三种文档的专用校验器。只覆盖实际用到的约束：
//! 必填字段、类型归属、操作符枚举、封闭对象形状以及条件节点的递归自引用。
//! 校验总是收集全部违规项，而不是在第一个错误处停止。

use crate::operators::Operator;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// 契约种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Rule,
    Criteria,
    Request,
}

/// 单条违规：字段路径 + 原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// 有序违规列表，空列表表示校验通过
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self(vec![Violation::new(path, reason)])
    }

    pub fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.0.push(Violation::new(path, reason));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// 是否存在指定路径上的违规
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|v| v.path == path)
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// JSON 值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

const ANY: &[Kind] = &[
    Kind::String,
    Kind::Number,
    Kind::Boolean,
    Kind::Null,
    Kind::Object,
    Kind::Array,
];
const PRIMITIVE: &[Kind] = &[Kind::String, Kind::Number, Kind::Boolean, Kind::Null];

/// 字段约束
struct Field {
    name: &'static str,
    kinds: &'static [Kind],
    required: bool,
}

const fn required(name: &'static str, kinds: &'static [Kind]) -> Field {
    Field {
        name,
        kinds,
        required: true,
    }
}

const fn optional(name: &'static str, kinds: &'static [Kind]) -> Field {
    Field {
        name,
        kinds,
        required: false,
    }
}

const RULE_FIELDS: &[Field] = &[
    required("ruleName", &[Kind::String]),
    required("formula", &[Kind::Object]),
    optional("returnVal", ANY),
];

const CRITERIA_FIELDS: &[Field] = &[
    required("operator", &[Kind::String]),
    optional("criteria", &[Kind::Array]),
    optional("children", &[Kind::Array]),
    optional("param", &[Kind::String]),
    optional("value", PRIMITIVE),
    optional("compareWith", &[Kind::String]),
];

const REQUEST_FIELDS: &[Field] = &[
    required("ruleNameSpace", &[Kind::String]),
    optional("executeAllRulesForSpecifiedNameSpace", &[Kind::Boolean]),
    optional("rulesToExecute", &[Kind::Array]),
    optional("inputs", &[Kind::Object]),
];

/// 按契约校验文档
pub fn validate(contract: Contract, value: &Value) -> Violations {
    let mut violations = Violations::new();
    match contract {
        Contract::Rule => check_rule(value, &mut violations),
        Contract::Criteria => check_criteria(value, "", &mut violations),
        Contract::Request => check_request(value, &mut violations),
    }
    violations
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// 校验封闭对象形状：类型、必填字段、字段类型、未知字段
fn check_shape<'a>(
    value: &'a Value,
    path: &str,
    fields: &[Field],
    out: &mut Violations,
) -> Option<&'a Map<String, Value>> {
    let Some(map) = value.as_object() else {
        out.push(
            path,
            format!("must be an object, found {}", Kind::of(value).name()),
        );
        return None;
    };

    for field in fields {
        match map.get(field.name) {
            None if field.required => {
                out.push(path, format!("missing required field '{}'", field.name));
            }
            None => {}
            Some(v) => {
                let kind = Kind::of(v);
                if !field.kinds.contains(&kind) {
                    let expected: Vec<&str> = field.kinds.iter().map(|k| k.name()).collect();
                    out.push(
                        join(path, field.name),
                        format!("must be {}, found {}", expected.join(" | "), kind.name()),
                    );
                }
            }
        }
    }

    for key in map.keys() {
        if !fields.iter().any(|f| f.name == key) {
            out.push(join(path, key), "unknown field");
        }
    }

    Some(map)
}

fn check_rule(value: &Value, out: &mut Violations) {
    let Some(map) = check_shape(value, "", RULE_FIELDS, out) else {
        return;
    };

    if let Some(formula) = map.get("formula").filter(|f| f.is_object()) {
        check_criteria(formula, "formula", out);
    }
}

fn check_criteria(value: &Value, path: &str, out: &mut Violations) {
    let Some(map) = check_shape(value, path, CRITERIA_FIELDS, out) else {
        return;
    };

    let operator = match map.get("operator") {
        Some(Value::String(token)) => {
            let op = Operator::from_token(token);
            if op.is_none() {
                out.push(
                    join(path, "operator"),
                    format!("unknown operator '{}'", token),
                );
            }
            op
        }
        _ => None,
    };

    if map.contains_key("criteria") && map.contains_key("children") {
        out.push(path, "'criteria' and 'children' are mutually exclusive");
    }

    let (children_key, children) = match (map.get("criteria"), map.get("children")) {
        (Some(c), _) => ("criteria", Some(c)),
        (None, Some(c)) => ("children", Some(c)),
        (None, None) => ("criteria", None),
    };

    if let Some(op) = operator {
        if op.is_logical() {
            match children.and_then(Value::as_array) {
                Some(list) if list.is_empty() => {
                    out.push(join(path, children_key), "logical node needs at least one child");
                }
                Some(_) => {}
                None if children.is_none() => {
                    out.push(path, format!("logical operator '{}' needs a child list", op));
                }
                None => {}
            }
            for key in ["param", "value", "compareWith"] {
                if map.contains_key(key) {
                    out.push(join(path, key), "not allowed on a logical node");
                }
            }
        } else {
            if !map.contains_key("param") {
                out.push(path, format!("comparison operator '{}' needs 'param'", op));
            }
            if !map.contains_key("value") && !map.contains_key("compareWith") {
                out.push(path, "comparison needs 'value' or 'compareWith'");
            }
            if children.is_some() {
                out.push(join(path, children_key), "not allowed on a comparison node");
            }
        }
    }

    if let Some(list) = children.and_then(Value::as_array) {
        for (i, child) in list.iter().enumerate() {
            check_criteria(child, &format!("{}[{}]", join(path, children_key), i), out);
        }
    }
}

fn check_request(value: &Value, out: &mut Violations) {
    let Some(map) = check_shape(value, "", REQUEST_FIELDS, out) else {
        return;
    };

    if let Some(Value::Array(names)) = map.get("rulesToExecute") {
        for (i, name) in names.iter().enumerate() {
            if !name.is_string() {
                out.push(
                    format!("rulesToExecute[{}]", i),
                    format!("must be string, found {}", Kind::of(name).name()),
                );
            }
        }
    }

    if let Some(Value::Object(inputs)) = map.get("inputs") {
        for (key, input) in inputs {
            let kind = Kind::of(input);
            if !PRIMITIVE.contains(&kind) {
                out.push(
                    join("inputs", key),
                    format!("must be a primitive value, found {}", kind.name()),
                );
            }
        }
    }
}
