//! 规则操作符定义
//!
//! 符号 token 到语义操作的固定映射表。表外的 token 在契约校验阶段即被拒绝，
//! 不会进入求值阶段。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 全部合法的操作符 token，按映射表顺序
pub const VALID_OPERATIONS: [&str; 8] = ["&&", "||", "!=", "==", ">", ">=", "<", "<="];

/// 操作符（映射表中的八种语义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::And,
        Self::Or,
        Self::NotEqual,
        Self::Equal,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
    ];

    /// 从符号 token 解析
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    /// 符号 token
    pub fn token(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::NotEqual => "!=",
            Self::Equal => "==",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }

    /// 语义分类
    pub fn kind(self) -> OperatorKind {
        match self {
            Self::And => OperatorKind::Logical(LogicalOperator::And),
            Self::Or => OperatorKind::Logical(LogicalOperator::Or),
            Self::NotEqual => OperatorKind::Comparison(ComparisonOperator::NotEqual),
            Self::Equal => OperatorKind::Comparison(ComparisonOperator::Equal),
            Self::Greater => OperatorKind::Comparison(ComparisonOperator::Greater),
            Self::GreaterOrEqual => OperatorKind::Comparison(ComparisonOperator::GreaterOrEqual),
            Self::Less => OperatorKind::Comparison(ComparisonOperator::Less),
            Self::LessOrEqual => OperatorKind::Comparison(ComparisonOperator::LessOrEqual),
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self.kind(), OperatorKind::Logical(_))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl From<LogicalOperator> for Operator {
    fn from(op: LogicalOperator) -> Self {
        match op {
            LogicalOperator::And => Self::And,
            LogicalOperator::Or => Self::Or,
        }
    }
}

impl From<ComparisonOperator> for Operator {
    fn from(op: ComparisonOperator) -> Self {
        match op {
            ComparisonOperator::NotEqual => Self::NotEqual,
            ComparisonOperator::Equal => Self::Equal,
            ComparisonOperator::Greater => Self::Greater,
            ComparisonOperator::GreaterOrEqual => Self::GreaterOrEqual,
            ComparisonOperator::Less => Self::Less,
            ComparisonOperator::LessOrEqual => Self::LessOrEqual,
        }
    }
}

/// 操作符语义分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Logical(LogicalOperator),
    Comparison(ComparisonOperator),
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    NotEqual,
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Operator::from(*self).token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for token in VALID_OPERATIONS {
            let op = Operator::from_token(token).unwrap();
            assert_eq!(op.token(), token);
        }
    }

    #[test]
    fn test_unknown_token() {
        assert_eq!(Operator::from_token("==="), None);
        assert_eq!(Operator::from_token("AND"), None);
        assert_eq!(Operator::from_token(""), None);
    }

    #[test]
    fn test_kind_split() {
        assert_eq!(Operator::And.kind(), OperatorKind::Logical(LogicalOperator::And));
        assert_eq!(
            Operator::GreaterOrEqual.kind(),
            OperatorKind::Comparison(ComparisonOperator::GreaterOrEqual)
        );
        assert_eq!(Operator::ALL.iter().filter(|op| op.is_logical()).count(), 2);
    }

    #[test]
    fn test_serde_uses_tokens() {
        assert_eq!(serde_json::to_string(&Operator::LessOrEqual).unwrap(), r#""<=""#);
        let op: Operator = serde_json::from_str(r#""||""#).unwrap();
        assert_eq!(op, Operator::Or);
        assert!(serde_json::from_str::<Operator>(r#""=~""#).is_err());
    }
}
