//! 规则引擎错误类型

use crate::contracts::Violations;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则无效: {0}")]
    RuleInvalid(Violations),

    #[error("执行请求无效: {0}")]
    RequestInvalid(Violations),

    #[error("条件节点无效: {0}")]
    CriteriaInvalid(Violations),

    #[error("规则文件格式错误: {0}")]
    InvalidRuleFile(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::RuleInvalid(_) => "RULE_INVALID",
            Self::RequestInvalid(_) => "REQUEST_INVALID",
            Self::CriteriaInvalid(_) => "CRITERIA_INVALID",
            Self::InvalidRuleFile(_) => "INVALID_RULE_FILE",
            Self::JsonError(_) => "JSON_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// 契约违规列表（仅三种校验错误携带）
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::RuleInvalid(v) | Self::RequestInvalid(v) | Self::CriteriaInvalid(v) => Some(v),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::RequestInvalid(Violations::single("", "missing required field"));
        assert_eq!(err.code(), "REQUEST_INVALID");
        assert_eq!(err.violations().map(Violations::len), Some(1));
    }

    #[test]
    fn test_display_lists_every_violation() {
        let mut violations = Violations::new();
        violations.push("ruleName", "must be string, found number");
        violations.push("", "missing required field 'formula'");

        let err = RuleError::RuleInvalid(violations);
        assert_eq!(
            err.to_string(),
            "规则无效: ruleName: must be string, found number; <root>: missing required field 'formula'"
        );
    }

    #[test]
    fn test_io_error_has_no_violations() {
        let err = RuleError::from(std::io::Error::other("boom"));
        assert_eq!(err.code(), "IO_ERROR");
        assert!(err.violations().is_none());
    }
}
