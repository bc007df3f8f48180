//! 条件规则引擎
//!
//! 调用方按命名空间注册由逻辑运算与比较运算组成的规则树，
//! 再提交一组输入，对命名空间内的部分或全部规则求值：
//! - JSON 规则定义与契约校验
//! - 规则编译和按命名空间注册
//! - 条件树递归求值（AND/OR 对全部子节点求值）
//! - 异步执行编排与结果组装

pub mod compiler;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod loader;
pub mod models;
pub mod operators;
pub mod store;

pub use compiler::{CompiledRule, RuleCompiler};
pub use contracts::{Contract, Violation, Violations};
pub use engine::RuleEngine;
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, CriteriaEvaluator, Evaluation, evaluate, is_truthy};
pub use executor::RuleExecutor;
pub use loader::{LoadFailure, LoadSummary, RuleLoader};
pub use models::{
    Comparison, Composite, Criteria, ExecutionResult, Inputs, Operand, Outcome, Request, Rule,
};
pub use operators::{
    ComparisonOperator, LogicalOperator, Operator, OperatorKind, VALID_OPERATIONS,
};
pub use store::{RegistryStats, RuleRegistry};
