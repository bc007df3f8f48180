//! 共享库
//!
//! 包含规则引擎各入口共用的配置加载与可观测性基础设施。

pub mod config;
pub mod observability;
