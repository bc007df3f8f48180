//! 规则引擎命令行入口
//!
//! 启动时加载配置与规则文件，然后从 stdin 逐行读取执行请求（每行一个
//! JSON 文档），向 stdout 逐行输出执行结果或错误对象。

use anyhow::{Context, Result};
use rule_engine::{RuleEngine, RuleError, RuleLoader};
use rule_shared::config::AppConfig;
use rule_shared::observability;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let config = AppConfig::load("rule-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let guard = observability::init(&obs_config)?;

    info!(
        environment = %config.environment,
        duplicate_rule_names = ?config.engine.duplicate_rule_names,
        "Starting rule-engine..."
    );

    let engine = RuleEngine::with_config(&config.engine);

    if let Some(path) = &config.engine.rules_file {
        let summary = RuleLoader::load_file(&engine, path)
            .await
            .with_context(|| format!("加载规则文件失败: {}", path))?;
        if !summary.is_clean() {
            warn!(failed = summary.failures.len(), "部分规则未能加载");
        }
        info!(loaded = summary.loaded, "Loaded rules from {}", path);
    } else {
        warn!("未配置规则文件, 注册表为空");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&engine, &line).await;
        let mut rendered = serde_json::to_string(&response)?;
        rendered.push('\n');
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;
    }

    if let Some(snapshot) = guard.render_metrics() {
        debug!(metrics = %snapshot, "Metrics snapshot");
    }
    info!("Input closed, shutting down");

    Ok(())
}

/// 执行一行请求，失败时返回错误对象
async fn handle_line(engine: &RuleEngine, line: &str) -> Value {
    let document: Value = match serde_json::from_str(line) {
        Ok(document) => document,
        Err(e) => return error_object(&RuleError::from(e)),
    };

    match engine.execute(&document).await {
        Ok(result) => serde_json::to_value(&result)
            .unwrap_or_else(|e| error_object(&RuleError::from(e))),
        Err(e) => error_object(&e),
    }
}

fn error_object(error: &RuleError) -> Value {
    let violations: Vec<Value> = error
        .violations()
        .map(|v| {
            v.iter()
                .map(|violation| json!({"path": violation.path, "reason": violation.reason}))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "error": {
            "code": error.code(),
            "message": error.to_string(),
            "violations": violations,
        }
    })
}
