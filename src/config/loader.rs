//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 命令行参数
//! 2. 环境变量
//! 3. 配置文件（JSON）
//! 4. 默认值

use config::{Config, ConfigError as ConfigCrateError, File, FileFormat};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::types::AgentConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required configuration: {0}")]
    MissingField(&'static str),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 未指定 `--config` 时按顺序搜索的配置文件，取第一个存在的
const CONFIG_FILE_NAMES: &[&str] = &["config.json", "eigenlayer_config.json"];

/// 环境变量 → 配置键
///
/// 同一个键出现多次时，靠后的变量覆盖靠前的
const ENV_BINDINGS: &[(&str, &str)] = &[
    ("WEB3_PROVIDER_URI", "rpc_url"),
    ("AGENT_PRIVATE_KEY", "private_key"),
    ("PRIVATE_KEY", "private_key"),
    ("ORACLE_ADDRESS", "oracle_address"),
    ("REGISTRY_ADDRESS", "registry_address"),
    ("AGENT_ADDRESS", "agent_address"),
    ("MARKET_ADDRESS", "market_address"),
    ("API_KEY", "api_key"),
    ("OPENROUTER_API_KEY", "api_key"),
    ("AI_MODEL", "model"),
    ("TAVILY_API_KEY", "tavily_api_key"),
    ("ENABLE_SEARCH", "enable_search"),
    ("POLLING_INTERVAL", "polling_interval_secs"),
];

/// 命令行覆盖项
///
/// `None` 表示未在命令行上指定
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub oracle_address: Option<String>,
    pub registry_address: Option<String>,
    pub agent_address: Option<String>,
    pub market_address: Option<String>,
    pub private_key: Option<String>,
    pub api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub model: Option<String>,
    pub polling_interval_secs: Option<u64>,
    pub run_once: Option<bool>,
    pub enable_search: Option<bool>,
}

/// 加载应用配置
///
/// 读取进程环境变量，再叠加命令行覆盖项
///
/// # 环境变量示例
/// - `WEB3_PROVIDER_URI=http://localhost:8545`
/// - `ORACLE_ADDRESS=0x5FbDB2315678afecb367f032d93F642f64180aa3`
/// - `OPENROUTER_API_KEY=sk-or-...`
/// - `POLLING_INTERVAL=30`
pub fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<AgentConfig, ConfigError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_from_sources(config_path, &env, overrides)
}

/// 从指定的文件、环境变量表和命令行覆盖项加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
/// - `env` - 环境变量表
/// - `overrides` - 命令行覆盖项
pub fn load_config_from_sources(
    config_path: Option<&Path>,
    env: &HashMap<String, String>,
    overrides: &ConfigOverrides,
) -> Result<AgentConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("model", "openai/gpt-3.5-turbo")?
        .set_default("enable_search", false)?
        .set_default("polling_interval_secs", 10)?
        .set_default("run_once", false)?
        .set_default("market_tasks_only", false)?
        .set_default("from_block", 0)?
        .set_default("llm.base_url", "https://openrouter.ai/api/v1")?
        .set_default("llm.timeout_secs", 60)?
        .set_default("search.base_url", "https://api.tavily.com")?
        .set_default("search.max_results", 5)?
        .set_default("search.timeout_secs", 30)?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.initial_backoff_ms", 500)?
        .set_default("retry.max_backoff_ms", 8000)?
        .set_default("submission.confirmations", 1)?
        .set_default("submission.receipt_timeout_secs", 120)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
    } else if let Some(name) = CONFIG_FILE_NAMES.iter().find(|n| Path::new(n).is_file()) {
        builder = builder.add_source(File::new(name, FileFormat::Json).required(true));
    }

    // 3. 环境变量（空值忽略）
    for (var, key) in ENV_BINDINGS {
        if let Some(value) = env.get(*var).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            builder = builder.set_override(*key, value)?;
        }
    }

    // 4. 命令行参数（最高优先级）
    builder = builder
        .set_override_option("rpc_url", overrides.rpc_url.clone())?
        .set_override_option("oracle_address", overrides.oracle_address.clone())?
        .set_override_option("registry_address", overrides.registry_address.clone())?
        .set_override_option("agent_address", overrides.agent_address.clone())?
        .set_override_option("market_address", overrides.market_address.clone())?
        .set_override_option("private_key", overrides.private_key.clone())?
        .set_override_option("api_key", overrides.api_key.clone())?
        .set_override_option("tavily_api_key", overrides.tavily_api_key.clone())?
        .set_override_option("model", overrides.model.clone())?
        .set_override_option("polling_interval_secs", overrides.polling_interval_secs)?
        .set_override_option("run_once", overrides.run_once)?
        .set_override_option("enable_search", overrides.enable_search)?;

    let config = builder.build()?;

    let agent_config: AgentConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&agent_config)?;

    Ok(agent_config)
}

/// 验证配置有效性
///
/// 只校验格式；运行所需字段（私钥、API key 等）由各子命令按需检查
fn validate_config(config: &AgentConfig) -> Result<(), ConfigError> {
    if !config.run_once && config.polling_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Polling interval cannot be 0 unless run_once is set".to_string(),
        ));
    }

    if config.submission.confirmations == 0 {
        return Err(ConfigError::ValidationError(
            "submission.confirmations must be at least 1".to_string(),
        ));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Model cannot be empty".to_string(),
        ));
    }

    if config.llm.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "LLM base URL cannot be empty".to_string(),
        ));
    }

    // 已填写的地址必须可解析
    config.registry_address()?;
    config.agent_address()?;
    if config.oracle_address.as_deref().is_some_and(|a| !a.trim().is_empty()) {
        config.require_oracle_address()?;
    }
    if config.market_address.as_deref().is_some_and(|a| !a.trim().is_empty()) {
        config.require_market_address()?;
    }

    Ok(())
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret.as_deref() {
        Some(s) if !s.is_empty() => "<set>",
        _ => "<unset>",
    }
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<unset>")
}

/// 打印配置信息（用于启动时日志，密钥脱敏）
pub fn print_config(config: &AgentConfig) {
    tracing::info!("=== Agent Configuration ===");
    tracing::info!("RPC URL: {}", config.rpc_endpoint());
    tracing::info!("Oracle Address: {}", or_unset(&config.oracle_address));
    tracing::info!("Registry Address: {}", or_unset(&config.registry_address));
    tracing::info!("Agent Address: {}", or_unset(&config.agent_address));
    tracing::info!("Market Address: {}", or_unset(&config.market_address));
    tracing::info!("Model: {}", config.model);
    tracing::info!("LLM Base URL: {}", config.llm.base_url);
    tracing::info!("API Key: {}", redact(&config.api_key));
    tracing::info!("Private Key: {}", redact(&config.private_key));
    tracing::info!("Search Enabled: {}", config.enable_search);
    if config.enable_search {
        tracing::info!("Tavily API Key: {}", redact(&config.tavily_api_key));
    }
    tracing::info!("Polling Interval: {}s", config.polling_interval_secs);
    tracing::info!("Run Once: {}", config.run_once);
    tracing::info!("Confirmations: {}", config.submission.confirmations);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("===========================");
}
