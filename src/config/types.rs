//! Configuration Types
//!
//! 定义所有配置结构体

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use super::loader::ConfigError;
use crate::application::RetryPolicy;

/// 默认 RPC 节点
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Agent 主配置
///
/// 启动时加载一次，进程生命周期内不可变
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// 区块链 JSON-RPC 地址
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// `rpc_url` 的旧名称（配置文件兼容）
    #[serde(default)]
    pub provider: Option<String>,

    /// AIOracleServiceManager 合约地址
    #[serde(default)]
    pub oracle_address: Option<String>,

    /// AIAgentRegistry 合约地址
    #[serde(default)]
    pub registry_address: Option<String>,

    /// AIAgent 合约地址
    #[serde(default)]
    pub agent_address: Option<String>,

    /// PredictionMarketHook 合约地址
    #[serde(default)]
    pub market_address: Option<String>,

    /// 模型标识（OpenRouter 格式，如 openai/gpt-4-turbo）
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenRouter API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// 交易签名私钥
    #[serde(default)]
    pub private_key: Option<String>,

    /// Tavily API key（网页搜索）
    #[serde(default)]
    pub tavily_api_key: Option<String>,

    /// 是否启用搜索增强
    #[serde(default)]
    pub enable_search: bool,

    /// 轮询间隔（秒）
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// 只执行一轮
    #[serde(default)]
    pub run_once: bool,

    /// 只处理预测市场问题
    #[serde(default)]
    pub market_tasks_only: bool,

    /// 查询任务创建事件的起始区块
    #[serde(default)]
    pub from_block: u64,

    /// LLM 配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 搜索配置
    #[serde(default)]
    pub search: SearchConfig,

    /// 重试配置
    #[serde(default)]
    pub retry: RetryConfig,

    /// 交易提交配置
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

fn default_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_polling_interval() -> u64 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            provider: None,
            oracle_address: None,
            registry_address: None,
            agent_address: None,
            market_address: None,
            model: default_model(),
            api_key: None,
            private_key: None,
            tavily_api_key: None,
            enable_search: false,
            polling_interval_secs: default_polling_interval(),
            run_once: false,
            market_tasks_only: false,
            from_block: 0,
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            retry: RetryConfig::default(),
            submission: SubmissionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AgentConfig {
    /// 实际使用的 RPC 地址：rpc_url > provider > 默认值
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_url
            .as_deref()
            .or(self.provider.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_RPC_URL)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn require_oracle_address(&self) -> Result<Address, ConfigError> {
        require_address("oracle_address", self.oracle_address.as_deref())
    }

    pub fn require_registry_address(&self) -> Result<Address, ConfigError> {
        require_address("registry_address", self.registry_address.as_deref())
    }

    pub fn require_market_address(&self) -> Result<Address, ConfigError> {
        require_address("market_address", self.market_address.as_deref())
    }

    pub fn registry_address(&self) -> Result<Option<Address>, ConfigError> {
        optional_address("registry_address", self.registry_address.as_deref())
    }

    pub fn agent_address(&self) -> Result<Option<Address>, ConfigError> {
        optional_address("agent_address", self.agent_address.as_deref())
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        non_empty(self.api_key.as_deref()).ok_or(ConfigError::MissingField(
            "api_key (set OPENROUTER_API_KEY or --api-key)",
        ))
    }

    pub fn require_tavily_api_key(&self) -> Result<&str, ConfigError> {
        non_empty(self.tavily_api_key.as_deref()).ok_or(ConfigError::MissingField(
            "tavily_api_key (set TAVILY_API_KEY or --tavily-api-key)",
        ))
    }

    /// 解析签名私钥
    pub fn require_signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        let key = non_empty(self.private_key.as_deref()).ok_or(ConfigError::MissingField(
            "private_key (set PRIVATE_KEY or --private-key)",
        ))?;
        PrivateKeySigner::from_str(key.trim().trim_start_matches("0x"))
            .map_err(|e| ConfigError::ValidationError(format!("Invalid private key: {}", e)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim())
        .map_err(|e| ConfigError::ValidationError(format!("Invalid {}: {} ({})", field, value, e)))
}

fn require_address(field: &'static str, value: Option<&str>) -> Result<Address, ConfigError> {
    let value = non_empty(value).ok_or(ConfigError::MissingField(field))?;
    parse_address(field, value)
}

fn optional_address(field: &'static str, value: Option<&str>) -> Result<Option<Address>, ConfigError> {
    non_empty(value).map(|v| parse_address(field, v)).transpose()
}

/// LLM 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// OpenRouter API 基础 URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// HTTP-Referer 请求头
    #[serde(default = "default_referer")]
    pub referer: String,

    /// X-Title 请求头
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_referer() -> String {
    "https://eigenlayer-ai-agent.com".to_string()
}

fn default_title() -> String {
    "EigenLayer AI Agent".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

/// 搜索服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Tavily API 基础 URL
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// 每次搜索返回的最大结果数
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// 请求超时时间（秒）
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_max_results() -> u32 {
    5
}

fn default_search_timeout() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

/// 重试配置
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// 最大尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 首次退避（毫秒）
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// 退避上限（毫秒）
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

/// 交易提交配置
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// 视为成功所需的区块确认数
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// 等待回执的超时时间（秒）
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,

    /// 固定 gas limit，不设置则由节点估算
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

fn default_confirmations() -> u64 {
    1
}

fn default_receipt_timeout() -> u64 {
    120
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            confirmations: default_confirmations(),
            receipt_timeout_secs: default_receipt_timeout(),
            gas_limit: None,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.rpc_endpoint(), DEFAULT_RPC_URL);
        assert_eq!(config.model, "openai/gpt-3.5-turbo");
        assert_eq!(config.polling_interval_secs, 10);
        assert_eq!(config.submission.confirmations, 1);
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_rpc_endpoint_prefers_rpc_url_over_provider() {
        let mut config = AgentConfig::default();
        config.provider = Some("http://provider:8545".to_string());
        assert_eq!(config.rpc_endpoint(), "http://provider:8545");

        config.rpc_url = Some("http://rpc:8545".to_string());
        assert_eq!(config.rpc_endpoint(), "http://rpc:8545");
    }

    #[test]
    fn test_require_oracle_address() {
        let mut config = AgentConfig::default();
        assert!(matches!(
            config.require_oracle_address(),
            Err(ConfigError::MissingField("oracle_address"))
        ));

        config.oracle_address = Some("0x...".to_string());
        assert!(matches!(
            config.require_oracle_address(),
            Err(ConfigError::ValidationError(_))
        ));

        config.oracle_address = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string());
        assert!(config.require_oracle_address().is_ok());
    }

    #[test]
    fn test_optional_address_empty_is_none() {
        let mut config = AgentConfig::default();
        config.agent_address = Some("  ".to_string());
        assert_eq!(config.agent_address().unwrap(), None);
    }

    #[test]
    fn test_require_signer() {
        let mut config = AgentConfig::default();
        assert!(config.require_signer().is_err());

        config.private_key = Some(ANVIL_KEY.to_string());
        let signer = config.require_signer().unwrap();
        assert_eq!(
            signer.address(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );

        config.private_key = Some("not-a-key".to_string());
        assert!(matches!(
            config.require_signer(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
    }
}
