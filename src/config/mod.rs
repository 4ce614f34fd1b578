//! Configuration Module
//!
//! 提供 Agent 配置管理功能，支持多层级配置来源：
//! - 命令行参数（最高优先级）
//! - 环境变量
//! - 配置文件（JSON 格式）
//! - 默认值（最低优先级）

mod loader;
mod types;

pub use loader::{load_config, load_config_from_sources, print_config, ConfigError, ConfigOverrides};
pub use types::{
    AgentConfig, LlmConfig, LogConfig, RetryConfig, SearchConfig, SubmissionConfig, DEFAULT_RPC_URL,
};
