//! Command Line Interface
//!
//! 全局参数作为配置覆盖项（优先级最高），子命令选择运行模式

use alloy::primitives::B256;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::ConfigOverrides;
use crate::domain::Decision;

/// `init` 生成的示例配置文件名
pub const SAMPLE_CONFIG_FILE: &str = "eigenlayer_config.json";

#[derive(Debug, Parser)]
#[command(name = "oracle-agent", version, about = "On-chain oracle agent backed by an LLM")]
pub struct Cli {
    /// 配置文件路径（JSON）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC 节点地址
    #[arg(short = 'p', long = "rpc-url", visible_alias = "provider", global = true)]
    pub rpc_url: Option<String>,

    #[arg(long, global = true)]
    pub oracle_address: Option<String>,

    #[arg(long, global = true)]
    pub registry_address: Option<String>,

    #[arg(long, global = true)]
    pub agent_address: Option<String>,

    #[arg(long, global = true)]
    pub market_address: Option<String>,

    #[arg(long, global = true)]
    pub private_key: Option<String>,

    /// OpenRouter API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true)]
    pub tavily_api_key: Option<String>,

    /// 模型标识，如 openai/gpt-4-turbo
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// 轮询间隔（秒）
    #[arg(short, long, global = true)]
    pub interval: Option<u64>,

    /// 只执行一轮后退出
    #[arg(long, global = true)]
    pub run_once: bool,

    /// 启用网页搜索增强（需要 Tavily API key）
    #[arg(long, global = true)]
    pub enable_search: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 运行 Agent（默认）
    Run,
    /// 在预言机上创建任务
    CreateTask {
        #[arg(long)]
        name: String,
    },
    /// 列出已注册的 Agent
    ListAgents,
    /// 列出 OpenRouter 可用模型
    ListModels,
    /// 测试网页搜索，并基于搜索结果生成回答
    Search {
        #[arg(long)]
        query: String,
    },
    /// 结算预测市场
    ResolveMarket {
        /// bytes32 市场 ID（0x 开头的 64 位十六进制）
        #[arg(long)]
        market_id: B256,
        /// YES / NO
        #[arg(long)]
        decision: Decision,
    },
    /// 在当前目录生成示例配置文件与 .env
    Init,
}

impl Cli {
    /// 未指定子命令时为 `run`
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// 命令行上显式给出的配置覆盖项
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rpc_url: self.rpc_url.clone(),
            oracle_address: self.oracle_address.clone(),
            registry_address: self.registry_address.clone(),
            agent_address: self.agent_address.clone(),
            market_address: self.market_address.clone(),
            private_key: self.private_key.clone(),
            api_key: self.api_key.clone(),
            tavily_api_key: self.tavily_api_key.clone(),
            model: self.model.clone(),
            polling_interval_secs: self.interval,
            run_once: self.run_once.then_some(true),
            enable_search: self.enable_search.then_some(true),
        }
    }
}

const SAMPLE_ENV: &str = "\
# Oracle Agent Environment Variables

# Web3 connection
WEB3_PROVIDER_URI=http://localhost:8545
PRIVATE_KEY=

# Contract addresses
ORACLE_ADDRESS=
REGISTRY_ADDRESS=
AGENT_ADDRESS=
MARKET_ADDRESS=

# OpenRouter configuration
OPENROUTER_API_KEY=
AI_MODEL=openai/gpt-3.5-turbo

# Web search configuration
TAVILY_API_KEY=
ENABLE_SEARCH=false

# Other settings
POLLING_INTERVAL=10
";

/// 生成示例配置文件与 .env，已存在的文件不覆盖
///
/// 返回新创建的文件路径
pub fn init_workspace(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let config_path = dir.join(SAMPLE_CONFIG_FILE);
    if !config_path.exists() {
        let sample = serde_json::json!({
            "provider": "http://localhost:8545",
            "oracle_address": "",
            "registry_address": "",
            "agent_address": "",
            "model": "openai/gpt-4-turbo",
            "polling_interval_secs": 10,
            "submission": { "confirmations": 1, "receipt_timeout_secs": 120 },
            "log": { "level": "info", "json": false }
        });
        let body = serde_json::to_string_pretty(&sample)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&config_path, body)?;
        created.push(config_path);
    }

    let env_path = dir.join(".env");
    if !env_path.exists() {
        std::fs::write(&env_path, SAMPLE_ENV)?;
        created.push(env_path);
    }

    Ok(created)
}
