//! Oracle Agent - 链上预言机任务的 LLM 应答代理
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Task Context: 预言机任务、答案、YES/NO 决策
//! - Submission: 交易回执
//! - Prompt: 提示词与搜索上下文
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ChainReader, LlmClient, Search, ResponseSubmitter, Registry, MarketResolver）
//! - Retry: 共享重试策略
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: alloy 链上适配器、OpenRouter 客户端、Tavily 搜索客户端
//! - Worker: PollWorker 轮询状态机

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AgentConfig};
