//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ChainReader、LlmClient、Search、ResponseSubmitter、Registry、MarketResolver）
//! - retry: 各端口适配器共用的重试策略

pub mod ports;
pub mod retry;

pub use ports::{
    // Chain reader
    ChainError,
    ChainReaderPort,
    // LLM client
    GenerationError,
    LlmClientPort,
    // Market
    MarketResolverPort,
    // Registry
    AgentDetails,
    RegistryError,
    RegistryPort,
    // Response submitter
    ResponseSubmitterPort,
    SubmissionError,
    // Search
    SearchError,
    SearchPort,
};
pub use retry::{RetryPolicy, Retryable};
