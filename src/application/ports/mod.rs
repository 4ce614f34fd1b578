//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod chain_reader;
mod llm_client;
mod market;
mod registry;
mod response_submitter;
mod search;

pub use chain_reader::{ChainError, ChainReaderPort};
pub use llm_client::{GenerationError, LlmClientPort};
pub use market::MarketResolverPort;
pub use registry::{AgentDetails, RegistryError, RegistryPort};
pub use response_submitter::{ResponseSubmitterPort, SubmissionError};
pub use search::{SearchError, SearchPort};
