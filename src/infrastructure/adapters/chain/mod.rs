//! Chain Adapter - 基于 alloy 的链上适配器
//!
//! - ChainConnection: 共享 provider / signer / 交易发送
//! - AlloyOracleReader: 读取待处理任务
//! - AlloyResponseSubmitter: 提交答案、创建任务
//! - AlloyRegistryClient: Agent 注册表
//! - AlloyMarketResolver: 预测市场结算

mod connection;
mod contracts;
mod market_client;
mod oracle_reader;
mod registry_client;
mod submitter;

pub use connection::{ChainConnection, TxSettings};
pub use market_client::AlloyMarketResolver;
pub use oracle_reader::AlloyOracleReader;
pub use registry_client::AlloyRegistryClient;
pub use submitter::{AlloyResponseSubmitter, SubmissionTarget};
