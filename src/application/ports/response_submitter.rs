//! Response Submitter Port - 答案上链抽象
//!
//! 构建交易、签名、广播，并等待确认

use async_trait::async_trait;
use thiserror::Error;

use crate::application::retry::Retryable;
use crate::domain::{Answer, SubmissionReceipt, Task};

/// 提交错误
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    /// 交易已广播但未拿到回执，携带 tx hash
    #[error("Timed out waiting for confirmation of {0}")]
    Timeout(String),
}

impl Retryable for SubmissionError {
    /// 仅广播前的 RPC 失败可重试
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Response Submitter Port
#[async_trait]
pub trait ResponseSubmitterPort: Send + Sync {
    /// 提交答案，至少一次区块确认后返回
    async fn submit_answer(
        &self,
        task: &Task,
        answer: &Answer,
    ) -> Result<SubmissionReceipt, SubmissionError>;

    /// 查询先前广播的交易；节点不认识该交易（已被丢弃）时返回 None
    async fn submission_status(
        &self,
        tx_hash: &str,
    ) -> Result<Option<SubmissionReceipt>, SubmissionError>;
}
