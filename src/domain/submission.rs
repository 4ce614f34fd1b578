//! Submission - 交易回执
//!
//! 由 Response Submitter 产生，仅用于日志与重试判断，不持久化

use serde::{Deserialize, Serialize};

/// 交易确认状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    /// 已广播，尚未打包
    Pending,
    /// 已打包且执行成功
    Confirmed,
    /// 已打包但执行回滚
    Reverted,
}

/// 提交回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tx_hash: String,
    pub status: ConfirmationStatus,
    pub block_number: Option<u64>,
}

impl SubmissionReceipt {
    /// 广播后的初始回执
    pub fn pending(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            status: ConfirmationStatus::Pending,
            block_number: None,
        }
    }

    pub fn confirm(&mut self, block_number: Option<u64>) {
        self.status = ConfirmationStatus::Confirmed;
        self.block_number = block_number;
    }

    pub fn revert(&mut self, block_number: Option<u64>) {
        self.status = ConfirmationStatus::Reverted;
        self.block_number = block_number;
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ConfirmationStatus::Confirmed
    }
}
