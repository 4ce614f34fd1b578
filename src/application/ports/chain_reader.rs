//! Chain Reader Port - 链上任务读取抽象
//!
//! 查询预言机合约中待处理的任务（只读调用，无 gas）

use async_trait::async_trait;
use thiserror::Error;

use crate::application::retry::Retryable;
use crate::domain::Task;

/// 链读取错误
#[derive(Debug, Error)]
pub enum ChainError {
    /// 节点不可达 / 传输层失败
    #[error("Connection error: {0}")]
    Connection(String),

    /// 调用 revert、返回数据无法解码、地址无合约代码
    #[error("Contract error: {0}")]
    Contract(String),
}

impl Retryable for ChainError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Chain Reader Port
#[async_trait]
pub trait ChainReaderPort: Send + Sync {
    /// 列出待处理任务
    ///
    /// 按合约定义的顺序（task index 升序）返回；没有任务时返回空列表
    async fn list_pending_tasks(&self) -> Result<Vec<Task>, ChainError>;

    /// 启动时校验合约地址
    async fn verify_contract(&self) -> Result<(), ChainError> {
        Ok(()) // 默认实现
    }
}
