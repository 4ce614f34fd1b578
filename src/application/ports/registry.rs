//! Registry Port - Agent 注册表抽象

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

use super::{ChainError, SubmissionError};
use crate::domain::SubmissionReceipt;

/// 注册表错误（启动阶段仅记录日志，不致命）
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry read failed: {0}")]
    Read(#[from] ChainError),

    #[error("Registration failed: {0}")]
    Write(#[from] SubmissionError),
}

/// Agent 详情
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDetails {
    pub model_type: String,
    pub model_version: String,
    pub tasks_completed: U256,
    pub consensus_participations: U256,
    pub rewards_earned: U256,
}

/// Registry Port
#[async_trait]
pub trait RegistryPort: Send + Sync {
    async fn is_registered(&self, agent: Address) -> Result<bool, RegistryError>;

    async fn register(&self, agent: Address) -> Result<SubmissionReceipt, RegistryError>;

    async fn list_agents(&self) -> Result<Vec<Address>, RegistryError>;

    async fn agent_details(&self, agent: Address) -> Result<AgentDetails, RegistryError>;
}
