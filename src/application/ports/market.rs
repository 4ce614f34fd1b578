//! Market Resolver Port - 预测市场结算抽象

use alloy::primitives::B256;
use async_trait::async_trait;

use super::SubmissionError;
use crate::domain::{Decision, SubmissionReceipt};

#[async_trait]
pub trait MarketResolverPort: Send + Sync {
    /// 按决策结算市场
    async fn resolve_market(
        &self,
        market_id: B256,
        decision: Decision,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}
