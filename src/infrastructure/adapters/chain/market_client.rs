//! Market Resolver - PredictionMarketHook 结算

use alloy::primitives::{Address, B256};
use alloy::providers::DynProvider;
use async_trait::async_trait;

use super::connection::ChainConnection;
use super::contracts::IPredictionMarketHook::{self, IPredictionMarketHookInstance};
use crate::application::ports::{MarketResolverPort, SubmissionError};
use crate::domain::{Decision, SubmissionReceipt};

pub struct AlloyMarketResolver {
    connection: ChainConnection,
    hook: IPredictionMarketHookInstance<DynProvider>,
}

impl AlloyMarketResolver {
    pub fn new(connection: ChainConnection, market_address: Address) -> Self {
        let hook = IPredictionMarketHook::new(market_address, connection.provider().clone());
        Self { connection, hook }
    }
}

#[async_trait]
impl MarketResolverPort for AlloyMarketResolver {
    async fn resolve_market(
        &self,
        market_id: B256,
        decision: Decision,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        tracing::info!(market_id = %market_id, decision = %decision, "Resolving market");
        let request = self
            .hook
            .resolveMarket(market_id, decision.as_bool())
            .into_transaction_request();
        let (submission, _receipt) = self
            .connection
            .send_and_confirm(request, "resolveMarket")
            .await?;
        Ok(submission)
    }
}
