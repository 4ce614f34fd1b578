//! Registry Client - AIAgentRegistry 读写
//!
//! 实现 RegistryPort trait

use alloy::primitives::Address;
use alloy::providers::DynProvider;
use async_trait::async_trait;

use super::connection::{classify_call_error, ChainConnection};
use super::contracts::IAIAgentRegistry::{self, IAIAgentRegistryInstance};
use crate::application::ports::{AgentDetails, ChainError, RegistryError, RegistryPort};
use crate::domain::SubmissionReceipt;

pub struct AlloyRegistryClient {
    connection: ChainConnection,
    registry: IAIAgentRegistryInstance<DynProvider>,
}

impl AlloyRegistryClient {
    pub fn new(connection: ChainConnection, registry_address: Address) -> Self {
        let registry = IAIAgentRegistry::new(registry_address, connection.provider().clone());
        Self {
            connection,
            registry,
        }
    }

    async fn is_registered_once(&self, agent: Address) -> Result<bool, ChainError> {
        self.registry
            .isRegistered(agent)
            .call()
            .await
            .map_err(classify_call_error)
    }

    async fn all_agents_once(&self) -> Result<Vec<Address>, ChainError> {
        self.registry
            .getAllAgents()
            .call()
            .await
            .map_err(classify_call_error)
    }

    async fn agent_details_once(&self, agent: Address) -> Result<AgentDetails, ChainError> {
        let details = self
            .registry
            .getAgentDetails(agent)
            .call()
            .await
            .map_err(classify_call_error)?;

        Ok(AgentDetails {
            model_type: details.modelType,
            model_version: details.modelVersion,
            tasks_completed: details.tasksCompleted,
            consensus_participations: details.consensusParticipations,
            rewards_earned: details.rewardsEarned,
        })
    }
}

#[async_trait]
impl RegistryPort for AlloyRegistryClient {
    async fn is_registered(&self, agent: Address) -> Result<bool, RegistryError> {
        let registered = self
            .connection
            .retry()
            .run("registry.isRegistered", || self.is_registered_once(agent))
            .await?;
        Ok(registered)
    }

    async fn register(&self, agent: Address) -> Result<SubmissionReceipt, RegistryError> {
        let request = self.registry.registerAgent(agent).into_transaction_request();
        let (submission, _receipt) = self
            .connection
            .send_and_confirm(request, "registerAgent")
            .await?;
        tracing::info!(agent = %agent, tx_hash = %submission.tx_hash, "Agent registered");
        Ok(submission)
    }

    async fn list_agents(&self) -> Result<Vec<Address>, RegistryError> {
        let agents = self
            .connection
            .retry()
            .run("registry.getAllAgents", || self.all_agents_once())
            .await?;
        Ok(agents)
    }

    async fn agent_details(&self, agent: Address) -> Result<AgentDetails, RegistryError> {
        let details = self
            .connection
            .retry()
            .run("registry.getAgentDetails", || self.agent_details_once(agent))
            .await?;
        Ok(details)
    }
}
