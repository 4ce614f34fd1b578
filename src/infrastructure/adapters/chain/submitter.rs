//! Response Submitter - 答案上链
//!
//! 实现 ResponseSubmitterPort trait
//!
//! 两种目标（启动时确定）:
//! - 配置了 AIAgent 地址：`AIAgent.processTask(taskIndex, decision)`
//! - 否则：`AIOracleServiceManager.respondToTask(task, taskIndex, signature)`，
//!   signature 为 keccak256("Hello, " + name) 的 EIP-191 签名

use alloy::primitives::{keccak256, Address, Bytes};
use alloy::providers::DynProvider;
use alloy::signers::Signer;
use async_trait::async_trait;

use super::connection::ChainConnection;
use super::contracts::IAIAgent::{self, IAIAgentInstance};
use super::contracts::IAIOracleServiceManager::{self, IAIOracleServiceManagerInstance};
use crate::application::ports::{ResponseSubmitterPort, SubmissionError};
use crate::domain::{Answer, SubmissionReceipt, Task, TaskId};

/// 答案提交目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTarget {
    /// 直接回应预言机
    Oracle,
    /// 通过 AIAgent 合约记录决策
    Agent(Address),
}

pub struct AlloyResponseSubmitter {
    connection: ChainConnection,
    oracle: IAIOracleServiceManagerInstance<DynProvider>,
    agent: Option<IAIAgentInstance<DynProvider>>,
}

impl AlloyResponseSubmitter {
    pub fn new(connection: ChainConnection, oracle_address: Address, target: SubmissionTarget) -> Self {
        let provider = connection.provider().clone();
        let oracle = IAIOracleServiceManager::new(oracle_address, provider.clone());
        let agent = match target {
            SubmissionTarget::Agent(address) => Some(IAIAgent::new(address, provider)),
            SubmissionTarget::Oracle => None,
        };
        Self {
            connection,
            oracle,
            agent,
        }
    }

    pub fn target(&self) -> SubmissionTarget {
        match &self.agent {
            Some(agent) => SubmissionTarget::Agent(*agent.address()),
            None => SubmissionTarget::Oracle,
        }
    }

    /// 对任务名称签名
    async fn sign_task_name(&self, name: &str) -> Result<Bytes, SubmissionError> {
        let signer = self.connection.require_signer()?;
        let hash = keccak256(format!("Hello, {}", name).as_bytes());
        let signature = signer
            .sign_message(hash.as_slice())
            .await
            .map_err(|e| SubmissionError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    /// 在预言机上创建新任务
    ///
    /// 返回回执与事件中的任务编号（事件缺失时为 None）
    pub async fn create_task(
        &self,
        name: &str,
    ) -> Result<(SubmissionReceipt, Option<TaskId>), SubmissionError> {
        let request = self
            .oracle
            .createNewTask(name.to_string())
            .into_transaction_request();
        let (submission, receipt) = self
            .connection
            .send_and_confirm(request, "createNewTask")
            .await?;

        let task_id = receipt.inner.logs().iter().find_map(|log| {
            log.log_decode::<IAIOracleServiceManager::NewTaskCreated>()
                .ok()
                .map(|decoded| TaskId::new(decoded.inner.data.taskIndex))
        });
        if task_id.is_none() {
            tracing::warn!(tx_hash = %submission.tx_hash, "NewTaskCreated event not found in receipt");
        }

        Ok((submission, task_id))
    }
}

#[async_trait]
impl ResponseSubmitterPort for AlloyResponseSubmitter {
    async fn submit_answer(
        &self,
        task: &Task,
        answer: &Answer,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let task_index = task.id().value();

        let (request, label) = match &self.agent {
            Some(agent) => (
                agent
                    .processTask(task_index, answer.decision.as_bool())
                    .into_transaction_request(),
                "processTask",
            ),
            None => {
                let signature = self.sign_task_name(task.prompt()).await?;
                let chain_task = IAIOracleServiceManager::Task {
                    name: task.prompt().to_string(),
                    taskCreatedBlock: task.created_block(),
                };
                (
                    self.oracle
                        .respondToTask(chain_task, task_index, signature)
                        .into_transaction_request(),
                    "respondToTask",
                )
            }
        };

        tracing::debug!(
            task_id = %task.id(),
            decision = %answer.decision,
            call = label,
            "Submitting answer"
        );

        let (submission, _receipt) = self.connection.send_and_confirm(request, label).await?;
        Ok(submission)
    }

    async fn submission_status(
        &self,
        tx_hash: &str,
    ) -> Result<Option<SubmissionReceipt>, SubmissionError> {
        self.connection.transaction_status(tx_hash).await
    }
}
