//! Oracle Reader - 从 AIOracleServiceManager 读取待处理任务
//!
//! 实现 ChainReaderPort trait
//!
//! 读取流程:
//! 1. latestTaskNum()，为 0 时返回空列表
//! 2. 查询 NewTaskCreated 事件，按 task index 取任务文本
//! 3. 逐个读取 taskStatus / taskRespondents，过滤已解决或已由本账户回答的任务

use alloy::primitives::Address;
use alloy::providers::DynProvider;
use async_trait::async_trait;
use std::collections::HashMap;

use super::connection::{classify_call_error, ChainConnection};
use super::contracts::IAIOracleServiceManager::{self, IAIOracleServiceManagerInstance};
use crate::application::ports::{ChainError, ChainReaderPort};
use crate::domain::{Task, TaskId, TaskStatus};

/// 事件中携带的任务结构
type ChainTask = IAIOracleServiceManager::Task;

pub struct AlloyOracleReader {
    connection: ChainConnection,
    oracle: IAIOracleServiceManagerInstance<DynProvider>,
    /// 事件查询起始区块
    from_block: u64,
}

impl AlloyOracleReader {
    pub fn new(connection: ChainConnection, oracle_address: Address, from_block: u64) -> Self {
        let oracle = IAIOracleServiceManager::new(oracle_address, connection.provider().clone());
        Self {
            connection,
            oracle,
            from_block,
        }
    }

    pub fn oracle_address(&self) -> Address {
        *self.oracle.address()
    }

    async fn latest_task_num_once(&self) -> Result<u32, ChainError> {
        self.oracle
            .latestTaskNum()
            .call()
            .await
            .map_err(classify_call_error)
    }

    async fn created_tasks_once(&self) -> Result<HashMap<u32, ChainTask>, ChainError> {
        let events = self
            .oracle
            .NewTaskCreated_filter()
            .from_block(self.from_block)
            .query()
            .await
            .map_err(classify_call_error)?;

        Ok(events
            .into_iter()
            .map(|(event, _log)| (event.taskIndex, event.task))
            .collect())
    }

    async fn task_status_once(&self, index: u32) -> Result<u8, ChainError> {
        self.oracle
            .taskStatus(index)
            .call()
            .await
            .map_err(classify_call_error)
    }

    async fn respondents_once(&self, index: u32) -> Result<Vec<Address>, ChainError> {
        self.oracle
            .taskRespondents(index)
            .call()
            .await
            .map_err(classify_call_error)
    }

    /// 读取单个任务；不需要处理时返回 None
    async fn read_task(
        &self,
        index: u32,
        created: &HashMap<u32, ChainTask>,
    ) -> Result<Option<Task>, ChainError> {
        let retry = self.connection.retry();

        let code = retry
            .run("oracle.taskStatus", || self.task_status_once(index))
            .await?;
        let status = TaskStatus::from_chain_code(code)
            .map_err(|e| ChainError::Contract(format!("Task {}: {}", index, e)))?;
        if !status.is_pending() {
            return Ok(None);
        }

        if let Some(account) = self.connection.account() {
            let respondents = retry
                .run("oracle.taskRespondents", || self.respondents_once(index))
                .await?;
            if respondents.contains(&account) {
                tracing::debug!(task_id = index, "Already responded to task, skipping");
                return Ok(None);
            }
        }

        let Some(chain_task) = created.get(&index) else {
            tracing::warn!(
                task_id = index,
                from_block = self.from_block,
                "No NewTaskCreated event found for task, skipping"
            );
            return Ok(None);
        };

        let task = Task::new(
            TaskId::new(index),
            chain_task.name.clone(),
            status,
            chain_task.taskCreatedBlock,
        )
        .map_err(|e| ChainError::Contract(format!("Task {}: {}", index, e)))?;

        Ok(Some(task))
    }
}

#[async_trait]
impl ChainReaderPort for AlloyOracleReader {
    async fn list_pending_tasks(&self) -> Result<Vec<Task>, ChainError> {
        let retry = self.connection.retry();

        let latest = retry
            .run("oracle.latestTaskNum", || self.latest_task_num_once())
            .await?;
        if latest == 0 {
            tracing::debug!("No tasks on oracle");
            return Ok(Vec::new());
        }

        let created = retry
            .run("oracle.NewTaskCreated", || self.created_tasks_once())
            .await?;

        let mut tasks = Vec::new();
        for index in 0..latest {
            match self.read_task(index, &created).await {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(task_id = index, error = %e, "Failed to read task, skipping");
                }
            }
        }

        tracing::debug!(latest, pending = tasks.len(), "Listed oracle tasks");
        Ok(tasks)
    }

    async fn verify_contract(&self) -> Result<(), ChainError> {
        self.connection.ensure_code(self.oracle_address()).await
    }
}
