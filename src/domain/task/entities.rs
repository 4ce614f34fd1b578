//! Task Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Decision, TaskError, TaskId, TaskStatus};

/// 预言机任务
///
/// 由链上合约在用户请求推理时创建，Agent 只读
///
/// 不变量:
/// - prompt 不可为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    /// 任务名称（即问题文本）
    prompt: String,
    status: TaskStatus,
    /// 任务创建所在区块
    created_block: u32,
    /// 可选截止时间
    deadline: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: TaskId,
        prompt: impl Into<String>,
        status: TaskStatus,
        created_block: u32,
    ) -> Result<Self, TaskError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(TaskError::EmptyPrompt);
        }
        Ok(Self {
            id,
            prompt,
            status,
            created_block,
            deadline: None,
        })
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_block(&self) -> u32 {
        self.created_block
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// 截止时间已过
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|d| d <= now).unwrap_or(false)
    }
}

/// LLM 生成的答案，仅在提交前保存在内存中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub task_id: TaskId,
    /// LLM 原始输出
    pub text: String,
    pub decision: Decision,
    /// 生成答案的模型
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(task_id: TaskId, text: impl Into<String>, model: impl Into<String>) -> Self {
        let text = text.into();
        let decision = Decision::extract(&text);
        Self {
            task_id,
            text,
            decision,
            model: model.into(),
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_rejects_empty_prompt() {
        let result = Task::new(TaskId::new(0), "   ", TaskStatus::Pending, 1);
        assert_eq!(result, Err(TaskError::EmptyPrompt));
    }

    #[test]
    fn test_task_expiry() {
        let now = Utc::now();
        let task = Task::new(TaskId::new(3), "Will it rain?", TaskStatus::Pending, 10).unwrap();
        assert!(!task.is_expired(now));

        let expired = task.clone().with_deadline(now - Duration::seconds(1));
        assert!(expired.is_expired(now));

        let open = task.with_deadline(now + Duration::hours(1));
        assert!(!open.is_expired(now));
    }

    #[test]
    fn test_answer_extracts_decision() {
        let answer = Answer::new(TaskId::new(1), "YES - adoption keeps growing", "openai/gpt-4o");
        assert_eq!(answer.decision, Decision::Yes);
        assert_eq!(answer.model, "openai/gpt-4o");
        assert_eq!(answer.task_id, TaskId::new(1));
    }
}
