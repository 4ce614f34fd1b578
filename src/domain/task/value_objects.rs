//! Task Context - Value Objects

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::TaskError;

/// 任务唯一标识（预言机合约中的 task index）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u32);

impl TaskId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for TaskId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态（Agent 视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// 尚无答案
    Pending,
    /// 已有答案（链上已 resolve）
    Answered,
    /// 处理失败
    Failed,
}

impl TaskStatus {
    /// 链上状态码映射
    ///
    /// - 0 = Created, 1 = InProgress → Pending
    /// - 2 = Resolved → Answered
    pub fn from_chain_code(code: u8) -> Result<Self, TaskError> {
        match code {
            0 | 1 => Ok(Self::Pending),
            2 => Ok(Self::Answered),
            other => Err(TaskError::UnknownStatus(other)),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// 预测市场决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    /// 从 LLM 输出中提取决策
    ///
    /// 取去除首尾空白后的第一个单词（忽略大小写）；
    /// 既不是 YES 也不是 NO 时默认返回 NO
    pub fn extract(text: &str) -> Self {
        let leading: String = text
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        match leading.to_ascii_uppercase().as_str() {
            "YES" => Self::Yes,
            "NO" => Self::No,
            _ => {
                let preview: String = text.chars().take(100).collect();
                tracing::warn!(
                    response = %preview,
                    "Could not extract YES/NO from response, defaulting to NO"
                );
                Self::No
            }
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Yes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

impl FromStr for Decision {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "y" => Ok(Self::Yes),
            "no" | "false" | "n" => Ok(Self::No),
            other => Err(TaskError::InvalidDecision(other.to_string())),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
