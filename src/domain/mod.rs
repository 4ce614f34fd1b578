//! Domain Layer - 领域层
//!
//! 包含:
//! - Task Context: 链上预言机任务、答案与 YES/NO 决策
//! - Submission: 交易回执与确认状态
//! - Prompt: 提示词构建与搜索上下文格式化

pub mod submission;
pub mod task;

// 共享的提示词构建
mod prompt;

pub use prompt::{build_prompt, format_search_context, is_prediction_market_question, SearchSnippet};
pub use submission::{ConfirmationStatus, SubmissionReceipt};
pub use task::{Answer, Decision, Task, TaskError, TaskId, TaskStatus};
