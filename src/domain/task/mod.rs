//! Task Context - 预言机任务限界上下文
//!
//! 职责:
//! - 任务标识与链上状态映射
//! - LLM 答案及其 YES/NO 决策

mod entities;
mod errors;
mod value_objects;

pub use entities::{Answer, Task};
pub use errors::TaskError;
pub use value_objects::{Decision, TaskId, TaskStatus};
