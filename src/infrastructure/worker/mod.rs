//! Worker Layer - 后台轮询
//!
//! 实现 PollWorker：拉取链上任务，调用 LLM，提交答案

mod poll_worker;

pub use poll_worker::{PassReport, PollState, PollWorker, PollWorkerConfig, RunSummary};
