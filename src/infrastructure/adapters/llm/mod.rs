//! LLM Adapter - OpenRouter 客户端实现

mod openrouter_client;

pub use openrouter_client::*;
