//! LLM Client Port - 大模型推理抽象

use async_trait::async_trait;
use thiserror::Error;

use crate::application::retry::Retryable;

/// 生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    /// API key 无效，不可重试
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            Self::Auth(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// LLM Client Port
///
/// 无本地状态，只有一次出站请求
#[async_trait]
pub trait LlmClientPort: Send + Sync {
    /// 使用指定模型为提示词生成文本
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError>;

    /// 列出可用模型
    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        Ok(Vec::new()) // 默认实现
    }
}
