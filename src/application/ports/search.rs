//! Search Port - 网页搜索抽象（用于提示词增强）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::SearchSnippet;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Search service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Search Port
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, SearchError>;
}
