//! OpenRouter Client - 调用 OpenRouter chat completions API
//!
//! 实现 LlmClientPort trait
//!
//! 外部 API:
//! POST {base_url}/chat/completions
//! Request: {"model": "...", "messages": [{"role": "...", "content": "..."}]}
//! Response: {"choices": [{"message": {"content": "..."}}]}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{GenerationError, LlmClientPort};
use crate::application::RetryPolicy;

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// `GET /models` 的两种返回形态
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelsResponse {
    Wrapped { data: Vec<ModelEntry> },
    Bare(Vec<ModelEntry>),
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// OpenRouter 客户端配置
#[derive(Debug, Clone)]
pub struct OpenRouterClientConfig {
    /// API 基础 URL
    pub base_url: String,
    pub api_key: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// HTTP-Referer 请求头
    pub referer: String,
    /// X-Title 请求头
    pub title: String,
}

impl OpenRouterClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 60,
            referer: "https://eigenlayer-ai-agent.com".to_string(),
            title: "EigenLayer AI Agent".to_string(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// OpenRouter 客户端
pub struct OpenRouterClient {
    client: Client,
    config: OpenRouterClientConfig,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterClientConfig, retry: RetryPolicy) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    /// 单次请求，不含重试
    async fn complete_once(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Malformed body: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No choices in response".to_string()))
    }

    async fn list_models_once(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(self.models_url())
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;

        let body: ModelsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Malformed model list: {}", e)))?;

        let entries = match body {
            ModelsResponse::Wrapped { data } => data,
            ModelsResponse::Bare(entries) => entries,
        };
        Ok(entries.into_iter().map(|m| m.id).collect())
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else if e.is_connect() {
        GenerationError::Network(format!("Cannot connect to OpenRouter: {}", e))
    } else {
        GenerationError::Network(e.to_string())
    }
}

/// 非 2xx 响应转为错误；401/403 为鉴权失败
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&error_text)
        .map(|b| b.error.message)
        .unwrap_or(error_text);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GenerationError::Auth(message));
    }

    Err(GenerationError::Service {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl LlmClientPort for OpenRouterClient {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        tracing::debug!(
            url = %self.completions_url(),
            model,
            prompt_len = prompt.len(),
            "Sending chat completion request"
        );

        let text = self
            .retry
            .run("llm.generate", || self.complete_once(prompt, model))
            .await?;

        tracing::info!(model, response_len = text.len(), "LLM generation completed");
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        self.retry
            .run("llm.list_models", || self.list_models_once())
            .await
    }
}
