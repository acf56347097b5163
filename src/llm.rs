use crate::config::LLMConfig;
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::{AnalyzerError, Result, SummarizationError, PLACEHOLDER_API_KEY};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Default OpenAI-compatible API base.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Produces a free-text summary of crawled content.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Whether a usable credential is configured.
    fn has_credential(&self) -> bool;

    /// Summarizes `content` about `topic`. Never fails: problems come back as a
    /// readable `Error: ...` string.
    async fn summarize(&self, content: &str, topic: &str) -> String;
}

/// Returns `false` for empty keys and the sample placeholder.
pub fn is_usable_api_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The `LLMProcessor` calls an OpenAI-compatible chat completions endpoint.
pub struct LLMProcessor {
    client: Client,
    config: LLMConfig,
}

impl LLMProcessor {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(AnalyzerError::RequestError)?;
        if !is_usable_api_key(&config.api_key) {
            tracing::warn!("LLM API key is missing or a placeholder; summaries are disabled");
        } else {
            info!(model = %config.model, "LLM processor initialized");
        }
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// Sends one chat completion request.
    #[instrument(skip(self, content), fields(content_length = content.len()))]
    pub async fn try_summarize(
        &self,
        content: &str,
        topic: &str,
    ) -> std::result::Result<String, SummarizationError> {
        if !self.has_credential() {
            return Err(SummarizationError::NoCredential);
        }
        if content.trim().is_empty() {
            return Err(SummarizationError::EmptyContent);
        }

        let prompt = PromptBuilder::new(topic)
            .with_content(content)
            .with_max_content_chars(self.config.max_content_chars)
            .build();
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizationError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationError::Service(format!(
                "status {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizationError::Service(e.to_string()))?;

        let summary = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if summary.is_empty() {
            Ok(String::from("Summary is empty."))
        } else {
            Ok(summary)
        }
    }
}

#[async_trait]
impl Summarizer for LLMProcessor {
    fn has_credential(&self) -> bool {
        is_usable_api_key(&self.config.api_key)
    }

    async fn summarize(&self, content: &str, topic: &str) -> String {
        match self.try_summarize(content, topic).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "LLM summarization failed");
                format!("Error: {}", e)
            }
        }
    }
}
