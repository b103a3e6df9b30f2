//! Reply-composition assistant client
//!
//! Thin wrapper over an OpenAI-style chat-completion endpoint, dispatched
//! through the shared [`RequestExecutor`] so quota exhaustion pauses all
//! composition traffic at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::executor::{ProviderProfile, QuotaSignal, RequestDescriptor, RequestExecutor};

/// Assistant endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Response classification for this provider
    pub profile: ProviderProfile,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            profile: ProviderProfile::named("assistant").with_quota(QuotaSignal::default()),
        }
    }
}

/// Chat-completion client
pub struct AssistantClient {
    executor: Arc<RequestExecutor>,
    config: AssistantConfig,
    api_key: String,
}

impl AssistantClient {
    /// Create a client, reading the API key from the configured environment
    /// variable.
    pub fn from_config(executor: Arc<RequestExecutor>, config: AssistantConfig) -> eyre::Result<Self> {
        debug!(model = %config.model, "AssistantClient::from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| eyre::eyre!("assistant API key not found; set the {} environment variable", config.api_key_env))?;

        Ok(Self {
            executor,
            config,
            api_key,
        })
    }

    /// Ask for a completion of the given prompt.
    ///
    /// An empty reply is returned as an empty string; the caller decides how
    /// to treat it.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(model = %self.config.model, prompt_len = prompt.len(), "AssistantClient::complete: called");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
        });

        let descriptor = RequestDescriptor::post(format!("{}/v1/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.executor.call_timeout())
            .label("POST chat completion")
            .json(body);

        let payload = self.executor.execute(&descriptor).await.into_result()?;
        let response: ChatResponse = payload.json()?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if reply.is_empty() {
            warn!("AssistantClient::complete: empty reply from model");
        }
        Ok(reply)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
