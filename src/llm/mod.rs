//! LLM integration — the classifier port and its rig-backed adapter.
//!
//! Uses rig-core's OpenAI client in chat-completions mode, so any server
//! exposing `/chat/completions` works (OpenAI, Ollama, llama.cpp, vLLM,
//! LM Studio). The base URL and model come from configuration.

mod rig_adapter;

pub use rig_adapter::RigClassifier;

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Provider name used in errors and logs.
pub const PROVIDER: &str = "openai-compatible";

/// Default sampling temperature (near-deterministic).
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text-completion capability used to classify messages.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Model identifier this classifier talks to.
    fn model_name(&self) -> &str;

    /// Run one completion. `Ok(None)` means the model produced no usable text.
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, LlmError>;
}

/// Configuration for creating a classifier.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub temperature: f32,
}

/// Create a classifier from configuration.
pub fn create_classifier(config: &LlmConfig) -> Result<Arc<dyn Classifier>, LlmError> {
    use rig::providers::openai;

    let base_url = config.base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        return Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "base URL must not be empty".to_string(),
        });
    }

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::builder()
            .api_key(config.api_key.expose_secret())
            .base_url(base_url)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create OpenAI-compatible client: {}", e),
            })?;

    // Local model servers speak chat completions, not the Responses API.
    let model = client.completions_api().completion_model(&config.model);
    tracing::info!(
        base_url,
        "Using OpenAI-compatible endpoint (model: {})",
        config.model
    );
    Ok(Arc::new(RigClassifier::new(model, &config.model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_defaults_temperature() {
        let request = CompletionRequest::new("classify");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.with_temperature(0.7).temperature, 0.7);
    }

    #[test]
    fn create_classifier_with_local_endpoint() {
        // rig clients accept any key at construction; auth fails on request.
        let config = LlmConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: secrecy::SecretString::from("sk-local-key"),
            model: "gemma3".to_string(),
            temperature: 0.1,
        };
        let classifier = create_classifier(&config).unwrap();
        assert_eq!(classifier.model_name(), "gemma3");
    }

    #[test]
    fn create_classifier_rejects_empty_base_url() {
        let config = LlmConfig {
            base_url: "  ".to_string(),
            api_key: secrecy::SecretString::from("sk"),
            model: "gemma3".to_string(),
            temperature: 0.1,
        };
        assert!(create_classifier(&config).is_err());
    }
}
