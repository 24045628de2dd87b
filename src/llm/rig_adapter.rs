//! Bridges rig's `CompletionModel` to the `Classifier` port.

use async_trait::async_trait;
use rig::OneOrMany;
use rig::completion::{AssistantContent, CompletionError, CompletionModel};

use crate::error::LlmError;
use crate::llm::{Classifier, CompletionRequest, PROVIDER};

/// Fragments of provider error text that mean "slow down".
const RATE_LIMIT_MARKERS: [&str; 4] = ["429", "rate limit", "rate_limit", "too many requests"];

/// Fragments of provider error text that mean the key was rejected.
const AUTH_MARKERS: [&str; 7] = [
    "401",
    "403",
    "unauthorized",
    "forbidden",
    "invalid_api_key",
    "incorrect api key",
    "invalid api key",
];

/// Classifier backed by any rig completion model.
pub struct RigClassifier<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigClassifier<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M> Classifier for RigClassifier<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, LlmError> {
        let response = self
            .model
            .completion_request(request.prompt)
            .temperature(f64::from(request.temperature))
            .send()
            .await
            .map_err(map_completion_error)?;

        Ok(response_text(&response.choice))
    }
}

/// Text parts of the reply joined and trimmed; `None` when nothing is left.
fn response_text(choice: &OneOrMany<AssistantContent>) -> Option<String> {
    let text: String = choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn map_completion_error(error: CompletionError) -> LlmError {
    let reason = error.to_string();
    if matches!(
        error,
        CompletionError::JsonError(_) | CompletionError::ResponseError(_)
    ) {
        return LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason,
        };
    }

    let lower = reason.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after: None,
        }
    } else if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason,
        }
    }
}
