//! Gmail REST adapter for the `MailProvider` port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::mail::auth::GmailAuth;
use crate::mail::{MailMessage, MailProvider, MessageStub, ProviderLabel};

/// Public Gmail API host.
pub const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";

/// Retries after a rate-limit response before giving up.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Upper bound on the wait between rate-limit retries.
const MAX_BACKOFF_SECS: u64 = 32;

/// Gmail API client scoped to the authorized user (`userId=me`).
pub struct GmailClient {
    client: reqwest::Client,
    base_url: String,
    auth: GmailAuth,
}

impl GmailClient {
    pub fn new(auth: GmailAuth) -> Self {
        Self::with_base_url(auth, DEFAULT_GMAIL_BASE_URL)
    }

    /// Point the client at a different API host (trailing slash ignored).
    pub fn with_base_url(auth: GmailAuth, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{path}", self.base_url)
    }

    /// Send a request, retrying on rate limits, and return the successful body.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<String, ProviderError> {
        let token = self.auth.access_token().await?;
        let url = self.url(path);
        let mut backoff_secs = 1u64;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .header("accept", "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| ProviderError::RequestFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

            let status = response.status();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());

            let text = response.text().await.map_err(|e| ProviderError::RequestFailed {
                operation: operation.to_string(),
                reason: format!("failed to read response body: {e}"),
            })?;

            if status.is_success() {
                return Ok(text);
            }

            if is_rate_limited(status, &text) {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    return Err(ProviderError::RateLimited {
                        operation: operation.to_string(),
                        retry_after: retry_after.map(Duration::from_secs),
                    });
                }

                let wait = retry_wait(retry_after, backoff_secs);
                warn!(
                    operation,
                    attempt,
                    status = status.as_u16(),
                    wait_secs = wait.as_secs(),
                    "Gmail rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(format!(
                    "{operation} returned HTTP {}: {}",
                    status.as_u16(),
                    truncate(&text, 200)
                )),
                _ => ProviderError::Status {
                    operation: operation.to_string(),
                    status: status.as_u16(),
                    body: truncate(&text, 500),
                },
            });
        }

        // The loop either returns or continues; the last attempt always returns.
        Err(ProviderError::RateLimited {
            operation: operation.to_string(),
            retry_after: None,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T, ProviderError> {
        let text = self.send(operation, method, path, query, body).await?;
        serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Deserialize)]
struct ListLabelsResponse {
    #[serde(default)]
    labels: Vec<ProviderLabel>,
}

#[derive(Deserialize)]
struct CreatedLabel {
    id: Option<String>,
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageStub>, ProviderError> {
        let response: ListMessagesResponse = self
            .send_json(
                "list_unread",
                Method::GET,
                "messages",
                &[
                    ("q", "is:unread".to_string()),
                    ("maxResults", max_results.to_string()),
                ],
                None,
            )
            .await?;
        debug!(count = response.messages.len(), "Listed unread messages");
        Ok(response.messages)
    }

    async fn get_message(&self, id: &str) -> Result<MailMessage, ProviderError> {
        let result = self
            .send_json(
                "get_message",
                Method::GET,
                &format!("messages/{id}"),
                &[("format", "full".to_string())],
                None,
            )
            .await;
        match result {
            Err(ProviderError::Status { status: 404, .. }) => {
                Err(ProviderError::NotFound { id: id.to_string() })
            }
            other => other,
        }
    }

    async fn list_labels(&self) -> Result<Vec<ProviderLabel>, ProviderError> {
        let response: ListLabelsResponse = self
            .send_json("list_labels", Method::GET, "labels", &[], None)
            .await?;
        Ok(response.labels)
    }

    async fn create_label(&self, name: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show",
        });
        let result: Result<CreatedLabel, ProviderError> = self
            .send_json("create_label", Method::POST, "labels", &[], Some(&body))
            .await;

        match result {
            Ok(CreatedLabel { id: Some(id) }) if !id.is_empty() => Ok(id),
            Ok(_) => Err(ProviderError::InvalidResponse {
                operation: "create_label".into(),
                reason: "response has no label id".into(),
            }),
            Err(ProviderError::Status { status: 409, .. }) => Err(ProviderError::Conflict {
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn modify_labels(
        &self,
        id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<(), ProviderError> {
        let body = serde_json::json!({
            "addLabelIds": add_label_ids,
            "removeLabelIds": remove_label_ids,
        });
        self.send(
            "modify_labels",
            Method::POST,
            &format!("messages/{id}/modify"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }
}

/// Error reasons Gmail sends with a 403 when a usage limit, not a
/// permission, is the problem.
const RATE_LIMIT_REASONS: [&str; 2] = ["rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

/// 429, or a 403 whose error reason is a usage limit.
fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| {
            envelope.error.errors.iter().any(|item| {
                item.reason
                    .as_deref()
                    .is_some_and(|reason| RATE_LIMIT_REASONS.contains(&reason))
            })
        })
        .unwrap_or(false)
}

/// Delay before the next retry: the server's `Retry-After` if given,
/// otherwise the current backoff. Never more than `MAX_BACKOFF_SECS`.
fn retry_wait(retry_after: Option<u64>, backoff_secs: u64) -> Duration {
    Duration::from_secs(retry_after.unwrap_or(backoff_secs).min(MAX_BACKOFF_SECS))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
