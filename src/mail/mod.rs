//! Mail provider port.
//!
//! The pipeline only needs five operations from the inbox; `GmailClient` is
//! the production implementation, tests use in-memory fakes.

pub mod auth;
pub mod gmail;
pub mod types;

pub use auth::GmailAuth;
pub use gmail::GmailClient;
pub use types::{MailMessage, MessagePart, MessageStub, PartBody, ProviderLabel};

use async_trait::async_trait;

use crate::error::ProviderError;

/// Inbox capabilities consumed by the classification pipeline.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List up to `max_results` unread messages, newest first.
    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageStub>, ProviderError>;

    /// Fetch a message with its full MIME payload.
    async fn get_message(&self, id: &str) -> Result<MailMessage, ProviderError>;

    /// List every label defined on the account.
    async fn list_labels(&self) -> Result<Vec<ProviderLabel>, ProviderError>;

    /// Create a label and return its id.
    ///
    /// Fails with [`ProviderError::Conflict`] when the name is already taken.
    async fn create_label(&self, name: &str) -> Result<String, ProviderError>;

    /// Add and remove label ids on a message. Re-adding a present label is a
    /// no-op on the provider side.
    async fn modify_labels(
        &self,
        id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<(), ProviderError>;
}
