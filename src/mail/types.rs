//! Provider-neutral message and label types.
//!
//! Field names follow the Gmail REST representation so the adapter can
//! deserialize straight into them; every field is optional because the
//! provider omits whatever is empty.

use serde::{Deserialize, Serialize};

/// An entry from the unread listing. Only the id matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl MessageStub {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            thread_id: None,
        }
    }

    /// The id, if present and non-empty.
    pub fn message_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A fully fetched message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// One node of the MIME tree. The root payload is a part too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    /// A leaf part with base64url-encoded body data.
    pub fn leaf(mime_type: &str, data: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            body: Some(PartBody {
                data: Some(data.into()),
                size: None,
            }),
            parts: None,
        }
    }

    /// A container part holding `parts` in order.
    pub fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            body: None,
            parts: Some(parts),
        }
    }

    /// Encoded body data, if any.
    pub fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Whether the declared media type is `text/plain` (parameters ignored).
    pub fn is_plain_text(&self) -> bool {
        self.mime_type.as_deref().is_some_and(|mime| {
            mime.split(';')
                .next()
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/plain"))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A label as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLabel {
    pub id: String,
    pub name: String,
}

impl ProviderLabel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
