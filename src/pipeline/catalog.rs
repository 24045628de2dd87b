//! Label catalog — the closed set of labels a message may receive.

use std::fmt;

use serde::Serialize;

use crate::error::CatalogError;

/// Label applied when classification output is not in the catalog.
pub const FALLBACK_LABEL: &str = "other";

/// Built-in catalog, in display order.
pub const DEFAULT_LABELS: [&str; 21] = [
    "bank-alert",
    "job-search",
    "job-application",
    "interview",
    "coding-assessment",
    "finance",
    "newsletter",
    "spam",
    "promotions",
    "payments",
    "social",
    "updates",
    "travel",
    "shopping",
    "security-alert",
    "subscriptions",
    "health",
    "education",
    "personal",
    "notifications",
    FALLBACK_LABEL,
];

/// A canonical label name: non-empty, `[a-z-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if is_label_token(&name) {
            Ok(Self(name))
        } else {
            Err(CatalogError::InvalidLabel(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `s` is a well-formed label token.
pub fn is_label_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_label_char)
}

/// Characters allowed in a label token.
pub fn is_label_char(c: char) -> bool {
    c.is_ascii_lowercase() || c == '-'
}

/// Ordered, deduplicated set of valid labels.
///
/// Built once at startup and shared read-only. The fallback label is always
/// a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<Label>,
    fallback: usize,
}

impl LabelCatalog {
    /// Build a catalog from label names. Duplicates are dropped (first
    /// occurrence wins) and `other` is appended if missing.
    pub fn new<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<Label> = Vec::new();
        for name in names {
            let label = Label::new(name)?;
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        let fallback = match labels.iter().position(|l| l.as_str() == FALLBACK_LABEL) {
            Some(idx) => idx,
            None => {
                labels.push(Label(FALLBACK_LABEL.to_string()));
                labels.len() - 1
            }
        };

        Ok(Self { labels, fallback })
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Exact membership check (no case folding).
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.as_str() == name)
    }

    /// The reserved fallback label (`other`).
    pub fn fallback(&self) -> &Label {
        &self.labels[self.fallback]
    }

    /// Labels joined with ", " for prompt construction.
    pub fn joined(&self) -> String {
        self.labels
            .iter()
            .map(Label::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|name| Label((*name).to_string()))
                .collect(),
            fallback: DEFAULT_LABELS.len() - 1,
        }
    }
}
