//! Core pipeline types.

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::catalog::{Label, LabelCatalog};

/// Resolver output. Nothing past the resolver sees free-form model text
/// except as the `Unrecognized` payload, which is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    /// Output normalized to a catalog member.
    Labeled(Label),
    /// Output was absent (empty payload) or not a catalog member.
    Unrecognized(String),
}

impl ClassificationResult {
    /// The label to apply: the resolved one, or the catalog fallback.
    pub fn label_or_fallback<'a>(&'a self, catalog: &'a LabelCatalog) -> &'a Label {
        match self {
            Self::Labeled(label) => label,
            Self::Unrecognized(_) => catalog.fallback(),
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, Self::Labeled(_))
    }
}

/// What happened to one message in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The predicted label was applied.
    Labeled(Label),
    /// The model output was not a catalog label; the fallback was applied.
    FellBack { raw: String },
    /// The model returned nothing; the message was left unlabeled.
    Unclassified,
}

impl MessageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Labeled(_) => "labeled",
            Self::FellBack { .. } => "fallback",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every fetched message was handled without error.
    Success,
    /// At least one message failed and was left for the next run.
    PartialFailure,
}

/// Counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Entries returned by the unread listing.
    pub fetched: usize,
    /// Messages that received their predicted label.
    pub labeled: usize,
    /// Messages that received the fallback label.
    pub fallback: usize,
    /// Messages the model returned nothing for.
    pub unclassified: usize,
    /// Listing entries without an id.
    pub skipped: usize,
    /// Messages that hit a per-message error.
    pub failed: usize,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            fetched: 0,
            labeled: 0,
            fallback: 0,
            unclassified: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Labeled(_) => self.labeled += 1,
            MessageOutcome::FellBack { .. } => self.fallback += 1,
            MessageOutcome::Unclassified => self.unclassified += 1,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.failed == 0 {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        }
    }
}
