//! Inbox classifier — one run of fetch → extract → classify → label.
//!
//! Flow per run:
//! 1. List a bounded page of unread messages (empty → nothing to do)
//! 2. Provision every catalog label up front
//! 3. For each message, sequentially: fetch, extract text, build prompt,
//!    classify, resolve
//! 4. Apply exactly one label: the resolved one, or the fallback
//!
//! Messages are processed one at a time. That bounds the request rate
//! against both the mail provider and the model server.

use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::llm::{Classifier, CompletionRequest, DEFAULT_TEMPERATURE};
use crate::mail::MailProvider;
use crate::pipeline::catalog::LabelCatalog;
use crate::pipeline::extract::extract_body;
use crate::pipeline::prompt::{DEFAULT_BODY_CHAR_LIMIT, build_classification_input, build_prompt};
use crate::pipeline::provisioner::LabelProvisioner;
use crate::pipeline::resolver::resolve;
use crate::pipeline::types::{ClassificationResult, MessageOutcome, RunSummary};

/// Default page size per run.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Per-run tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Upper bound on unread messages handled per run.
    pub max_results: u32,
    /// Body characters included in the classification input.
    pub body_char_limit: usize,
    pub temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            body_char_limit: DEFAULT_BODY_CHAR_LIMIT,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl PipelineSettings {

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Labels unread messages using the classifier.
pub struct InboxClassifier {
    provider: Arc<dyn MailProvider>,
    classifier: Arc<dyn Classifier>,
    catalog: Arc<LabelCatalog>,
    settings: PipelineSettings,
}

impl InboxClassifier {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        classifier: Arc<dyn Classifier>,
        catalog: Arc<LabelCatalog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            classifier,
            catalog,
            settings,
        }
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Execute one run.
    ///
    /// Returns `Err` only for run-fatal failures (listing, catalog
    /// provisioning). Per-message failures are logged, counted in
    /// `RunSummary::failed`, and leave the message unlabeled for the next run.
    pub async fn run_once(&self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, model = self.classifier.model_name());
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunSummary, PipelineError> {
        info!("Checking for new emails");
        let mut summary = RunSummary::new(run_id);

        let stubs = self
            .provider
            .list_unread(self.settings.max_results)
            .await
            .map_err(|e| {
                error!(operation = "list_unread", error = %e, "Inbox listing failed");
                PipelineError::Listing(e)
            })?;

        summary.fetched = stubs.len();
        if stubs.is_empty() {
            info!("No new unread emails");
            return Ok(summary);
        }
        info!(count = stubs.len(), "Found unread emails");

        let mut provisioner = LabelProvisioner::new(self.provider.as_ref());
        provisioner.ensure_all(&self.catalog).await.inspect_err(|e| {
            error!(operation = "ensure_label", error = %e, "Catalog provisioning failed");
        })?;
        debug!(labels = provisioner.resolved_count(), "Catalog provisioned");

        for stub in &stubs {
            let Some(id) = stub.message_id() else {
                debug!("Skipping listing entry without an id");
                summary.skipped += 1;
                continue;
            };

            match self.process_message(id, &mut provisioner).await {
                Ok(outcome) => {
                    debug!(message_id = id, outcome = outcome.label(), "Message processed");
                    summary.record(&outcome);
                }
                Err(e) => {
                    error!(message_id = id, error = %e, "Failed to process message");
                    summary.failed += 1;
                }
            }
        }

        info!(
            status = ?summary.status(),
            fetched = summary.fetched,
            labeled = summary.labeled,
            fallback = summary.fallback,
            unclassified = summary.unclassified,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run complete"
        );
        Ok(summary)
    }

    /// Classify and label a single message.
    async fn process_message(
        &self,
        id: &str,
        provisioner: &mut LabelProvisioner<'_>,
    ) -> Result<MessageOutcome, PipelineError> {
        let message = self
            .provider
            .get_message(id)
            .await
            .map_err(|source| PipelineError::Fetch {
                id: id.to_string(),
                source,
            })?;

        let body = extract_body(&message);
        let snippet = message.snippet.as_deref().unwrap_or_default();
        let input = build_classification_input(snippet, &body, self.settings.body_char_limit);
        let prompt = build_prompt(&self.catalog, &input);

        let request = CompletionRequest::new(prompt).with_temperature(self.settings.temperature);
        let raw = self
            .classifier
            .complete(request)
            .await
            .map_err(|source| PipelineError::Classification {
                id: id.to_string(),
                source,
            })?;

        // No output at all: leave the message unread and unlabeled for a later run.
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            warn!(message_id = id, "Classifier returned no label, skipping");
            return Ok(MessageOutcome::Unclassified);
        };

        let result = resolve(Some(&raw), &self.catalog);
        let label = result.label_or_fallback(&self.catalog).clone();
        let outcome = match result {
            ClassificationResult::Labeled(label) => {
                info!(message_id = id, label = %label, "Classifying email");
                MessageOutcome::Labeled(label)
            }
            ClassificationResult::Unrecognized(token) => {
                warn!(
                    message_id = id,
                    raw = %raw,
                    normalized = %token,
                    fallback = %label,
                    "Classifier returned unknown label, using fallback"
                );
                MessageOutcome::FellBack { raw }
            }
        };

        let apply_err = |source| PipelineError::Apply {
            id: id.to_string(),
            label: label.to_string(),
            source,
        };
        let label_id = provisioner.ensure_label(&label).await.map_err(apply_err)?;
        self.provider
            .modify_labels(id, &[label_id], &[])
            .await
            .map_err(apply_err)?;

        Ok(outcome)
    }
}
