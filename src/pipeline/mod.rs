//! Classification-and-labeling pipeline.
//!
//! Every unread message flows through:
//! 1. `extract::extract_body()` — plain text from the MIME payload
//! 2. `prompt::build_prompt()` — closed-set classification instruction
//! 3. `Classifier::complete()` — the model call
//! 4. `resolver::resolve()` — raw output → catalog label or `Unrecognized`
//! 5. `LabelProvisioner` + `MailProvider::modify_labels()` — apply one label
//!
//! **Exactly one catalog label per labeled message.** Unknown output falls
//! back to `other`; no output leaves the message untouched.

pub mod catalog;
pub mod extract;
pub mod processor;
pub mod prompt;
pub mod provisioner;
pub mod resolver;
pub mod types;

pub use catalog::{Label, LabelCatalog};
pub use processor::{InboxClassifier, PipelineSettings};
pub use provisioner::LabelProvisioner;
pub use types::{ClassificationResult, MessageOutcome, RunStatus, RunSummary};
