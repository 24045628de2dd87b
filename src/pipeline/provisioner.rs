//! Label provisioning — make sure a label exists on the provider and get its id.
//!
//! Query, create, and on `Conflict` query again. Provider-side creation is
//! not atomic with respect to other creators (other runs, the user in the
//! web UI), so a create can lose a race to a label that did not exist a
//! moment ago.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{PipelineError, ProviderError};
use crate::mail::{MailProvider, ProviderLabel};
use crate::pipeline::catalog::{Label, LabelCatalog};

/// Resolves canonical labels to provider label ids for the duration of one run.
pub struct LabelProvisioner<'a> {
    provider: &'a dyn MailProvider,
    /// name -> provider id. Append-only; dropped with the run.
    registry: HashMap<String, String>,
}

impl<'a> LabelProvisioner<'a> {
    pub fn new(provider: &'a dyn MailProvider) -> Self {
        Self {
            provider,
            registry: HashMap::new(),
        }
    }

    /// Return the provider id for `label`, creating the label if needed.
    pub async fn ensure_label(&mut self, label: &Label) -> Result<String, ProviderError> {
        if let Some(id) = self.registry.get(label.as_str()) {
            return Ok(id.clone());
        }

        let id = self.resolve_or_create(label.as_str()).await?;
        self.registry.insert(label.as_str().to_string(), id.clone());
        Ok(id)
    }

    /// Provision every label in the catalog, in catalog order.
    ///
    /// The provider's labels are listed once up front; only labels missing
    /// from that listing go through create and re-query.
    pub async fn ensure_all(&mut self, catalog: &LabelCatalog) -> Result<(), PipelineError> {
        let existing = self
            .provider
            .list_labels()
            .await
            .map_err(PipelineError::LabelListing)?;

        for label in catalog.labels() {
            if self.registry.contains_key(label.as_str()) {
                continue;
            }

            let id = match find_by_name(&existing, label.as_str()) {
                Some(id) => id,
                None => self.create_or_requery(label.as_str()).await.map_err(|source| {
                    PipelineError::Provisioning {
                        label: label.to_string(),
                        source,
                    }
                })?,
            };
            self.registry.insert(label.as_str().to_string(), id);
        }
        Ok(())
    }

    /// Number of labels resolved so far in this run.
    pub fn resolved_count(&self) -> usize {
        self.registry.len()
    }

    async fn resolve_or_create(&self, name: &str) -> Result<String, ProviderError> {
        if let Some(id) = self.find_existing(name).await? {
            debug!(label = name, id = %id, "Label already exists");
            return Ok(id);
        }
        self.create_or_requery(name).await
    }

    async fn create_or_requery(&self, name: &str) -> Result<String, ProviderError> {
        match self.provider.create_label(name).await {
            Ok(id) => {
                info!(label = name, id = %id, "Created label");
                Ok(id)
            }
            Err(ProviderError::Conflict { name: conflicted }) => {
                debug!(label = name, "Label creation conflicted, re-querying");
                match self.find_existing(name).await? {
                    Some(id) => Ok(id),
                    None => Err(ProviderError::Conflict { name: conflicted }),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn find_existing(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let labels = self.provider.list_labels().await?;
        Ok(find_by_name(&labels, name))
    }
}

/// Case-insensitive lookup in a provider label listing.
fn find_by_name(labels: &[ProviderLabel], name: &str) -> Option<String> {
    labels
        .iter()
        .find(|l| l.name.to_lowercase() == name.to_lowercase())
        .map(|l| l.id.clone())
}
