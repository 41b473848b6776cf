//! The engine: one enrichment call per taxon

use super::guard::discard_if_empty;
use super::prompt::PromptBuilder;
use super::reconcile::{reconcile, ReconcileOutcome, SkippedValue};
use super::retry::{CompletionLoop, RetryPolicy};
use super::schema::{generate_schema, GeneratedSchema};
use super::EnrichmentError;
use crate::category::CategoryRegistry;
use crate::completion::{CompletionClient, HttpCompletionClient};
use crate::config::{ConfigError, EnrichmentConfig};
use crate::provenance::NewSource;
use crate::storage::{AttributeStore, StorageError};
use crate::taxon::{Taxon, TaxonId};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What one successful enrichment did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    pub taxon_id: TaxonId,
    pub taxon: String,
    pub attempts: u32,
    /// Service whose output was accepted
    pub service: String,
    pub values_written: usize,
    pub associations_upserted: usize,
    pub skipped_values: Vec<SkippedValue>,
    pub sources: Vec<String>,
}

/// Enrichment Engine
///
/// Holds the collaborators of one deployment. `enrich` is safe to call
/// concurrently for distinct taxa.
pub struct EnrichmentEngine {
    registry: Arc<dyn CategoryRegistry>,
    store: Arc<dyn AttributeStore>,
    primary: Arc<dyn CompletionClient>,
    fallback: Option<Arc<dyn CompletionClient>>,
    policy: RetryPolicy,
    prompts: PromptBuilder,
}

impl EnrichmentEngine {
    pub fn new(
        registry: Arc<dyn CategoryRegistry>,
        store: Arc<dyn AttributeStore>,
        primary: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            registry,
            store,
            primary,
            fallback: None,
            policy: RetryPolicy::default(),
            prompts: PromptBuilder::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn CompletionClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Build an engine with HTTP completion clients described by `config`.
    ///
    /// The primary service's API key is required. A fallback whose key is
    /// missing is dropped with a warning.
    pub fn from_config(
        config: &EnrichmentConfig,
        registry: Arc<dyn CategoryRegistry>,
        store: Arc<dyn AttributeStore>,
    ) -> Result<Self, ConfigError> {
        let primary = HttpCompletionClient::from_config(&config.primary)?;
        let mut engine = Self::new(registry, store, Arc::new(primary))
            .with_policy(RetryPolicy::from_config(config))
            .with_prompts(PromptBuilder::new(config.reference_text_budget));

        if let Some(fallback) = &config.fallback {
            match HttpCompletionClient::from_config(fallback) {
                Ok(client) => engine = engine.with_fallback(Arc::new(client)),
                Err(e) => warn!(service = %fallback.name, error = %e, "fallback service disabled"),
            }
        }
        Ok(engine)
    }

    /// Generate the schema from the store's catalog and the live registry.
    pub fn schema(&self) -> Result<GeneratedSchema, EnrichmentError> {
        let catalog = self.store.catalog()?;
        let registry = self.registry.snapshot()?;
        debug!(values = registry.total(), ranges = catalog.ranges().len(), "building schema");
        Ok(generate_schema(&catalog, &registry)?)
    }

    /// Enrich one taxon.
    ///
    /// Returns `NoUsableData` when the accepted output left the aggregate
    /// empty, and `Terminal` when the attempt budget ran out. In both cases
    /// no aggregate remains for a previously unenriched taxon.
    #[instrument(skip(self, taxon), fields(taxon = %taxon.name))]
    pub async fn enrich(&self, taxon: &Taxon) -> Result<EnrichmentReport, EnrichmentError> {
        let schema = self.schema()?;
        let request = self.prompts.build(taxon, &schema);

        let accepted = CompletionLoop::new(
            self.primary.as_ref(),
            self.fallback.as_deref(),
            &self.policy,
            &schema,
            &self.prompts,
            request,
        )
        .run()
        .await?;

        let today = Utc::now().date_naive();
        let mut seen = HashSet::new();
        let citations: Vec<NewSource> = accepted
            .citations
            .iter()
            .filter(|url| seen.insert(url.as_str()))
            .map(|url| NewSource::from_citation(&accepted.source_type, url, today))
            .collect();

        let mut written: Option<(ReconcileOutcome, bool)> = None;
        self.store.atomically(&mut |tx| {
            let outcome = reconcile(tx, &taxon.id, &accepted.result, &citations)?;
            let discarded = discard_if_empty(tx, outcome.aggregate)?;
            written = Some((outcome, discarded));
            Ok(())
        })?;

        let Some((outcome, discarded)) = written else {
            return Err(StorageError::Internal("transaction committed without an outcome".to_string()).into());
        };
        if discarded {
            return Err(EnrichmentError::NoUsableData {
                taxon: taxon.name.clone(),
            });
        }

        info!(
            attempts = accepted.attempts,
            service = %accepted.service,
            values = outcome.values_written,
            associations = outcome.associations_upserted,
            skipped = outcome.skipped_values.len(),
            "taxon enriched"
        );

        Ok(EnrichmentReport {
            taxon_id: taxon.id,
            taxon: taxon.name.clone(),
            attempts: accepted.attempts,
            service: accepted.service,
            values_written: outcome.values_written,
            associations_upserted: outcome.associations_upserted,
            skipped_values: outcome.skipped_values,
            sources: outcome.sources_linked,
        })
    }
}
