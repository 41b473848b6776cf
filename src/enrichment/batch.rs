//! Batch driver: enrich many taxa, never letting one failure stop the rest

use super::engine::{EnrichmentEngine, EnrichmentReport};
use super::EnrichmentError;
use crate::taxon::Taxon;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub enriched: usize,
    pub no_data: usize,
    /// Names of taxa whose enrichment failed
    pub failed: Vec<String>,
    pub reports: Vec<EnrichmentReport>,
}

impl BatchSummary {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    fn record(&mut self, taxon: &str, outcome: Result<EnrichmentReport, EnrichmentError>) {
        match outcome {
            Ok(report) => {
                self.enriched += 1;
                self.reports.push(report);
            }
            Err(EnrichmentError::NoUsableData { .. }) => {
                warn!(taxon, "no usable data found");
                self.no_data += 1;
            }
            Err(e) => {
                error!(taxon, error = %e, "enrichment failed");
                self.failed.push(taxon.to_string());
            }
        }
    }
}

/// Runs the engine over a list of taxa.
///
/// With `concurrency` 1 taxa are processed in order. Higher values run up
/// to that many enrichments at once; each taxon is still enriched at most
/// once per run.
pub struct BatchEnricher {
    engine: Arc<EnrichmentEngine>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl BatchEnricher {
    pub fn new(engine: Arc<EnrichmentEngine>) -> Self {
        Self {
            engine,
            semaphore: Arc::new(Semaphore::new(1)),
            concurrency: 1,
        }
    }

    /// Set the maximum number of concurrent enrichments.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self.semaphore = Arc::new(Semaphore::new(self.concurrency));
        self
    }

    pub async fn run(&self, taxa: Vec<Taxon>) -> BatchSummary {
        let mut seen = HashSet::new();
        let taxa: Vec<Taxon> = taxa.into_iter().filter(|t| seen.insert(t.id)).collect();
        info!(count = taxa.len(), concurrency = self.concurrency, "starting enrichment batch");

        let mut summary = BatchSummary::default();
        if self.concurrency == 1 {
            for taxon in &taxa {
                let outcome = self.engine.enrich(taxon).await;
                summary.record(&taxon.name, outcome);
            }
        } else {
            let mut tasks = JoinSet::new();
            for taxon in taxa {
                let engine = Arc::clone(&self.engine);
                let semaphore = Arc::clone(&self.semaphore);
                tasks.spawn(async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => engine.enrich(&taxon).await,
                        Err(_) => Err(EnrichmentError::Terminal {
                            attempts: 0,
                            last_error: "batch semaphore closed".to_string(),
                        }),
                    };
                    (taxon.name, outcome)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, outcome)) => summary.record(&name, outcome),
                    Err(e) => {
                        error!(error = %e, "enrichment task panicked");
                        summary.failed.push(format!("<task: {}>", e));
                    }
                }
            }
        }

        info!(
            enriched = summary.enriched,
            no_data = summary.no_data,
            failed = summary.failed_count(),
            "enrichment batch finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockClient;
    use crate::storage::{AttributeStore, OpenStore, SqliteStore};

    const OAK: &str = r#"{"growth_habits": {"confidence": 1, "values": ["tree"]}}"#;

    fn engine(client: MockClient) -> (Arc<SqliteStore>, Arc<EnrichmentEngine>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.seed_default_categories().unwrap();
        let engine = EnrichmentEngine::new(store.clone(), store.clone(), Arc::new(client))
            .with_policy(crate::enrichment::RetryPolicy {
                max_attempts: 1,
                ..Default::default()
            });
        (store, Arc::new(engine))
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let client = MockClient::new("mock").then_respond("garbage").then_respond("{}").then_respond(OAK);
        let (store, engine) = engine(client);
        let taxa = vec![
            Taxon::species("Failing one"),
            Taxon::species("Empty one"),
            Taxon::species("Quercus robur"),
        ];
        let oak = taxa[2].id;

        let summary = BatchEnricher::new(engine).run(taxa).await;

        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.no_data, 1);
        assert_eq!(summary.failed, vec!["Failing one".to_string()]);
        assert!(store.load_aggregate(&oak).unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_run_enriches_each_taxon_once() {
        let client = MockClient::new("mock").always_respond(OAK);
        let (store, engine) = engine(client);
        let oak = Taxon::species("Quercus robur");
        let taxa = vec![oak.clone(), Taxon::species("Quercus petraea"), oak.clone()];

        let summary = BatchEnricher::new(engine).with_concurrency(4).run(taxa).await;

        assert_eq!(summary.enriched, 2);
        assert_eq!(summary.failed_count(), 0);
        assert!(store.load_aggregate(&oak.id).unwrap().is_some());
    }
}
