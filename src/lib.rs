//! Treescape: attribute enrichment for agroforestry taxa
//!
//! Fills in continuous ranges (height, canopy width, soil pH, ...) and
//! closed-set categorical properties (growth habit, climate zone, ...) of
//! plant taxa by querying an external completion service, validating its
//! structured answer and persisting it with confidence and provenance.
//!
//! # Core Concepts
//!
//! - **Category Registry**: administrator-maintained closed sets of values
//! - **Property Catalog**: the range and categorical properties the store holds
//! - **Enrichment Engine**: schema -> prompt -> completion/retry -> reconcile
//! - **Attribute Aggregate**: everything stored about one taxon
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use treescape::{EnrichmentEngine, MockClient, OpenStore, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! store.seed_default_categories().unwrap();
//! let engine = EnrichmentEngine::new(store.clone(), store, Arc::new(MockClient::new("mock")));
//! assert!(engine.schema().unwrap().definition_ids().contains(&"HeightRange".to_string()));
//! ```

pub mod attributes;
pub mod catalog;
pub mod category;
pub mod completion;
pub mod config;
pub mod enrichment;
pub mod provenance;
pub mod storage;
pub mod taxon;

pub use attributes::{AttributeAggregate, CategoryAssociation, StoredRange};
pub use catalog::{PropertyCatalog, RangeProperty, SubField};
pub use category::{default_categories, CategoryRegistry, CategoryValue, RegistrySnapshot, Slug, Taxonomy};
pub use completion::{
    Completion, CompletionClient, CompletionError, CompletionRequest, HttpCompletionClient, MockClient,
};
pub use config::{ConfigError, EnrichmentConfig, ServiceConfig};
pub use enrichment::{
    BatchEnricher, BatchSummary, EnrichmentEngine, EnrichmentError, EnrichmentReport, GeneratedSchema,
    RetryPolicy, SchemaValidationError, ValidatedResult,
};
pub use provenance::{NewSource, Source};
pub use storage::{AttributeStore, OpenStore, SqliteStore, StorageError, StorageResult, TaxonStore};
pub use taxon::{Taxon, TaxonId, TaxonRank};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
