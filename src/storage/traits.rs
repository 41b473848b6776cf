//! Storage trait definitions

use crate::attributes::AttributeAggregate;
use crate::catalog::{PropertyCatalog, RangeProperty, SubField};
use crate::category::{CategoryValue, Taxonomy};
use crate::provenance::{NewSource, Source};
use crate::taxon::{Taxon, TaxonId};
use rust_decimal::Decimal;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Category name {name:?} yields an empty slug")]
    InvalidCategoryName { name: String },

    #[error("Category value {taxonomy}/{slug} is referenced by stored associations")]
    CategoryInUse { taxonomy: Taxonomy, slug: String },

    #[error("Category value not found: {taxonomy}/{slug}")]
    CategoryNotFound { taxonomy: Taxonomy, slug: String },

    #[error("Unknown taxonomy: {0}")]
    UnknownTaxonomy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Decimal parsing error: {0}")]
    DecimalParse(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Internal storage error: {0}")]
    Internal(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Row identifier of an attribute aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateId(pub i64);

/// Field-level operations available inside one atomic write scope.
///
/// Every method takes effect only if the enclosing `AttributeStore::atomically`
/// call commits.
pub trait AttributeTx {
    /// Return the taxon's aggregate, creating an empty one if absent.
    fn get_or_create_aggregate(&self, taxon: &TaxonId) -> StorageResult<AggregateId>;

    /// Overwrite one sub-field of a range property.
    fn set_range_value(
        &self,
        aggregate: AggregateId,
        property: RangeProperty,
        field: SubField,
        value: Decimal,
    ) -> StorageResult<()>;

    /// Point a range property at a single source (last write wins).
    fn link_range_source(
        &self,
        aggregate: AggregateId,
        property: RangeProperty,
        source: &Source,
    ) -> StorageResult<()>;

    /// Resolve a slug against the category registry.
    fn resolve_category(&self, taxonomy: Taxonomy, slug: &str) -> StorageResult<Option<CategoryValue>>;

    /// Insert or replace the association for (aggregate, value): confidence
    /// and the full source set are overwritten.
    fn upsert_association(
        &self,
        aggregate: AggregateId,
        value: &CategoryValue,
        confidence: Decimal,
        sources: &[Source],
    ) -> StorageResult<()>;

    /// Look up a source by URL, creating it if absent.
    fn get_or_create_source(&self, source: &NewSource) -> StorageResult<Source>;

    /// True when no range value (minimum/typical/maximum) and no
    /// association is stored for the aggregate.
    fn aggregate_is_empty(&self, aggregate: AggregateId) -> StorageResult<bool>;

    /// Delete the aggregate and its associations.
    fn delete_aggregate(&self, aggregate: AggregateId) -> StorageResult<()>;
}

/// Persistent store of attribute aggregates.
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent enrichment of distinct taxa.
pub trait AttributeStore: Send + Sync {
    /// The properties the store's declared shape can hold.
    fn catalog(&self) -> StorageResult<PropertyCatalog>;

    /// Run `work` inside one transaction. Commits when `work` returns `Ok`,
    /// rolls back otherwise.
    fn atomically(&self, work: &mut dyn FnMut(&dyn AttributeTx) -> StorageResult<()>) -> StorageResult<()>;

    /// Load the aggregate of a taxon, if one exists.
    fn load_aggregate(&self, taxon: &TaxonId) -> StorageResult<Option<AttributeAggregate>>;

    /// Look up a source by URL, creating it if absent.
    fn get_or_create_source(&self, source: &NewSource) -> StorageResult<Source> {
        let mut created = None;
        self.atomically(&mut |tx| {
            created = Some(tx.get_or_create_source(source)?);
            Ok(())
        })?;
        created.ok_or_else(|| StorageError::Internal("transaction committed without a source".to_string()))
    }
}

/// Boundary to the taxonomic subsystem: the taxa the engine enriches.
pub trait TaxonStore: Send + Sync {
    /// Register a taxon (name is unique).
    fn add_taxon(&self, taxon: &Taxon) -> StorageResult<()>;

    fn get_taxon(&self, id: &TaxonId) -> StorageResult<Option<Taxon>>;

    fn find_taxon_by_name(&self, name: &str) -> StorageResult<Option<Taxon>>;

    /// Taxa that have no attribute aggregate yet, ordered by name.
    fn list_unenriched(&self) -> StorageResult<Vec<Taxon>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
