//! Category Registry: closed sets of allowed values per categorical property
//!
//! The registry is administrator-maintained and read-only to the enrichment
//! engine. It is read fresh on every schema build, so values added between
//! two enrichment calls are valid options on the very next call.

mod seed;
mod types;

pub use seed::default_categories;
pub use types::{slugify, CategoryValue, Slug, Taxonomy};

use crate::storage::StorageResult;
use std::collections::{BTreeMap, BTreeSet};

/// Read access to the closed-set taxonomies.
///
/// Implementations must be thread-safe: concurrent enrichments of distinct
/// taxa share a single registry.
pub trait CategoryRegistry: Send + Sync {
    /// All values of one taxonomy, ordered by name.
    fn list(&self, taxonomy: Taxonomy) -> StorageResult<Vec<CategoryValue>>;

    /// Look up a value by slug. `Ok(None)` when the slug is not registered.
    fn resolve(&self, taxonomy: Taxonomy, slug: &str) -> StorageResult<Option<CategoryValue>>;

    /// Point-in-time copy of every taxonomy, used for one schema build.
    fn snapshot(&self) -> StorageResult<RegistrySnapshot> {
        let mut values = BTreeMap::new();
        for taxonomy in Taxonomy::ALL {
            values.insert(taxonomy, self.list(taxonomy)?);
        }
        Ok(RegistrySnapshot { values })
    }
}

/// Immutable copy of the registry taken at schema-generation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    values: BTreeMap<Taxonomy, Vec<CategoryValue>>,
}

impl RegistrySnapshot {
    /// Build a snapshot from loose values (tests, fixtures).
    pub fn from_values(values: impl IntoIterator<Item = CategoryValue>) -> Self {
        let mut grouped: BTreeMap<Taxonomy, Vec<CategoryValue>> = BTreeMap::new();
        for value in values {
            grouped.entry(value.taxonomy).or_default().push(value);
        }
        Self { values: grouped }
    }

    pub fn values(&self, taxonomy: Taxonomy) -> &[CategoryValue] {
        self.values.get(&taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted slugs of one taxonomy.
    pub fn allowed_values(&self, taxonomy: Taxonomy) -> BTreeSet<String> {
        self.values(taxonomy)
            .iter()
            .map(|v| v.slug.as_str().to_string())
            .collect()
    }

    pub fn contains(&self, taxonomy: Taxonomy, slug: &str) -> bool {
        self.values(taxonomy).iter().any(|v| v.slug.as_str() == slug)
    }

    pub fn total(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }
}
