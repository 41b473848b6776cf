//! Storage backends for treescape
//!
//! The enrichment engine writes through the `AttributeStore` trait and reads
//! taxonomies through `CategoryRegistry`. The primary implementation of both
//! is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    AggregateId, AttributeStore, AttributeTx, OpenStore, StorageError, StorageResult, TaxonStore,
};
