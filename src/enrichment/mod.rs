//! Enrichment Engine
//!
//! One call per taxon:
//! schema generation -> prompt -> completion/validate/retry loop ->
//! reconciliation + empty-result guard in a single transaction.
//!
//! The network round trips happen before the transaction opens, so the
//! write lock is only held for the reconciliation itself.

mod batch;
mod engine;
mod guard;
mod prompt;
mod reconcile;
mod retry;
mod schema;
mod validate;

pub use batch::{BatchEnricher, BatchSummary};
pub use engine::{EnrichmentEngine, EnrichmentReport};
pub use guard::discard_if_empty;
pub use prompt::{PromptBuilder, DEFAULT_REFERENCE_TEXT_BUDGET};
pub use reconcile::{reconcile, to_decimal, ReconcileOutcome, SkippedValue, DECIMAL_PLACES};
pub use retry::{Accepted, AttemptError, CompletionLoop, LoopState, RetryPolicy};
pub use schema::{generate_schema, GeneratedSchema, SchemaBuildError};
pub use validate::{validate_output, CategorySelection, RangeEstimate, SchemaValidationError, ValidatedResult};

use crate::storage::StorageError;

/// Errors that end one taxon's enrichment.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// Attempt budget exhausted. The batch driver skips the taxon.
    #[error("enrichment failed after {attempts} attempt(s): {last_error}")]
    Terminal { attempts: u32, last_error: String },

    /// Parsed successfully but nothing storable was returned. Expected for
    /// obscure taxa; the aggregate has been removed.
    #[error("no usable data for {taxon}")]
    NoUsableData { taxon: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot build schema: {0}")]
    SchemaBuild(String),
}

impl From<SchemaBuildError> for EnrichmentError {
    fn from(err: SchemaBuildError) -> Self {
        EnrichmentError::SchemaBuild(err.to_string())
    }
}
