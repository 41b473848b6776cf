//! Empty-Result Guard

use crate::storage::{AggregateId, AttributeTx, StorageResult};
use tracing::info;

/// Delete the aggregate if nothing usable is stored on it.
///
/// Runs in the same transaction as reconciliation. Returns `true` when the
/// aggregate was deleted; the caller raises `NoUsableData` after commit.
pub fn discard_if_empty(tx: &dyn AttributeTx, aggregate: AggregateId) -> StorageResult<bool> {
    if !tx.aggregate_is_empty(aggregate)? {
        return Ok(false);
    }
    info!(aggregate = aggregate.0, "no usable data stored, deleting aggregate");
    tx.delete_aggregate(aggregate)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RangeProperty, SubField};
    use crate::storage::{AttributeStore, OpenStore, SqliteStore};
    use crate::taxon::TaxonId;
    use rust_decimal::Decimal;

    #[test]
    fn keeps_aggregate_with_values() {
        let store = SqliteStore::open_in_memory().unwrap();
        let taxon = TaxonId::new();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                tx.set_range_value(aggregate, RangeProperty::SunHours, SubField::Minimum, Decimal::new(6, 0))?;
                assert!(!discard_if_empty(tx, aggregate)?);
                Ok(())
            })
            .unwrap();

        assert!(store.load_aggregate(&taxon).unwrap().is_some());
    }

    #[test]
    fn deletes_empty_aggregate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let taxon = TaxonId::new();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                assert!(discard_if_empty(tx, aggregate)?);
                Ok(())
            })
            .unwrap();

        assert!(store.load_aggregate(&taxon).unwrap().is_none());
    }
}
