//! Result Reconciler/Persister
//!
//! Writes one `ValidatedResult` into a taxon's aggregate. Runs inside the
//! caller's transaction and never touches the network.
//!
//! Range sub-values merge sparsely: a part absent from the result leaves
//! the stored part untouched. Category associations are upserted with
//! last-write-wins on confidence and sources.

use super::validate::ValidatedResult;
use crate::catalog::SubField;
use crate::category::Taxonomy;
use crate::provenance::{NewSource, Source};
use crate::storage::{AggregateId, AttributeTx, StorageResult};
use crate::taxon::TaxonId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// Decimal places kept for every stored number.
pub const DECIMAL_PLACES: u32 = 2;

/// A claimed category value that the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedValue {
    pub taxonomy: Taxonomy,
    pub slug: String,
}

/// What one reconciliation wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub aggregate: AggregateId,
    pub values_written: usize,
    pub associations_upserted: usize,
    pub skipped_values: Vec<SkippedValue>,
    pub sources_linked: Vec<String>,
}

/// Convert a reported number to an exact decimal.
///
/// Goes through the shortest decimal string of the float, so 32.5 stays
/// 32.5 and 0.1 stays 0.1, then rounds half away from zero.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .map(|d| {
            d.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
                .normalize()
        })
}

fn valid_confidence(confidence: Decimal) -> bool {
    confidence > Decimal::ZERO && confidence <= Decimal::ONE
}

/// Persist `result` for `taxon` through `tx`.
pub fn reconcile(
    tx: &dyn AttributeTx,
    taxon: &TaxonId,
    result: &ValidatedResult,
    citations: &[NewSource],
) -> StorageResult<ReconcileOutcome> {
    let aggregate = tx.get_or_create_aggregate(taxon)?;
    let sources: Vec<Source> = citations
        .iter()
        .map(|citation| tx.get_or_create_source(citation))
        .collect::<StorageResult<_>>()?;

    let mut outcome = ReconcileOutcome {
        aggregate,
        values_written: 0,
        associations_upserted: 0,
        skipped_values: Vec::new(),
        sources_linked: sources.iter().map(|s| s.url.clone()).collect(),
    };

    for (property, estimate) in result.ranges() {
        let mut written = 0;
        for field in SubField::ALL {
            let Some(raw) = estimate.get(field) else {
                continue;
            };
            let Some(value) = to_decimal(raw) else {
                warn!(%property, field = field.as_str(), raw, "value not representable as a decimal, skipped");
                continue;
            };
            if field == SubField::Confidence && !valid_confidence(value) {
                warn!(%property, %value, "confidence outside (0, 1], skipped");
                continue;
            }
            debug!(%property, field = field.as_str(), %value, "setting range value");
            tx.set_range_value(aggregate, *property, field, value)?;
            written += 1;
        }

        if written > 0 {
            if let Some(source) = sources.first() {
                tx.link_range_source(aggregate, *property, source)?;
            }
        }
        outcome.values_written += written;
    }

    for (taxonomy, selection) in result.categories() {
        let Some(confidence) = to_decimal(selection.confidence).filter(|c| valid_confidence(*c)) else {
            warn!(%taxonomy, confidence = selection.confidence, "confidence outside (0, 1], selection skipped");
            continue;
        };

        for slug in &selection.values {
            match tx.resolve_category(*taxonomy, slug)? {
                Some(value) => {
                    debug!(%taxonomy, %slug, %confidence, "upserting association");
                    tx.upsert_association(aggregate, &value, confidence, &sources)?;
                    outcome.associations_upserted += 1;
                }
                None => {
                    warn!(%taxonomy, %slug, "unknown category value, skipped");
                    outcome.skipped_values.push(SkippedValue {
                        taxonomy: *taxonomy,
                        slug: slug.clone(),
                    });
                }
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RangeProperty;
    use crate::enrichment::validate::RangeEstimate;
    use crate::storage::{AttributeStore, OpenStore, SqliteStore};
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_categories().unwrap();
        store
    }

    fn citation(url: &str) -> NewSource {
        NewSource::from_citation("Perplexity", url, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn run(store: &SqliteStore, taxon: &TaxonId, result: &ValidatedResult, citations: &[NewSource]) -> ReconcileOutcome {
        let mut outcome = None;
        store
            .atomically(&mut |tx| {
                outcome = Some(reconcile(tx, taxon, result, citations)?);
                Ok(())
            })
            .unwrap();
        outcome.unwrap()
    }

    #[test]
    fn decimal_conversion_avoids_float_noise() {
        assert_eq!(to_decimal(32.5), Some(dec("32.5")));
        assert_eq!(to_decimal(0.1), Some(dec("0.1")));
        assert_eq!(to_decimal(0.1 + 0.2), Some(dec("0.3")));
        assert_eq!(to_decimal(2.345), Some(dec("2.35")));
        assert_eq!(to_decimal(-2.345), Some(dec("-2.35")));
        assert_eq!(to_decimal(25.0), Some(dec("25")));
        assert_eq!(to_decimal(f64::NAN), None);
    }

    #[test]
    fn sparse_merge_keeps_absent_parts() {
        let store = store();
        let taxon = TaxonId::new();

        let first = ValidatedResult::new().with_range(
            RangeProperty::Height,
            RangeEstimate::new(Some(25.0), Some(32.5), Some(40.0), Some(0.1)),
        );
        run(&store, &taxon, &first, &[]);

        let second = ValidatedResult::new().with_range(
            RangeProperty::Height,
            RangeEstimate::new(None, Some(30.0), None, None),
        );
        let outcome = run(&store, &taxon, &second, &[]);
        assert_eq!(outcome.values_written, 1);

        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        let height = aggregate.range(RangeProperty::Height).unwrap();
        assert_eq!(height.minimum, Some(dec("25")));
        assert_eq!(height.typical, Some(dec("30")));
        assert_eq!(height.maximum, Some(dec("40")));
        assert_eq!(height.confidence, Some(dec("0.1")));
    }

    #[test]
    fn unknown_slug_is_skipped_and_others_persist() {
        let store = store();
        let taxon = TaxonId::new();
        let result = ValidatedResult::new().with_category(Taxonomy::GrowthHabit, 0.8, ["tree", "epiphyte"]);

        let outcome = run(&store, &taxon, &result, &[]);

        assert_eq!(outcome.associations_upserted, 1);
        assert_eq!(
            outcome.skipped_values,
            vec![SkippedValue {
                taxonomy: Taxonomy::GrowthHabit,
                slug: "epiphyte".to_string()
            }]
        );
        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        assert!(aggregate.association(Taxonomy::GrowthHabit, "tree").is_some());
        assert!(aggregate.association(Taxonomy::GrowthHabit, "epiphyte").is_none());
    }

    #[test]
    fn citations_link_range_and_associations() {
        let store = store();
        let taxon = TaxonId::new();
        let result = ValidatedResult::new()
            .with_range(RangeProperty::Width, RangeEstimate::new(None, Some(12.0), None, Some(0.7)))
            .with_category(Taxonomy::SoilTexture, 0.6, ["loamy"]);
        let citations = [citation("https://pfaf.org/oak"), citation("https://en.wikipedia.org/wiki/Oak")];

        let outcome = run(&store, &taxon, &result, &citations);
        assert_eq!(outcome.sources_linked.len(), 2);

        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        let width = aggregate.range(RangeProperty::Width).unwrap();
        assert_eq!(width.source.as_deref(), Some("https://pfaf.org/oak"));

        let loamy = aggregate.association(Taxonomy::SoilTexture, "loamy").unwrap();
        assert_eq!(loamy.sources.len(), 2);
    }

    #[test]
    fn out_of_range_confidence_is_not_stored() {
        let store = store();
        let taxon = TaxonId::new();
        let result = ValidatedResult::new()
            .with_range(RangeProperty::Lifetime, RangeEstimate::new(Some(50.0), None, None, Some(1.5)))
            .with_category(Taxonomy::HumanUse, 0.0, ["timber"]);

        let outcome = run(&store, &taxon, &result, &[]);

        assert_eq!(outcome.values_written, 1);
        assert_eq!(outcome.associations_upserted, 0);
        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        assert_eq!(aggregate.range(RangeProperty::Lifetime).unwrap().confidence, None);
    }
}
