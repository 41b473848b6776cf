//! Read model of a taxon's attribute aggregate

use crate::catalog::{RangeProperty, SubField};
use crate::category::{Slug, Taxonomy};
use crate::taxon::TaxonId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored value of one range property. Every part is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredRange {
    pub minimum: Option<Decimal>,
    pub typical: Option<Decimal>,
    pub maximum: Option<Decimal>,
    pub confidence: Option<Decimal>,
    /// URL of the linked source, if any
    pub source: Option<String>,
}

impl StoredRange {
    pub fn get(&self, field: SubField) -> Option<Decimal> {
        match field {
            SubField::Minimum => self.minimum,
            SubField::Typical => self.typical,
            SubField::Maximum => self.maximum,
            SubField::Confidence => self.confidence,
        }
    }

    pub fn set(&mut self, field: SubField, value: Option<Decimal>) {
        match field {
            SubField::Minimum => self.minimum = value,
            SubField::Typical => self.typical = value,
            SubField::Maximum => self.maximum = value,
            SubField::Confidence => self.confidence = value,
        }
    }

    /// Whether the stored values satisfy minimum <= typical <= maximum.
    /// Requested of the completion service, not enforced by storage.
    pub fn is_ordered(&self) -> bool {
        let present: Vec<Decimal> = SubField::VALUES.iter().filter_map(|f| self.get(*f)).collect();
        present.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Link between an aggregate and one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssociation {
    pub taxonomy: Taxonomy,
    pub slug: Slug,
    pub confidence: Decimal,
    /// URLs of the sources backing this association
    pub sources: Vec<String>,
}

/// Everything stored about one taxon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAggregate {
    pub taxon_id: TaxonId,
    /// Only properties with at least one stored part appear here.
    pub ranges: BTreeMap<RangeProperty, StoredRange>,
    pub associations: Vec<CategoryAssociation>,
}

impl AttributeAggregate {
    pub fn range(&self, property: RangeProperty) -> Option<&StoredRange> {
        self.ranges.get(&property)
    }

    pub fn associations_for(&self, taxonomy: Taxonomy) -> impl Iterator<Item = &CategoryAssociation> {
        self.associations.iter().filter(move |a| a.taxonomy == taxonomy)
    }

    pub fn association(&self, taxonomy: Taxonomy, slug: &str) -> Option<&CategoryAssociation> {
        self.associations_for(taxonomy).find(|a| a.slug.as_str() == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn ordering_check_ignores_missing_parts() {
        let mut range = StoredRange::default();
        assert!(range.is_ordered());

        range.set(SubField::Minimum, Some(dec("25")));
        range.set(SubField::Maximum, Some(dec("40")));
        assert!(range.is_ordered());

        range.set(SubField::Typical, Some(dec("45")));
        assert!(!range.is_ordered());
    }
}
