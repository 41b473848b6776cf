//! Property catalog: which attributes are ranges and which are multi-selects
//!
//! The catalog is reflected from the attribute store's declared shape
//! (see `AttributeStore::catalog`), so the schema generator only offers
//! properties the store can actually hold.

use crate::category::{RegistrySnapshot, Taxonomy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A continuous property stored as minimum/typical/maximum plus confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeProperty {
    Height,
    Width,
    Temperature,
    Precipitation,
    SoilAcidity,
    SunHours,
    ProductionStart,
    ProductionPeak,
    Lifetime,
}

impl RangeProperty {
    pub const ALL: [RangeProperty; 9] = [
        RangeProperty::Height,
        RangeProperty::Width,
        RangeProperty::Temperature,
        RangeProperty::Precipitation,
        RangeProperty::SoilAcidity,
        RangeProperty::SunHours,
        RangeProperty::ProductionStart,
        RangeProperty::ProductionPeak,
        RangeProperty::Lifetime,
    ];

    /// Property name as used in schemas and storage column prefixes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Width => "width",
            Self::Temperature => "temperature",
            Self::Precipitation => "precipitation",
            Self::SoilAcidity => "soil_acidity",
            Self::SunHours => "sun_hours",
            Self::ProductionStart => "production_start",
            Self::ProductionPeak => "production_peak",
            Self::Lifetime => "lifetime",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Height => "mature plant height",
            Self::Width => "mature canopy width (not trunk diameter)",
            Self::Temperature => "temperature tolerance",
            Self::Precipitation => "precipitation tolerance",
            Self::SoilAcidity => "soil acidity tolerance",
            Self::SunHours => "sunlight tolerance",
            Self::ProductionStart => "age at which production starts",
            Self::ProductionPeak => "age at peak production",
            Self::Lifetime => "productive lifetime",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Height | Self::Width => "m",
            Self::Temperature => "°C",
            Self::Precipitation => "mm/year",
            Self::SoilAcidity => "pH",
            Self::SunHours => "h/day",
            Self::ProductionStart | Self::ProductionPeak | Self::Lifetime => "years",
        }
    }

    /// Deterministic sub-schema identifier, e.g. `HeightRange`.
    pub fn schema_id(&self) -> &'static str {
        match self {
            Self::Height => "HeightRange",
            Self::Width => "WidthRange",
            Self::Temperature => "TemperatureRange",
            Self::Precipitation => "PrecipitationRange",
            Self::SoilAcidity => "SoilAcidityRange",
            Self::SunHours => "SunHoursRange",
            Self::ProductionStart => "ProductionStartRange",
            Self::ProductionPeak => "ProductionPeakRange",
            Self::Lifetime => "LifetimeRange",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Storage column holding one sub-field of this property.
    pub fn column(&self, field: SubField) -> String {
        format!("{}_{}", self.name(), field.as_str())
    }

    /// Storage column holding this property's source link.
    pub fn source_column(&self) -> String {
        format!("{}_source_id", self.name())
    }
}

impl std::fmt::Display for RangeProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the four independently-nullable parts of a range property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubField {
    Minimum,
    Typical,
    Maximum,
    Confidence,
}

impl SubField {
    pub const ALL: [SubField; 4] = [
        SubField::Minimum,
        SubField::Typical,
        SubField::Maximum,
        SubField::Confidence,
    ];

    /// The sub-fields that carry a measured value.
    pub const VALUES: [SubField; 3] = [SubField::Minimum, SubField::Typical, SubField::Maximum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Typical => "typical",
            Self::Maximum => "maximum",
            Self::Confidence => "confidence",
        }
    }
}

/// The properties an attribute store declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCatalog {
    ranges: Vec<RangeProperty>,
    categories: Vec<Taxonomy>,
}

impl PropertyCatalog {
    pub fn new(ranges: Vec<RangeProperty>, categories: Vec<Taxonomy>) -> Self {
        Self { ranges, categories }
    }

    /// Every property this crate knows about.
    pub fn full() -> Self {
        Self::new(RangeProperty::ALL.to_vec(), Taxonomy::ALL.to_vec())
    }

    pub fn ranges(&self) -> &[RangeProperty] {
        &self.ranges
    }

    pub fn categories(&self) -> &[Taxonomy] {
        &self.categories
    }

    pub fn list_range_properties(&self) -> Vec<&'static str> {
        self.ranges.iter().map(RangeProperty::name).collect()
    }

    pub fn list_categorical_properties(&self) -> Vec<&'static str> {
        self.categories.iter().map(Taxonomy::property_name).collect()
    }

    /// Allowed slugs of a categorical property, or `None` when the catalog
    /// has no such multi-select.
    pub fn allowed_values(
        &self,
        registry: &RegistrySnapshot,
        property_name: &str,
    ) -> Option<BTreeSet<String>> {
        let taxonomy = Taxonomy::from_property_name(property_name)?;
        if !self.categories.contains(&taxonomy) {
            return None;
        }
        Some(registry.allowed_values(taxonomy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryValue;

    #[test]
    fn columns_follow_property_name() {
        assert_eq!(RangeProperty::SoilAcidity.column(SubField::Typical), "soil_acidity_typical");
        assert_eq!(RangeProperty::Height.source_column(), "height_source_id");
    }

    #[test]
    fn full_catalog_lists_every_property() {
        let catalog = PropertyCatalog::full();
        assert!(catalog.list_range_properties().contains(&"sun_hours"));
        assert_eq!(catalog.list_categorical_properties().len(), 6);
    }

    #[test]
    fn allowed_values_respects_declared_categories() {
        let registry = RegistrySnapshot::from_values(vec![CategoryValue::new(
            Taxonomy::GrowthHabit,
            "Tree",
            "",
        )]);
        let catalog = PropertyCatalog::new(vec![RangeProperty::Height], vec![Taxonomy::GrowthHabit]);

        let allowed = catalog.allowed_values(&registry, "growth_habits").unwrap();
        assert!(allowed.contains("tree"));
        assert!(catalog.allowed_values(&registry, "human_uses").is_none());
        assert!(catalog.allowed_values(&registry, "height").is_none());
    }
}
