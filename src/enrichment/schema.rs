//! Schema Generator
//!
//! Pure function from (property catalog, registry snapshot) to a JSON
//! Schema document. Every property is optional and nullable; range
//! properties share the `RangeEstimate` shape, categorical properties
//! are closed multi-selects over the snapshot's slugs.
//!
//! Rebuilt on every enrichment call so registry edits take effect
//! immediately.

use super::validate::RangeEstimate;
use crate::catalog::{PropertyCatalog, RangeProperty};
use crate::category::{CategoryValue, RegistrySnapshot, Taxonomy};
use schemars::schema_for;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Smallest confidence that survives rounding to the stored precision.
const MIN_CONFIDENCE: f64 = 0.01;

#[derive(Debug, thiserror::Error)]
pub enum SchemaBuildError {
    #[error("schema serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("generated schema is invalid: {0}")]
    Invalid(String),
}

/// A schema built for one enrichment call, with the inputs it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSchema {
    document: Value,
    ranges: Vec<RangeProperty>,
    options: BTreeMap<Taxonomy, Vec<CategoryValue>>,
}

impl GeneratedSchema {
    /// The JSON Schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| self.document.to_string())
    }

    /// Range properties offered, in catalog order.
    pub fn ranges(&self) -> &[RangeProperty] {
        &self.ranges
    }

    /// Categorical properties offered. Taxonomies without any registered
    /// value are left out.
    pub fn categories(&self) -> impl Iterator<Item = Taxonomy> + '_ {
        self.options.keys().copied()
    }

    pub fn offers_category(&self, taxonomy: Taxonomy) -> bool {
        self.options.contains_key(&taxonomy)
    }

    /// Registry values behind a categorical property, ordered by name.
    pub fn options(&self, taxonomy: Taxonomy) -> &[CategoryValue] {
        self.options.get(&taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allowed_values(&self, taxonomy: Taxonomy) -> BTreeSet<String> {
        self.options(taxonomy)
            .iter()
            .map(|v| v.slug.as_str().to_string())
            .collect()
    }

    /// Identifiers of the sub-schemas under `$defs`.
    pub fn definition_ids(&self) -> Vec<String> {
        self.document["$defs"]
            .as_object()
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn validator(&self) -> Result<jsonschema::Validator, SchemaBuildError> {
        jsonschema::validator_for(&self.document).map_err(|e| SchemaBuildError::Invalid(e.to_string()))
    }
}

/// Build the validation schema for one call.
pub fn generate_schema(
    catalog: &PropertyCatalog,
    registry: &RegistrySnapshot,
) -> Result<GeneratedSchema, SchemaBuildError> {
    let mut properties = Map::new();
    let mut definitions = Map::new();

    for property in catalog.ranges() {
        definitions.insert(property.schema_id().to_string(), range_definition(*property)?);
        properties.insert(property.name().to_string(), nullable_ref(property.schema_id()));
    }

    let mut options = BTreeMap::new();
    for taxonomy in catalog.categories() {
        let values = registry.values(*taxonomy);
        if values.is_empty() {
            continue;
        }
        definitions.insert(
            taxonomy.schema_id().to_string(),
            category_definition(*taxonomy, &registry.allowed_values(*taxonomy)),
        );
        properties.insert(
            taxonomy.property_name().to_string(),
            nullable_ref(taxonomy.schema_id()),
        );
        options.insert(*taxonomy, values.to_vec());
    }

    let document = json!({
        "$schema": SCHEMA_DIALECT,
        "title": "TaxonAttributes",
        "description": "Attributes of one taxon. Every property is optional; null means no information.",
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
        "$defs": definitions,
    });

    let schema = GeneratedSchema {
        document,
        ranges: catalog.ranges().to_vec(),
        options,
    };
    schema.validator()?;
    Ok(schema)
}

fn nullable_ref(schema_id: &str) -> Value {
    json!({
        "anyOf": [
            { "$ref": format!("#/$defs/{}", schema_id) },
            { "type": "null" }
        ]
    })
}

fn confidence_schema(nullable: bool) -> Value {
    let kind = if nullable { json!(["number", "null"]) } else { json!("number") };
    json!({
        "type": kind,
        "minimum": MIN_CONFIDENCE,
        "maximum": 1,
        "description": "1.0 when stated verbatim by a source, lower when converted or inferred",
    })
}

fn range_definition(property: RangeProperty) -> Result<Value, SchemaBuildError> {
    let mut definition = serde_json::to_value(schema_for!(RangeEstimate))?;
    let object = definition
        .as_object_mut()
        .ok_or_else(|| SchemaBuildError::Invalid("range estimate schema is not an object".to_string()))?;

    object.remove("$schema");
    object.remove("required");
    object.insert("title".to_string(), json!(property.schema_id()));
    object.insert(
        "description".to_string(),
        json!(format!("{}, in {}", property.label(), property.unit())),
    );
    object.insert("additionalProperties".to_string(), json!(false));

    if let Some(fields) = object.get_mut("properties").and_then(Value::as_object_mut) {
        fields.insert("confidence".to_string(), confidence_schema(true));
    }

    Ok(definition)
}

fn category_definition(taxonomy: Taxonomy, allowed: &BTreeSet<String>) -> Value {
    json!({
        "title": taxonomy.schema_id(),
        "description": taxonomy.label(),
        "type": "object",
        "properties": {
            "confidence": confidence_schema(false),
            "values": {
                "type": "array",
                "items": { "type": "string", "enum": allowed },
                "minItems": 1,
                "uniqueItems": true
            }
        },
        "required": ["confidence", "values"],
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::default_categories;

    fn seeded() -> RegistrySnapshot {
        RegistrySnapshot::from_values(default_categories())
    }

    #[test]
    fn offers_every_catalog_property() {
        let schema = generate_schema(&PropertyCatalog::full(), &seeded()).unwrap();
        let properties = schema.document()["properties"].as_object().unwrap();

        assert_eq!(properties.len(), RangeProperty::ALL.len() + Taxonomy::ALL.len());
        assert!(properties.contains_key("soil_acidity"));
        assert!(properties.contains_key("propagation_methods"));
        assert_eq!(schema.document()["additionalProperties"], json!(false));
        assert!(schema.document().get("required").is_none());
    }

    #[test]
    fn definition_ids_are_deterministic() {
        let schema = generate_schema(&PropertyCatalog::full(), &seeded()).unwrap();
        let ids = schema.definition_ids();
        assert!(ids.contains(&"HeightRange".to_string()));
        assert!(ids.contains(&"GrowthHabitSelection".to_string()));

        let range = &schema.document()["$defs"]["HeightRange"];
        assert_eq!(range["title"], "HeightRange");
        assert_eq!(range["properties"]["confidence"]["minimum"], 0.01);
    }

    #[test]
    fn categorical_enum_matches_registry() {
        let registry = seeded();
        let schema = generate_schema(&PropertyCatalog::full(), &registry).unwrap();
        let enumerated: BTreeSet<String> = schema.document()["$defs"]["GrowthHabitSelection"]["properties"]
            ["values"]["items"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();

        assert_eq!(enumerated, registry.allowed_values(Taxonomy::GrowthHabit));
        assert_eq!(schema.allowed_values(Taxonomy::SoilTexture).len(), 7);
    }

    #[test]
    fn rebuild_without_registry_change_is_identical() {
        let catalog = PropertyCatalog::full();
        let first = generate_schema(&catalog, &seeded()).unwrap();
        let second = generate_schema(&catalog, &seeded()).unwrap();
        assert_eq!(first, second);
        for taxonomy in Taxonomy::ALL {
            assert_eq!(first.allowed_values(taxonomy), second.allowed_values(taxonomy));
        }
    }

    #[test]
    fn empty_taxonomy_is_omitted() {
        let registry = RegistrySnapshot::from_values(vec![CategoryValue::new(Taxonomy::GrowthHabit, "Tree", "")]);
        let schema = generate_schema(&PropertyCatalog::full(), &registry).unwrap();

        assert!(schema.offers_category(Taxonomy::GrowthHabit));
        assert!(!schema.offers_category(Taxonomy::HumanUse));
        assert!(schema.document()["properties"].get("human_uses").is_none());
    }

    #[test]
    fn catalog_limits_range_properties() {
        let catalog = PropertyCatalog::new(vec![RangeProperty::Height], vec![]);
        let schema = generate_schema(&catalog, &seeded()).unwrap();
        assert_eq!(schema.ranges(), &[RangeProperty::Height]);
        assert_eq!(schema.categories().count(), 0);
        assert_eq!(schema.definition_ids(), vec!["HeightRange".to_string()]);
    }
}
