//! Structured output validation
//!
//! Raw completion text is located (bare, fenced or wrapped in prose),
//! checked against the generated schema, then converted into a typed
//! `ValidatedResult`.

use super::schema::GeneratedSchema;
use crate::catalog::{RangeProperty, SubField};
use crate::category::Taxonomy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Schema-level rejection of a completion. Retried via self-correction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("no JSON object found in the output")]
    MalformedOutput,
    #[error("output does not match the schema: {}", .0.join("; "))]
    Violations(Vec<String>),
    #[error("output has an unexpected shape: {0}")]
    TypeMismatch(String),
}

/// Estimated range of one continuous property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RangeEstimate {
    /// Lowest value reported by the sources
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Most common value reported by the sources
    #[serde(default)]
    pub typical: Option<f64>,
    /// Highest value reported by the sources
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Confidence in the values, in (0, 1]
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl RangeEstimate {
    pub fn new(minimum: Option<f64>, typical: Option<f64>, maximum: Option<f64>, confidence: Option<f64>) -> Self {
        Self {
            minimum,
            typical,
            maximum,
            confidence,
        }
    }

    pub fn get(&self, field: SubField) -> Option<f64> {
        match field {
            SubField::Minimum => self.minimum,
            SubField::Typical => self.typical,
            SubField::Maximum => self.maximum,
            SubField::Confidence => self.confidence,
        }
    }

    fn is_blank(&self) -> bool {
        SubField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// Selected values of one categorical property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySelection {
    pub confidence: f64,
    pub values: BTreeSet<String>,
}

/// Output of the validator; input to the reconciler. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedResult {
    ranges: BTreeMap<RangeProperty, RangeEstimate>,
    categories: BTreeMap<Taxonomy, CategorySelection>,
}

impl ValidatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, property: RangeProperty, estimate: RangeEstimate) -> Self {
        self.ranges.insert(property, estimate);
        self
    }

    pub fn with_category<I, S>(mut self, taxonomy: Taxonomy, confidence: f64, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.insert(
            taxonomy,
            CategorySelection {
                confidence,
                values: values.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn ranges(&self) -> &BTreeMap<RangeProperty, RangeEstimate> {
        &self.ranges
    }

    pub fn categories(&self) -> &BTreeMap<Taxonomy, CategorySelection> {
        &self.categories
    }

    /// True when the service returned no information at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.categories.is_empty()
    }
}

/// Validate raw completion output against `schema`.
pub fn validate_output(raw: &str, schema: &GeneratedSchema) -> Result<ValidatedResult, SchemaValidationError> {
    let instance = extract_json(raw).ok_or(SchemaValidationError::MalformedOutput)?;

    let validator = schema
        .validator()
        .map_err(|e| SchemaValidationError::Violations(vec![e.to_string()]))?;
    let violations: Vec<String> = validator.iter_errors(&instance).map(|e| format!("{e}")).collect();
    if !violations.is_empty() {
        return Err(SchemaValidationError::Violations(violations));
    }

    let mut result = ValidatedResult::new();
    for property in schema.ranges() {
        let Some(value) = instance.get(property.name()).filter(|v| !v.is_null()) else {
            continue;
        };
        let estimate: RangeEstimate = serde_json::from_value(value.clone())
            .map_err(|e| SchemaValidationError::TypeMismatch(format!("{}: {}", property, e)))?;
        if !estimate.is_blank() {
            result.ranges.insert(*property, estimate);
        }
    }

    for taxonomy in schema.categories() {
        let Some(value) = instance.get(taxonomy.property_name()).filter(|v| !v.is_null()) else {
            continue;
        };
        let selection: CategorySelection = serde_json::from_value(value.clone())
            .map_err(|e| SchemaValidationError::TypeMismatch(format!("{}: {}", taxonomy.property_name(), e)))?;
        result.categories.insert(taxonomy, selection);
    }

    Ok(result)
}

/// Extract a JSON object from completion text.
///
/// Tries in order: direct parse, a fenced code block, the span from the
/// first `{` to the last `}`.
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if v.is_object() {
            return Some(v);
        }
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```\n") {
        let after = &trimmed[start + 4..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };

    if let Some(block) = fenced {
        if let Ok(v) = serde_json::from_str::<Value>(block.trim()) {
            if v.is_object() {
                return Some(v);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                if v.is_object() {
                    return Some(v);
                }
            }
        }
    }

    None
}
