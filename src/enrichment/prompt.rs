//! Prompt/Request Builder
//!
//! Renders the system contract, worked examples and the taxon request.
//! The worked examples are trimmed to whatever the current schema offers,
//! so they never show a property or value the validator would reject.

use super::schema::GeneratedSchema;
use super::validate::SchemaValidationError;
use crate::completion::{CompletionRequest, Correction};
use crate::taxon::{Taxon, TaxonRank};
use serde_json::{json, Map, Value};
use std::fmt::Write;

pub const DEFAULT_REFERENCE_TEXT_BUDGET: usize = 25_000;

const GUIDELINES: &str = "\
Important guidelines:
- Every property is optional. Return `null` for a property if no relevant information is available.
- When a minimum, typical or maximum value is not known, return `null` for it. Never guess a value!
- Keep minimum <= typical <= maximum.
- Use metric units as listed below. Specify length units in meters.
- Return at most 2 decimals for numbers.
- Width concerns the canopy width of a plant, not the trunk.
- Only when setting a property, include your confidence in its values, from 0.01 to 1:
  1.0 when a source states the value verbatim, around 0.6 when you converted units, lower when inferred.
- If a property has no value, no confidence is required.
- For categorical properties, only select values from the provided options.
- Answer with a single JSON object and nothing else.";

const AVOID: &str = r#"Avoid this:
{"height": {"confidence": null, "minimum": null, "typical": null, "maximum": null}}
Instead, do this:
{"height": null}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    reference_text_budget: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_TEXT_BUDGET)
    }
}

impl PromptBuilder {
    pub fn new(reference_text_budget: usize) -> Self {
        Self {
            reference_text_budget,
        }
    }

    /// Build the first request for `taxon`.
    pub fn build(&self, taxon: &Taxon, schema: &GeneratedSchema) -> CompletionRequest {
        let mut request = CompletionRequest::new(system_instructions(schema), self.user_request(taxon));
        for (example, response) in worked_examples() {
            let response = fit_to_schema(response, schema);
            let response = serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string());
            request = request.with_example(self.user_request(&example), response);
        }
        request
    }

    /// Correction turn for a rejected output.
    pub fn correction(&self, output: &str, error: &SchemaValidationError) -> Correction {
        Correction {
            output: output.to_string(),
            instructions: format!(
                "Your previous answer could not be used: {}\n\
                 Return the corrected answer as a single JSON object that validates against the schema. \
                 Only use the listed options for categorical properties and return `null` for anything unknown.",
                error
            ),
        }
    }

    fn user_request(&self, taxon: &Taxon) -> String {
        let mut text = format!(
            "As a plant expert, return available information about the {} '{}'.",
            taxon.rank, taxon.name
        );
        if let Some(reference) = taxon.reference_text.as_deref().filter(|t| !t.trim().is_empty()) {
            let _ = write!(
                text,
                "\n\nBase your answers exclusively on the following source:\n```\n{}\n```",
                truncate_chars(reference.trim(), self.reference_text_budget)
            );
        }
        text
    }
}

/// Cut `text` to at most `budget` characters on a char boundary.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn system_instructions(schema: &GeneratedSchema) -> String {
    let mut text = String::from(
        "You provide structured ecological and agronomic data about plants for agroforestry planning.\n\n",
    );
    text.push_str(GUIDELINES);

    if !schema.ranges().is_empty() {
        text.push_str("\n\nRange properties (minimum, typical, maximum):\n");
        for property in schema.ranges() {
            let _ = writeln!(text, "- {}: {}, in {}", property.name(), property.label(), property.unit());
        }
    }

    let categories: Vec<_> = schema.categories().collect();
    if !categories.is_empty() {
        text.push_str("\nCategorical properties (confidence plus a list of values):\n");
        for taxonomy in categories {
            let _ = writeln!(text, "{} ({}):", taxonomy.property_name(), taxonomy.label());
            for value in schema.options(taxonomy) {
                let _ = writeln!(text, "- {}: {}. {}", value.slug, value.name, value.description);
            }
        }
    }

    let _ = write!(text, "\nThe answer must validate against this JSON schema:\n{}\n\n{}", schema.pretty(), AVOID);
    text
}

/// Example taxa with the answers they should produce.
fn worked_examples() -> Vec<(Taxon, Value)> {
    vec![
        (
            Taxon::species("Juglans regia"),
            json!({
                "height": {"minimum": 10, "typical": 25, "maximum": 35, "confidence": 0.9},
                "width": {"minimum": null, "typical": 15, "maximum": null, "confidence": 0.6},
                "soil_acidity": {"minimum": 6, "typical": null, "maximum": 8, "confidence": 0.8},
                "production_start": {"minimum": 4, "typical": 6, "maximum": 10, "confidence": 0.7},
                "sun_hours": null,
                "growth_habits": {"confidence": 1, "values": ["tree"]},
                "human_uses": {"confidence": 0.9, "values": ["edible-nuts", "timber", "dye"]},
                "ecological_roles": {"confidence": 0.7, "values": ["carbon-sequestration", "habitat-provision"]},
                "propagation_methods": {"confidence": 0.8, "values": ["seed-propagation", "grafting"]},
                "soil_textures": null
            }),
        ),
        (
            Taxon::new("Ficus", TaxonRank::Genus),
            json!({
                "height": null,
                "width": null,
                "growth_habits": {"confidence": 0.5, "values": ["tree", "shrub", "vine"]},
                "climate_zones": {"confidence": 0.6, "values": ["tropical-rainforest-climate", "tropical-monsoon-climate"]}
            }),
        ),
    ]
}

/// Drop properties and values the schema does not offer.
fn fit_to_schema(example: Value, schema: &GeneratedSchema) -> Value {
    let Value::Object(fields) = example else {
        return Value::Object(Map::new());
    };

    let mut fitted = Map::new();
    for (key, value) in fields {
        if schema.ranges().iter().any(|p| p.name() == key) {
            fitted.insert(key, value);
            continue;
        }

        let Some(taxonomy) = schema.categories().find(|t| t.property_name() == key) else {
            continue;
        };
        let allowed = schema.allowed_values(taxonomy);
        let kept: Vec<Value> = value["values"]
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter(|v| v.as_str().is_some_and(|slug| allowed.contains(slug)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if kept.is_empty() {
            fitted.insert(key, Value::Null);
        } else {
            fitted.insert(key, json!({"confidence": value["confidence"].clone(), "values": kept}));
        }
    }
    Value::Object(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropertyCatalog, RangeProperty};
    use crate::category::{default_categories, CategoryValue, RegistrySnapshot, Taxonomy};
    use crate::enrichment::schema::generate_schema;
    use crate::enrichment::validate::validate_output;

    fn seeded_schema() -> GeneratedSchema {
        generate_schema(&PropertyCatalog::full(), &RegistrySnapshot::from_values(default_categories())).unwrap()
    }

    #[test]
    fn examples_validate_against_seeded_schema() {
        let schema = seeded_schema();
        let request = PromptBuilder::default().build(&Taxon::species("Quercus robur"), &schema);

        assert_eq!(request.examples.len(), 2);
        for example in &request.examples {
            let result = validate_output(&example.response, &schema).unwrap();
            assert!(!result.is_empty());
        }
    }

    #[test]
    fn examples_follow_a_reduced_registry() {
        let registry = RegistrySnapshot::from_values(vec![CategoryValue::new(Taxonomy::GrowthHabit, "Tree", "")]);
        let catalog = PropertyCatalog::new(vec![RangeProperty::Height], Taxonomy::ALL.to_vec());
        let schema = generate_schema(&catalog, &registry).unwrap();
        let request = PromptBuilder::default().build(&Taxon::species("Quercus robur"), &schema);

        for example in &request.examples {
            validate_output(&example.response, &schema).unwrap();
            assert!(!example.response.contains("edible-nuts"));
            assert!(!example.response.contains("soil_acidity"));
        }
    }

    #[test]
    fn request_names_taxon_and_embeds_reference() {
        let schema = seeded_schema();
        let taxon = Taxon::species("Quercus robur").with_reference_text("Large deciduous tree.");
        let request = PromptBuilder::default().build(&taxon, &schema);

        assert!(request.user_request.contains("species 'Quercus robur'"));
        assert!(request.user_request.contains("Large deciduous tree."));
        assert!(request.system_instructions.contains("canopy width"));
        assert!(request.system_instructions.contains("- tree: Tree."));
        assert!(request.system_instructions.contains("TaxonAttributes"));
    }

    #[test]
    fn reference_text_is_truncated_on_char_boundary() {
        let schema = seeded_schema();
        let taxon = Taxon::species("Quercus robur").with_reference_text("é".repeat(50));
        let request = PromptBuilder::new(10).build(&taxon, &schema);

        assert!(request.user_request.contains(&"é".repeat(10)));
        assert!(!request.user_request.contains(&"é".repeat(11)));
    }

    #[test]
    fn correction_quotes_the_error() {
        let correction = PromptBuilder::default().correction("oops", &SchemaValidationError::MalformedOutput);
        assert_eq!(correction.output, "oops");
        assert!(correction.instructions.contains("no JSON object found"));
    }
}
