//! Closed-set taxonomies and their values

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// One of the six administrator-maintained closed sets.
///
/// Every categorical property of an attribute aggregate is a multi-select
/// over exactly one taxonomy; the association shape is the same for all
/// six, so they share one representation instead of six near-identical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    GrowthHabit,
    ClimateZone,
    HumanUse,
    EcologicalRole,
    SoilTexture,
    PropagationMethod,
}

impl Taxonomy {
    pub const ALL: [Taxonomy; 6] = [
        Taxonomy::GrowthHabit,
        Taxonomy::ClimateZone,
        Taxonomy::HumanUse,
        Taxonomy::EcologicalRole,
        Taxonomy::SoilTexture,
        Taxonomy::PropagationMethod,
    ];

    /// Storage key, e.g. `growth_habit`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrowthHabit => "growth_habit",
            Self::ClimateZone => "climate_zone",
            Self::HumanUse => "human_use",
            Self::EcologicalRole => "ecological_role",
            Self::SoilTexture => "soil_texture",
            Self::PropagationMethod => "propagation_method",
        }
    }

    /// Name of the multi-select property on the aggregate, e.g. `growth_habits`.
    pub fn property_name(&self) -> &'static str {
        match self {
            Self::GrowthHabit => "growth_habits",
            Self::ClimateZone => "climate_zones",
            Self::HumanUse => "human_uses",
            Self::EcologicalRole => "ecological_roles",
            Self::SoilTexture => "soil_textures",
            Self::PropagationMethod => "propagation_methods",
        }
    }

    /// Human-readable plural label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GrowthHabit => "growth habits (tree, shrub etc.)",
            Self::ClimateZone => "Köppen-Geiger climate zones the plant grows in",
            Self::HumanUse => "human uses",
            Self::EcologicalRole => "ecological roles",
            Self::SoilTexture => "preferred soil textures",
            Self::PropagationMethod => "propagation methods",
        }
    }

    /// Deterministic sub-schema identifier.
    pub fn schema_id(&self) -> &'static str {
        match self {
            Self::GrowthHabit => "GrowthHabitSelection",
            Self::ClimateZone => "ClimateZoneSelection",
            Self::HumanUse => "HumanUseSelection",
            Self::EcologicalRole => "EcologicalRoleSelection",
            Self::SoilTexture => "SoilTextureSelection",
            Self::PropagationMethod => "PropagationMethodSelection",
        }
    }

    pub fn from_property_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.property_name() == name)
    }
}

impl std::fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Taxonomy {
    type Err = String;

    /// Accepts either the storage key or the property name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.property_name() == s)
            .ok_or_else(|| format!("unknown taxonomy: {}", s))
    }
}

/// Stable machine identifier of a category value, unique within its taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Derive a slug from a display name.
    pub fn from_name(name: &str) -> Self {
        Self(slugify(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An allowed value of one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub taxonomy: Taxonomy,
    pub slug: Slug,
    pub name: String,
    pub description: String,
}

impl CategoryValue {
    pub fn new(taxonomy: Taxonomy, name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            taxonomy,
            slug: Slug::from_name(&name),
            name,
            description: description.into(),
        }
    }
}

/// Convert a display name to a slug.
///
/// Folds accents (NFKD, combining marks dropped), lowercases, keeps ASCII
/// alphanumerics, drops other characters and collapses runs of whitespace,
/// hyphens and underscores into a single `-`.
/// "Tropical wet and dry or savanna climate (dry winter)" becomes
/// "tropical-wet-and-dry-or-savanna-climate-dry-winter"; "Épiphyte" becomes
/// "epiphyte". A name without any ASCII letter or digit yields "".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.nfkd() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    slug
}
