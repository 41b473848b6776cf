//! Taxon identity as supplied by the taxonomic subsystem
//!
//! The enrichment engine only reads a taxon: its identifier, display name,
//! rank and optional reference text. Canonical naming and synonym detection
//! live elsewhere.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a taxon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxonId(Uuid);

impl TaxonId {
    /// Create a new random TaxonId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaxonId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaxonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaxonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Taxonomic rank of the enriched unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonRank {
    Family,
    Genus,
    Species,
}

impl TaxonRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
        }
    }
}

impl std::fmt::Display for TaxonRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaxonRank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "family" => Ok(Self::Family),
            "genus" => Ok(Self::Genus),
            "species" => Ok(Self::Species),
            _ => Err(format!("unknown taxon rank: {}", s)),
        }
    }
}

/// A biological classification unit that is the subject of enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: TaxonId,
    /// Display name, e.g. "Quercus robur"
    pub name: String,
    pub rank: TaxonRank,
    /// Optional descriptive text (e.g. an encyclopedia article) the
    /// completion service should base its answer on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_text: Option<String>,
}

impl Taxon {
    /// Create a species-rank taxon with a fresh identifier.
    pub fn species(name: impl Into<String>) -> Self {
        Self::new(name, TaxonRank::Species)
    }

    pub fn new(name: impl Into<String>, rank: TaxonRank) -> Self {
        Self {
            id: TaxonId::new(),
            name: name.into(),
            rank,
            reference_text: None,
        }
    }

    pub fn with_reference_text(mut self, text: impl Into<String>) -> Self {
        self.reference_text = Some(text.into());
        self
    }
}

impl std::fmt::Display for Taxon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
