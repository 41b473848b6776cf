//! Citations recorded as evidence for stored attribute values

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted citation. URLs are unique across the store, so one source
/// is shared by every property and taxon that cites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    /// Kind of source, e.g. the completion service that returned it
    pub source_type: String,
    pub name: String,
    pub date: NaiveDate,
    pub url: String,
}

/// A citation to look up or create, keyed by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSource {
    pub source_type: String,
    pub name: String,
    pub url: String,
    pub date: NaiveDate,
}

impl NewSource {
    /// Build a citation returned by a completion service. The name is the
    /// URL's host when it parses, else the URL itself.
    pub fn from_citation(source_type: impl Into<String>, url: impl Into<String>, date: NaiveDate) -> Self {
        let url = url.into();
        let name = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.clone());
        Self {
            source_type: source_type.into(),
            name,
            url,
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_name_is_host() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let source = NewSource::from_citation("Perplexity", "https://en.wikipedia.org/wiki/Quercus_robur", date);
        assert_eq!(source.name, "en.wikipedia.org");
        assert_eq!(source.source_type, "Perplexity");
    }

    #[test]
    fn unparseable_citation_keeps_url_as_name() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let source = NewSource::from_citation("Perplexity", "not a url", date);
        assert_eq!(source.name, "not a url");
    }
}
