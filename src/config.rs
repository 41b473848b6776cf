//! Enrichment configuration
//!
//! Loaded from YAML. Every field has a default, so an empty file (or no
//! file at all) yields a Perplexity primary with an OpenAI JSON-mode
//! fallback.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("service '{service}' needs an API key in ${var}")]
    MissingApiKey { service: String, var: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Ask for `response_format: json_object`
    #[serde(default)]
    pub json_mode: bool,
    /// Recorded as the type of every source this service cites
    #[serde(default = "default_source_type")]
    pub source_type: String,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_source_type() -> String {
    "Perplexity".to_string()
}

impl ServiceConfig {
    pub fn perplexity() -> Self {
        Self {
            name: "perplexity".to_string(),
            base_url: "https://api.perplexity.ai".to_string(),
            model: "llama-3.1-sonar-huge-128k-online".to_string(),
            api_key_env: "PPLX_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: None,
            json_mode: false,
            source_type: "Perplexity".to_string(),
        }
    }

    pub fn openai() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: None,
            json_mode: true,
            source_type: "OpenAI".to_string(),
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey {
                service: self.name.clone(),
                var: self.api_key_env.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub primary: ServiceConfig,
    pub fallback: Option<ServiceConfig>,
    /// Total completion attempts per taxon, across both services
    pub max_attempts: u32,
    /// Attempts beyond this number go to the fallback service
    pub fallback_after: u32,
    pub request_timeout_secs: u64,
    /// Characters of reference text embedded in the prompt
    pub reference_text_budget: usize,
    /// Taxa enriched at once by the batch driver
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            primary: ServiceConfig::perplexity(),
            fallback: Some(ServiceConfig::openai()),
            max_attempts: 3,
            fallback_after: 2,
            request_timeout_secs: 120,
            reference_text_budget: 25_000,
            concurrency: 1,
        }
    }
}

impl EnrichmentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Default database location: `<data_dir>/treescape/treescape.db`.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("treescape")
        .join("treescape.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = EnrichmentConfig::from_yaml("").unwrap();
        assert_eq!(config, EnrichmentConfig::default());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.reference_text_budget, 25_000);
        assert!(config.fallback.as_ref().unwrap().json_mode);
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let yaml = r#"
max_attempts: 2
fallback: null
primary:
  name: local
  base_url: http://localhost:11434/v1
  model: llama3
  api_key_env: LOCAL_KEY
"#;
        let config = EnrichmentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert!(config.fallback.is_none());
        assert_eq!(config.primary.model, "llama3");
        assert_eq!(config.primary.temperature, 0.1);
        assert_eq!(config.primary.source_type, "Perplexity");
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = EnrichmentConfig::from_yaml("max_attempts: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = EnrichmentConfig::from_yaml("request_timeout_secs: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let mut service = ServiceConfig::openai();
        service.api_key_env = "TREESCAPE_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = service.api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enrich.yaml");
        std::fs::write(&path, "concurrency: 4\n").unwrap();
        assert_eq!(EnrichmentConfig::load(&path).unwrap().concurrency, 4);
    }
}
