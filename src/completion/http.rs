//! OpenAI-compatible chat completions client

use super::{Completion, CompletionClient, CompletionError, CompletionRequest};
use crate::config::{ConfigError, ServiceConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Calls `{base_url}/chat/completions` with bearer auth.
///
/// Works with OpenAI and Perplexity. Perplexity's top-level `citations`
/// array is read when present.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
    json_mode: bool,
    source_type: String,
}

impl HttpCompletionClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.1,
            max_tokens: None,
            json_mode: false,
            source_type: "Perplexity".to_string(),
        }
    }

    /// Build a client from configuration, reading the API key from the
    /// environment.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let mut client = Self::new(&config.name, &config.base_url, &config.model)
            .with_api_key(config.api_key()?)
            .with_temperature(config.temperature)
            .with_json_mode(config.json_mode)
            .with_source_type(&config.source_type);
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages(),
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if self.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

fn map_transport_error(err: reqwest::Error) -> CompletionError {
    if err.is_connect() {
        CompletionError::Unavailable(err.to_string())
    } else {
        CompletionError::Http(err.to_string())
    }
}

/// Pull content and citations out of a chat completions response.
fn parse_response(json: &Value) -> Result<Completion, CompletionError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| CompletionError::InvalidResponse("missing choices[0].message.content".to_string()))?;

    let citations = json["citations"]
        .as_array()
        .map(|urls| urls.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Completion {
        content: content.to_string(),
        citations,
    })
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        &self.source_type
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(service = %self.name, %url, model = %self.model, "sending completion request");

        let mut http = self.client.post(url).json(&self.body(request));
        if let Some(ref key) = self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http(format!("{}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
        parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_and_citations() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"height\": null}" } }],
            "citations": ["https://en.wikipedia.org/wiki/Oak", 42, "https://pfaf.org"]
        });
        let completion = parse_response(&json).unwrap();
        assert_eq!(completion.content, "{\"height\": null}");
        assert_eq!(
            completion.citations,
            vec!["https://en.wikipedia.org/wiki/Oak", "https://pfaf.org"]
        );
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let err = parse_response(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }

    #[test]
    fn body_requests_json_mode_when_enabled() {
        let client = HttpCompletionClient::new("openai", "https://api.openai.com/v1", "gpt-4o")
            .with_temperature(0.3)
            .with_json_mode(true);
        let body = client.body(&CompletionRequest::new("system", "user"));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert!(body.get("max_tokens").is_none());
    }
}
