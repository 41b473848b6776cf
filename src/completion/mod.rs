//! Completion services: the external knowledge source queried per taxon
//!
//! Defines the client trait and request/response types. Two implementations:
//! - `HttpCompletionClient`: OpenAI-compatible chat completions over HTTP
//! - `MockClient`: replays a scripted sequence of replies (testing)

mod http;
mod mock;

pub use http::HttpCompletionClient;
pub use mock::MockClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat role of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A request/response pair shown to the service before the real request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkedExample {
    pub request: String,
    pub response: String,
}

/// A rejected output plus instructions for fixing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub output: String,
    pub instructions: String,
}

/// Everything sent to a completion service for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_instructions: String,
    pub examples: Vec<WorkedExample>,
    pub user_request: String,
    /// Prior rejected outputs, oldest first
    pub corrections: Vec<Correction>,
}

impl CompletionRequest {
    pub fn new(system_instructions: impl Into<String>, user_request: impl Into<String>) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            examples: Vec::new(),
            user_request: user_request.into(),
            corrections: Vec::new(),
        }
    }

    pub fn with_example(mut self, request: impl Into<String>, response: impl Into<String>) -> Self {
        self.examples.push(WorkedExample {
            request: request.into(),
            response: response.into(),
        });
        self
    }

    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.corrections.push(correction);
        self
    }

    /// Flatten into chat messages: system, example turns, the request,
    /// then each rejected output followed by its correction instructions.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::new(Role::System, &self.system_instructions)];
        for example in &self.examples {
            messages.push(Message::new(Role::User, &example.request));
            messages.push(Message::new(Role::Assistant, &example.response));
        }
        messages.push(Message::new(Role::User, &self.user_request));
        for correction in &self.corrections {
            messages.push(Message::new(Role::Assistant, &correction.output));
            messages.push(Message::new(Role::User, &correction.instructions));
        }
        messages
    }
}

/// Raw reply of a completion service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub content: String,
    /// Citation URLs, in the order the service returned them
    pub citations: Vec<String>,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations<I, S>(mut self, citations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.citations = citations.into_iter().map(Into::into).collect();
        self
    }
}

/// Transient completion failure. Retryable within the attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),
    #[error("completion timed out after {0}s")]
    Timeout(u64),
    #[error("completion request failed: {0}")]
    Http(String),
    #[error("unexpected completion response: {0}")]
    InvalidResponse(String),
}

/// Client trait for completion services.
///
/// Primary and fallback services are interchangeable implementations.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Source type recorded for citations this service returns.
    fn source_type(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}
