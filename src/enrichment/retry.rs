//! Structured Validator/Retry Loop
//!
//! An explicit state machine:
//!
//! ```text
//! Draft -> Sent -> Parsed
//!               -> ParseFailed -> Retried -> Sent -> ...
//!                              -> Failed
//! ```
//!
//! Each attempt is a full round trip bounded by a timeout. A schema
//! rejection feeds the rejected output and the error back as a correction
//! turn; a transient service error consumes the attempt and the same
//! request is sent again. Nothing is persisted here.

use super::prompt::PromptBuilder;
use super::schema::GeneratedSchema;
use super::validate::{validate_output, SchemaValidationError, ValidatedResult};
use super::EnrichmentError;
use crate::completion::{Completion, CompletionClient, CompletionError, CompletionRequest};
use crate::config::EnrichmentConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempt budget and service selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts across primary and fallback
    pub max_attempts: u32,
    /// Attempts numbered above this go to the fallback service, if any
    pub fallback_after: u32,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fallback_after: 2,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            fallback_after: config.fallback_after,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Why one attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
}

/// A validated completion, ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub result: ValidatedResult,
    pub citations: Vec<String>,
    /// Name of the service that produced the output
    pub service: String,
    pub source_type: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Draft,
    Sent {
        attempt: u32,
        service: String,
        source_type: String,
        reply: Result<Completion, CompletionError>,
    },
    ParseFailed {
        attempt: u32,
        /// Rejected output, absent when the service itself failed
        output: Option<String>,
        error: AttemptError,
    },
    Retried {
        attempt: u32,
    },
    Parsed(Accepted),
    Failed {
        attempts: u32,
        last_error: AttemptError,
    },
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Parsed(_) | LoopState::Failed { .. })
    }
}

/// Drives one taxon's request through the state machine.
pub struct CompletionLoop<'a> {
    primary: &'a dyn CompletionClient,
    fallback: Option<&'a dyn CompletionClient>,
    policy: &'a RetryPolicy,
    schema: &'a GeneratedSchema,
    prompts: &'a PromptBuilder,
    request: CompletionRequest,
    state: LoopState,
}

impl<'a> CompletionLoop<'a> {
    pub fn new(
        primary: &'a dyn CompletionClient,
        fallback: Option<&'a dyn CompletionClient>,
        policy: &'a RetryPolicy,
        schema: &'a GeneratedSchema,
        prompts: &'a PromptBuilder,
        request: CompletionRequest,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
            schema,
            prompts,
            request,
            state: LoopState::Draft,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn client_for(&self, attempt: u32) -> &'a dyn CompletionClient {
        match self.fallback {
            Some(fallback) if attempt > self.policy.fallback_after => fallback,
            _ => self.primary,
        }
    }

    async fn send(&self, attempt: u32) -> LoopState {
        let client = self.client_for(attempt);
        if attempt == self.policy.fallback_after + 1 && self.fallback.is_some() {
            info!(service = client.name(), attempt, "switching to fallback completion service");
        }
        debug!(service = client.name(), attempt, "requesting completion");

        let reply = match tokio::time::timeout(self.policy.request_timeout, client.complete(&self.request)).await {
            Ok(reply) => reply,
            Err(_) => Err(CompletionError::Timeout(self.policy.request_timeout.as_secs())),
        };

        LoopState::Sent {
            attempt,
            service: client.name().to_string(),
            source_type: client.source_type().to_string(),
            reply,
        }
    }

    /// Perform one transition. Terminal states are left unchanged.
    pub async fn step(&mut self) {
        let state = std::mem::replace(&mut self.state, LoopState::Draft);
        self.state = match state {
            LoopState::Draft => self.send(1).await,
            LoopState::Retried { attempt } => self.send(attempt).await,
            LoopState::Sent {
                attempt,
                service,
                source_type,
                reply,
            } => match reply {
                Ok(completion) => match validate_output(&completion.content, self.schema) {
                    Ok(result) => LoopState::Parsed(Accepted {
                        result,
                        citations: completion.citations,
                        service,
                        source_type,
                        attempts: attempt,
                    }),
                    Err(error) => LoopState::ParseFailed {
                        attempt,
                        output: Some(completion.content),
                        error: error.into(),
                    },
                },
                Err(error) => LoopState::ParseFailed {
                    attempt,
                    output: None,
                    error: error.into(),
                },
            },
            LoopState::ParseFailed { attempt, output, error } => {
                warn!(attempt, max_attempts = self.policy.max_attempts, %error, "completion attempt rejected");
                if attempt >= self.policy.max_attempts {
                    LoopState::Failed {
                        attempts: attempt,
                        last_error: error,
                    }
                } else {
                    if let (Some(output), AttemptError::Validation(validation)) = (output, &error) {
                        let correction = self.prompts.correction(&output, validation);
                        self.request.corrections.push(correction);
                    }
                    LoopState::Retried { attempt: attempt + 1 }
                }
            }
            terminal @ (LoopState::Parsed(_) | LoopState::Failed { .. }) => terminal,
        };
    }

    /// Step until a terminal state is reached.
    pub async fn run(mut self) -> Result<Accepted, EnrichmentError> {
        loop {
            match std::mem::replace(&mut self.state, LoopState::Draft) {
                LoopState::Parsed(accepted) => return Ok(accepted),
                LoopState::Failed { attempts, last_error } => {
                    return Err(EnrichmentError::Terminal {
                        attempts,
                        last_error: last_error.to_string(),
                    })
                }
                state => {
                    self.state = state;
                    self.step().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropertyCatalog;
    use crate::category::{default_categories, RegistrySnapshot};
    use crate::completion::MockClient;
    use crate::enrichment::schema::generate_schema;
    use crate::taxon::Taxon;

    const VALID: &str = r#"{"growth_habits": {"confidence": 1, "values": ["tree"]}}"#;

    fn schema() -> GeneratedSchema {
        generate_schema(&PropertyCatalog::full(), &RegistrySnapshot::from_values(default_categories())).unwrap()
    }

    fn request(schema: &GeneratedSchema) -> CompletionRequest {
        PromptBuilder::default().build(&Taxon::species("Quercus robur"), schema)
    }

    #[tokio::test]
    async fn valid_first_reply_is_parsed_in_two_steps() {
        let schema = schema();
        let prompts = PromptBuilder::default();
        let policy = RetryPolicy::default();
        let primary = MockClient::new("primary").then_respond(VALID);
        let mut run = CompletionLoop::new(&primary, None, &policy, &schema, &prompts, request(&schema));

        run.step().await;
        assert!(matches!(run.state(), LoopState::Sent { attempt: 1, .. }));
        run.step().await;
        assert!(matches!(run.state(), LoopState::Parsed(_)));
        assert!(run.is_terminal());
    }

    #[tokio::test]
    async fn malformed_then_valid_is_corrected() {
        let schema = schema();
        let prompts = PromptBuilder::default();
        let policy = RetryPolicy::default();
        let primary = MockClient::new("primary").then_respond("sorry, no JSON").then_respond(VALID);

        let accepted = CompletionLoop::new(&primary, None, &policy, &schema, &prompts, request(&schema))
            .run()
            .await
            .unwrap();

        assert_eq!(accepted.attempts, 2);
        assert_eq!(accepted.service, "primary");
        let requests = primary.requests();
        assert!(requests[0].corrections.is_empty());
        assert_eq!(requests[1].corrections.len(), 1);
        assert_eq!(requests[1].corrections[0].output, "sorry, no JSON");
    }

    #[tokio::test]
    async fn always_invalid_stops_at_budget() {
        let schema = schema();
        let prompts = PromptBuilder::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let primary = MockClient::new("primary").always_respond("not json");

        let err = CompletionLoop::new(&primary, None, &policy, &schema, &prompts, request(&schema))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, EnrichmentError::Terminal { attempts: 3, .. }));
        assert_eq!(primary.call_count(), 3);
    }

    #[tokio::test]
    async fn later_attempts_use_fallback() {
        let schema = schema();
        let prompts = PromptBuilder::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            fallback_after: 1,
            ..RetryPolicy::default()
        };
        let primary = MockClient::new("primary").always_respond("{\"growth_habits\": {\"confidence\": 1, \"values\": [\"palm\"]}}");
        let fallback = MockClient::new("fallback").with_source_type("OpenAI").then_respond(VALID);

        let accepted = CompletionLoop::new(&primary, Some(&fallback), &policy, &schema, &prompts, request(&schema))
            .run()
            .await
            .unwrap();

        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1);
        assert_eq!(accepted.service, "fallback");
        assert_eq!(accepted.source_type, "OpenAI");
        assert_eq!(accepted.attempts, 2);
    }

    #[tokio::test]
    async fn transient_error_consumes_attempt_without_correction() {
        let schema = schema();
        let prompts = PromptBuilder::default();
        let policy = RetryPolicy::default();
        let primary = MockClient::new("primary")
            .then_fail(CompletionError::Unavailable("connection refused".to_string()))
            .then_respond(VALID);

        let accepted = CompletionLoop::new(&primary, None, &policy, &schema, &prompts, request(&schema))
            .run()
            .await
            .unwrap();

        assert_eq!(accepted.attempts, 2);
        assert!(primary.requests()[1].corrections.is_empty());
    }
}
