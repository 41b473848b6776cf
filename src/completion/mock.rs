//! Scripted completion service for tests

use super::{Completion, CompletionClient, CompletionError, CompletionRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Reply = Result<Completion, CompletionError>;

/// Mock client that replays queued replies in order.
///
/// Once the script is exhausted the repeating reply (if any) is returned
/// forever; otherwise the client reports itself unavailable.
pub struct MockClient {
    name: String,
    source_type: String,
    script: Mutex<VecDeque<Reply>>,
    repeating: Option<Reply>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: "Perplexity".to_string(),
            script: Mutex::new(VecDeque::new()),
            repeating: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    /// Queue a reply with the given content and no citations.
    pub fn then_respond(self, content: impl Into<String>) -> Self {
        self.then_respond_with(Completion::new(content))
    }

    pub fn then_respond_with(self, completion: Completion) -> Self {
        self.push(Ok(completion))
    }

    pub fn then_fail(self, error: CompletionError) -> Self {
        self.push(Err(error))
    }

    /// Reply with `content` whenever the script is empty.
    pub fn always_respond(mut self, content: impl Into<String>) -> Self {
        self.repeating = Some(Ok(Completion::new(content)));
        self
    }

    fn push(self, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        &self.source_type
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match next.or_else(|| self.repeating.clone()) {
            Some(reply) => reply,
            None => Err(CompletionError::Unavailable(format!(
                "mock client '{}' has no scripted reply left",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() {
        let client = MockClient::new("mock")
            .then_respond("first")
            .then_fail(CompletionError::Timeout(5))
            .then_respond_with(Completion::new("third").with_citations(["https://a.example"]));
        let request = CompletionRequest::new("system", "user");

        assert_eq!(client.complete(&request).await.unwrap().content, "first");
        assert_eq!(
            client.complete(&request).await.unwrap_err(),
            CompletionError::Timeout(5)
        );
        let third = client.complete(&request).await.unwrap();
        assert_eq!(third.citations, vec!["https://a.example"]);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_script_is_unavailable_unless_repeating() {
        let request = CompletionRequest::new("system", "user");

        let client = MockClient::new("mock");
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::Unavailable(_)));

        let client = MockClient::new("mock").always_respond("{}");
        for _ in 0..3 {
            assert_eq!(client.complete(&request).await.unwrap().content, "{}");
        }
        assert_eq!(client.requests().len(), 3);
    }
}
