use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GenerationOptions, LlmClient, LlmError};

/// Scripted LLM for tests.
///
/// Queued responses are served in order; once the queue is empty every call
/// returns the fallback response, or fails when none is set.
pub struct MockLlmClient {
    queue: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<(String, String, f32)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Some(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails as if the service were down.
    pub fn unavailable() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then_respond(self, response: &str) -> Self {
        self.push(Ok(response.to_string()));
        self
    }

    pub fn then_fail(self) -> Self {
        self.push(Err("scripted failure".to_string()));
        self
    }

    fn push(&self, item: Result<String, String>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
    }

    /// `(system, prompt, temperature)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String, f32)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((system.to_string(), prompt.to_string(), options.temperature));
        }
        let scripted = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(LlmError::Connection(reason)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::Connection("mock LLM unavailable".into())),
        }
    }

    fn label(&self) -> String {
        "mock:scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_configured_response() {
        let client = MockLlmClient::new("test response");
        let options = GenerationOptions::default();
        assert_eq!(client.generate("s", "p", &options).unwrap(), "test response");
        assert_eq!(client.generate("s", "p", &options).unwrap(), "test response");
    }

    #[test]
    fn scripted_queue_then_fallback() {
        let client = MockLlmClient::new("later")
            .then_respond("first")
            .then_fail();
        let options = GenerationOptions::default();
        assert_eq!(client.generate("s", "p", &options).unwrap(), "first");
        assert!(client.generate("s", "p", &options).is_err());
        assert_eq!(client.generate("s", "p", &options).unwrap(), "later");
    }

    #[test]
    fn unavailable_always_fails() {
        let client = MockLlmClient::unavailable();
        let err = client
            .generate("s", "p", &GenerationOptions::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::Connection(_)));
    }

    #[test]
    fn records_calls() {
        let client = MockLlmClient::new("ok");
        client
            .generate("sys", "question", &GenerationOptions::with_temperature(0.1))
            .unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "question");
        assert!((calls[0].2 - 0.1).abs() < f32::EPSILON);
    }
}
