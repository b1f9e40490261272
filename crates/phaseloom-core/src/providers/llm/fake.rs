//! Deterministic generators for tests and offline runs.

use crate::errors::{Error, Result};
use crate::model::Completion;
use crate::providers::llm::ContentGenerator;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returns scripted responses in order, then falls back to echoing a
/// prefix of the prompt.
pub struct FakeGenerator {
    scripted: Mutex<VecDeque<String>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<Completion> {
        let scripted = self.scripted.lock().unwrap().pop_front();
        let text = scripted.unwrap_or_else(|| {
            let prefix: String = prompt.chars().take(120).collect();
            format!("[fake completion] {prefix}")
        });
        Ok(Completion {
            text,
            model: "fake-chat".to_string(),
            provider: "fake".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Always fails; used to exercise the no-partial-write guarantees.
pub struct FailingGenerator;

#[async_trait]
impl ContentGenerator for FailingGenerator {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<Completion> {
        Err(Error::external("fake", "simulated provider outage"))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
