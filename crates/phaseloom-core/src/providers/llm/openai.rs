use crate::errors::{Error, Result};
use crate::model::Completion;
use crate::providers::llm::ContentGenerator;
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_MESSAGE: &str = "\
You are an expert AI assistant helping users create comprehensive documents through a 14-phase structured workflow.

Your responses should be:
- Professional and well-structured
- Comprehensive yet concise
- Tailored to the specific phase and user input
- Building upon previous phases when context is provided

Always provide actionable, detailed content that helps move the document creation process forward.";

pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at an OpenAI-compatible endpoint (proxies, local servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Completion> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": prompt },
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external("openai", e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::external(
                "openai",
                format!("chat completion failed ({status}): {}", snippet(&detail)),
            ));
        }

        let payload: serde_json::Value =
            resp.json().await.map_err(|e| Error::external("openai", e))?;
        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(Completion {
            text,
            model: self.model.clone(),
            provider: "openai".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn snippet(s: &str) -> String {
    s.chars().take(200).collect()
}
