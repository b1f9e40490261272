use crate::errors::{Error, Result};
use crate::providers::embedder::Embedder;
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Inputs beyond this many characters are truncated before embedding.
const MAX_INPUT_CHARS: usize = 8000;

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let trimmed = text.trim();
        let input: String = trimmed.chars().take(MAX_INPUT_CHARS).collect();

        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
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
                format!("embedding failed ({status}): {}", snippet(&detail)),
            ));
        }

        let payload: serde_json::Value =
            resp.json().await.map_err(|e| Error::external("openai", e))?;
        let values = payload
            .pointer("/data/0/embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::external("openai", "embedding response missing vector"))?;

        let mut vec = Vec::with_capacity(values.len());
        for v in values {
            let f = v
                .as_f64()
                .ok_or_else(|| Error::external("openai", "embedding contains non-numeric value"))?;
            vec.push(f as f32);
        }
        Ok(vec)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

fn snippet(s: &str) -> String {
    s.chars().take(200).collect()
}
