use crate::errors::Result;
use crate::model::Completion;
use async_trait::async_trait;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f64, max_tokens: u32)
        -> Result<Completion>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod openai;
