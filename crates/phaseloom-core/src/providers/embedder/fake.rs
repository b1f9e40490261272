//! Deterministic embedders for tests and offline runs.

use crate::errors::{Error, Result};
use crate::providers::embedder::Embedder;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

const DIMS: usize = 8;

/// Hash-derived unit vectors, stable per input text. Exact-text overrides
/// let tests pin precise similarity relationships.
pub struct FakeEmbedder {
    overrides: Mutex<HashMap<String, Vec<f32>>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_vector(self, text: impl Into<String>, vec: Vec<f32>) -> Self {
        self.overrides.lock().unwrap().insert(text.into(), vec);
        self
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(v) = self.overrides.lock().unwrap().get(text) {
            return Ok(v.clone());
        }

        // FNV-1a, one lane per dimension.
        let mut vec = Vec::with_capacity(DIMS);
        for lane in 0..DIMS {
            let mut h: u64 = 0xcbf29ce484222325 ^ (lane as u64);
            for b in text.bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
            vec.push(((h % 1000) as f32 / 1000.0) + 0.001);
        }
        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        Ok(vec.iter().map(|v| v / norm).collect())
    }

    fn model_id(&self) -> String {
        "fake-embedder".to_string()
    }
}

/// Always fails; used to exercise retrieval degradation and the
/// no-partial-write guarantees.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::external("fake", "simulated embedding outage"))
    }

    fn model_id(&self) -> String {
        "failing-embedder".to_string()
    }
}
