//! Merges sequential and semantically retrieved context for a phase.

use crate::config::RetrievalConfig;
use crate::embeddings::embed_cache_key;
use crate::errors::Result;
use crate::model::{ContextBundle, SimilarPhase};
use crate::providers::embedder::Embedder;
use crate::storage::store::Store;
use std::collections::HashSet;
use std::sync::Arc;

const SEPARATOR: &str = "\n\n---\n\n";
const TRUNCATION_MARKER: &str = "... [context truncated]";

pub struct ContextAssembler {
    store: Store,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalConfig,
}

impl ContextAssembler {
    pub fn new(store: Store, embedder: Arc<dyn Embedder>, retrieval: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            retrieval,
        }
    }

    /// Assemble context for `current_phase_number`: the trailing window of
    /// answered earlier phases, then semantic hits for `query_text` that
    /// are not already covered. Semantic retrieval failing degrades to the
    /// sequential part alone; sequential reads failing propagates.
    pub async fn assemble(
        &self,
        project_id: &str,
        current_phase_number: u32,
        query_text: &str,
    ) -> Result<ContextBundle> {
        let mut parts: Vec<String> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        let previous = self
            .store
            .answered_phases_before(project_id, current_phase_number)?;
        let window_start = previous.len().saturating_sub(self.retrieval.sequential_window);
        let recent = &previous[window_start..];

        let mut seen: HashSet<u32> = HashSet::new();
        for phase in recent {
            let response = phase.ai_response.as_deref().unwrap_or_default();
            parts.push(format!(
                "Phase {} ({}):\n{}",
                phase.phase_number, phase.title, response
            ));
            sources.push(format!("Phase {}", phase.phase_number));
            seen.insert(phase.phase_number);
        }

        match self.semantic_matches(project_id, query_text).await {
            Ok(matches) => {
                for hit in matches {
                    if seen.contains(&hit.phase_number) {
                        continue;
                    }
                    let Some(response) = hit.ai_response.as_deref().filter(|r| !r.is_empty())
                    else {
                        continue;
                    };
                    parts.push(format!(
                        "Related content from Phase {} ({}) [similarity: {:.2}]:\n{}",
                        hit.phase_number, hit.title, hit.similarity, response
                    ));
                    sources.push(format!("Phase {} (RAG)", hit.phase_number));
                    seen.insert(hit.phase_number);
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    project_id,
                    phase = current_phase_number,
                    "semantic retrieval degraded; using sequential context only"
                );
            }
        }

        let mut text = parts.join(SEPARATOR);
        let max = self.retrieval.max_context_chars;
        if text.chars().count() > max {
            let cut = text
                .char_indices()
                .nth(max)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            text.truncate(cut);
            text.push_str(TRUNCATION_MARKER);
        }

        tracing::info!(
            project_id,
            phase = current_phase_number,
            sources = sources.len(),
            chars = text.chars().count(),
            "assembled context"
        );
        Ok(ContextBundle { text, sources })
    }

    async fn semantic_matches(
        &self,
        project_id: &str,
        query_text: &str,
    ) -> Result<Vec<SimilarPhase>> {
        let query = self.query_embedding(query_text).await?;
        self.store.search_similar(
            project_id,
            &query,
            self.retrieval.top_k,
            self.retrieval.threshold,
        )
    }

    /// Embed the query text, memoized by content hash.
    async fn query_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.embedder.model_id();
        let key = embed_cache_key(&model, text);
        if let Some(vec) = self.store.cached_embedding(&key)? {
            return Ok(vec);
        }
        let vec = self.embedder.embed(text).await?;
        self.store.store_cached_embedding(&key, &model, &vec)?;
        Ok(vec)
    }
}
