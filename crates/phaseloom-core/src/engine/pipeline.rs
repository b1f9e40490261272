use crate::config::EngineConfig;
use crate::context::ContextAssembler;
use crate::engine::locks::PhaseLocks;
use crate::errors::{Error, Result};
use crate::model::{
    Completion, ContextBundle, GenerateOutcome, GenerateRequest, Phase, PhaseDraft, PhaseStatus,
    PhaseUpdate, Project, ProjectProgress, MutationOutcome,
};
use crate::prompt;
use crate::providers::embedder::Embedder;
use crate::providers::llm::ContentGenerator;
use crate::seeds::PHASE_SEEDS;
use crate::storage::store::{EmbeddingWrite, Store};
use std::sync::Arc;
use tokio::time::{timeout, Duration};

/// Orchestrates phase content generation.
///
/// Status machine per phase: `not_started -> completed` on first generate,
/// `completed -> completed` on regenerate/restore (prior content archived
/// first), `completed -> stale` only via the cascade from an earlier
/// phase, `stale -> completed` via explicit regeneration of that phase.
///
/// Both external calls (generation, embedding) finish before any
/// persistence; archive, overwrite, embedding upsert, and cascade then
/// commit as one transaction, so a provider failure or cancellation leaves
/// no partial state.
pub struct Pipeline {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    embedder: Arc<dyn Embedder>,
    assembler: ContextAssembler,
    locks: PhaseLocks,
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(
        store: Store,
        generator: Arc<dyn ContentGenerator>,
        embedder: Arc<dyn Embedder>,
        config: EngineConfig,
    ) -> Self {
        let assembler =
            ContextAssembler::new(store.clone(), embedder.clone(), config.retrieval.clone());
        Self {
            store,
            generator,
            embedder,
            assembler,
            locks: PhaseLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Create a project with the full seeded phase sequence.
    pub fn create_project(
        &self,
        title: &str,
        description: Option<&str>,
        owner: Option<&str>,
    ) -> Result<(Project, Vec<Phase>)> {
        if title.trim().is_empty() {
            return Err(Error::validation("project title must not be empty"));
        }
        self.store
            .create_project(title, description, owner, &PHASE_SEEDS)
    }

    /// Generate content for a phase from fresh user input.
    pub async fn generate(&self, phase_id: &str, req: GenerateRequest) -> Result<GenerateOutcome> {
        let _guard = self.locks.acquire(phase_id).await;
        self.generate_locked(phase_id, req).await
    }

    /// Regenerate a phase from its stored input with freshly assembled
    /// context ("refresh with latest context").
    pub async fn reconstruct(&self, phase_id: &str) -> Result<GenerateOutcome> {
        let _guard = self.locks.acquire(phase_id).await;
        let phase = self.store.get_phase(phase_id)?;
        let user_input = phase
            .user_input
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::validation("phase has no user input to reconstruct from"))?;
        self.generate_locked(
            phase_id,
            GenerateRequest {
                user_input,
                use_rag: true,
                temperature: None,
            },
        )
        .await
    }

    async fn generate_locked(
        &self,
        phase_id: &str,
        req: GenerateRequest,
    ) -> Result<GenerateOutcome> {
        let phase = self.store.get_phase(phase_id)?;
        self.check_phase_number(phase.phase_number)?;
        if req.user_input.trim().is_empty() {
            return Err(Error::validation("user input must not be empty"));
        }

        let context = if req.use_rag {
            self.assembler
                .assemble(&phase.project_id, phase.phase_number, &req.user_input)
                .await?
        } else {
            ContextBundle::empty()
        };

        let built = prompt::build_prompt(&phase, &req.user_input, &context.text);
        let temperature = req.temperature.unwrap_or(self.config.generation.temperature);
        let completion = self.call_generator(&built, temperature).await?;
        let vector = self.call_embedder(&completion.text).await?;

        let model = self.embedder.model_id();
        let outcome = self.store.commit_generation(
            phase_id,
            &req.user_input,
            &completion.text,
            &EmbeddingWrite {
                model: &model,
                content: &completion.text,
                vec: &vector,
            },
        )?;

        tracing::info!(
            project_id = %outcome.phase.project_id,
            phase = outcome.phase.phase_number,
            provider = %completion.provider,
            sources = context.sources.len(),
            archived = ?outcome.archived_version,
            marked_stale = outcome.marked_stale,
            "generated phase content"
        );
        Ok(GenerateOutcome {
            phase: outcome.phase,
            context_sources: context.sources,
            archived_version: outcome.archived_version,
            marked_stale: outcome.marked_stale,
        })
    }

    /// Restore a phase from an archived draft. No provider calls; the
    /// embedding keeps mirroring the last generated response.
    pub async fn restore_draft(&self, phase_id: &str, version: u32) -> Result<MutationOutcome> {
        let _guard = self.locks.acquire(phase_id).await;
        let outcome = self.store.commit_restore(phase_id, version)?;
        tracing::info!(
            project_id = %outcome.phase.project_id,
            phase = outcome.phase.phase_number,
            version,
            archived = ?outcome.archived_version,
            marked_stale = outcome.marked_stale,
            "restored phase from draft"
        );
        Ok(MutationOutcome {
            phase: outcome.phase,
            archived_version: outcome.archived_version,
            marked_stale: outcome.marked_stale,
        })
    }

    pub fn list_drafts(&self, phase_id: &str) -> Result<Vec<PhaseDraft>> {
        self.store.get_phase(phase_id)?;
        self.store.list_drafts(phase_id)
    }

    /// Apply a partial field update, archiving the current pair first and
    /// cascading staleness when a completed phase changed.
    pub async fn update_phase(&self, phase_id: &str, update: PhaseUpdate) -> Result<MutationOutcome> {
        let _guard = self.locks.acquire(phase_id).await;
        let outcome = self.store.commit_update(phase_id, &update)?;
        Ok(MutationOutcome {
            phase: outcome.phase,
            archived_version: outcome.archived_version,
            marked_stale: outcome.marked_stale,
        })
    }

    pub fn progress(&self, project_id: &str) -> Result<ProjectProgress> {
        self.store.get_project(project_id)?;
        self.store.project_progress(project_id)
    }

    /// Linear prerequisite check: phase n requires phase n-1 completed.
    pub fn prerequisites_met(&self, project_id: &str, phase_number: u32) -> Result<bool> {
        self.check_phase_number(phase_number)?;
        if phase_number == 1 {
            return Ok(true);
        }
        let prev = self
            .store
            .get_phase_by_number(project_id, phase_number - 1)?;
        Ok(prev.status == PhaseStatus::Completed)
    }

    /// Re-embed every answered phase of the project. Returns how many
    /// embedding rows were written.
    pub async fn reindex(&self, project_id: &str) -> Result<usize> {
        self.store.get_project(project_id)?;
        let model = self.embedder.model_id();
        let mut written = 0;
        for phase in self.store.list_phases(project_id)? {
            let Some(response) = phase.ai_response.as_deref().filter(|r| !r.is_empty()) else {
                continue;
            };
            let vector = self.call_embedder(response).await?;
            self.store
                .upsert_phase_embedding(&phase.id, response, &model, &vector)?;
            written += 1;
        }
        tracing::info!(project_id, written, "reindexed phase embeddings");
        Ok(written)
    }

    fn check_phase_number(&self, phase_number: u32) -> Result<()> {
        if !(1..=self.config.phase_count).contains(&phase_number) {
            return Err(Error::validation(format!(
                "phase number must be between 1 and {} (got {})",
                self.config.phase_count, phase_number
            )));
        }
        Ok(())
    }

    async fn call_generator(&self, prompt: &str, temperature: f64) -> Result<Completion> {
        let fut = self
            .generator
            .complete(prompt, temperature, self.config.generation.max_tokens);
        match timeout(Duration::from_secs(self.config.timeout_seconds), fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::external(
                self.generator.provider_name(),
                "content generation timed out",
            )),
        }
    }

    async fn call_embedder(&self, text: &str) -> Result<Vec<f32>> {
        let fut = self.embedder.embed(text);
        match timeout(Duration::from_secs(self.config.timeout_seconds), fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::external(
                self.embedder.model_id(),
                "embedding timed out",
            )),
        }
    }
}
