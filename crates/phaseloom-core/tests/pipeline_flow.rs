use phaseloom_core::config::EngineConfig;
use phaseloom_core::engine::pipeline::Pipeline;
use phaseloom_core::errors::Error;
use phaseloom_core::model::{GenerateRequest, PhaseStatus, PhaseUpdate};
use phaseloom_core::providers::embedder::fake::{FailingEmbedder, FakeEmbedder};
use phaseloom_core::providers::embedder::Embedder;
use phaseloom_core::providers::llm::fake::{FailingGenerator, FakeGenerator};
use phaseloom_core::providers::llm::ContentGenerator;
use phaseloom_core::storage::store::Store;
use std::sync::Arc;

fn request(input: &str) -> GenerateRequest {
    GenerateRequest {
        user_input: input.to_string(),
        use_rag: false,
        temperature: None,
    }
}

fn pipeline_on(
    store: &Store,
    generator: Arc<dyn ContentGenerator>,
    embedder: Arc<dyn Embedder>,
) -> Pipeline {
    Pipeline::new(store.clone(), generator, embedder, EngineConfig::default())
}

fn fresh_store() -> Store {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    store
}

#[tokio::test]
async fn first_generate_completes_without_draft_or_context() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;
    let phase = &phases[0];

    let outcome = pipeline.generate(&phase.id, request("kickoff notes")).await?;
    assert_eq!(outcome.phase.ai_response.as_deref(), Some("alpha"));
    assert_eq!(outcome.phase.user_input.as_deref(), Some("kickoff notes"));
    assert_eq!(outcome.phase.status, PhaseStatus::Completed);
    assert!(outcome.context_sources.is_empty());
    assert_eq!(outcome.archived_version, None);
    assert!(pipeline.list_drafts(&phase.id)?.is_empty());
    assert!(store.get_phase_embedding(&phase.id)?.is_some());
    Ok(())
}

#[tokio::test]
async fn second_generate_archives_first() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha", "beta"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;
    let phase = &phases[2];

    pipeline.generate(&phase.id, request("first input")).await?;
    let outcome = pipeline.generate(&phase.id, request("second input")).await?;

    assert_eq!(outcome.archived_version, Some(1));
    let drafts = pipeline.list_drafts(&phase.id)?;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].version, 1);
    assert_eq!(drafts[0].user_input.as_deref(), Some("first input"));
    assert_eq!(drafts[0].ai_response.as_deref(), Some("alpha"));
    assert_eq!(outcome.phase.ai_response.as_deref(), Some("beta"));
    Ok(())
}

#[tokio::test]
async fn regeneration_cascades_staleness() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (project, phases) = pipeline.create_project("Demo", None, None)?;

    for phase in phases.iter().take(5) {
        pipeline.generate(&phase.id, request("in")).await?;
    }

    let outcome = pipeline.generate(&phases[1].id, request("revised")).await?;
    assert_eq!(outcome.marked_stale, 3);

    let statuses: Vec<PhaseStatus> = store
        .list_phases(&project.id)?
        .iter()
        .map(|p| p.status)
        .collect();
    assert_eq!(statuses[1], PhaseStatus::Completed);
    assert!(statuses[2..5].iter().all(|s| *s == PhaseStatus::Stale));
    assert!(statuses[5..].iter().all(|s| *s == PhaseStatus::NotStarted));

    // Explicit regeneration of a stale phase flips it back to completed.
    pipeline.generate(&phases[3].id, request("refresh")).await?;
    assert_eq!(
        store.get_phase(&phases[3].id)?.status,
        PhaseStatus::Completed
    );
    Ok(())
}

#[tokio::test]
async fn generator_failure_leaves_no_partial_state() -> anyhow::Result<()> {
    let store = fresh_store();
    let ok = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = ok.create_project("Demo", None, None)?;
    let phase = &phases[0];
    ok.generate(&phase.id, request("seed")).await?;
    let before = store.get_phase_embedding(&phase.id)?;

    let failing = pipeline_on(
        &store,
        Arc::new(FailingGenerator),
        Arc::new(FakeEmbedder::new()),
    );
    let err = failing
        .generate(&phase.id, request("doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalService { .. }));
    assert!(err.is_retryable());

    let after = store.get_phase(&phase.id)?;
    assert_eq!(after.ai_response.as_deref(), Some("alpha"));
    assert_eq!(after.user_input.as_deref(), Some("seed"));
    assert!(store.list_drafts(&phase.id)?.is_empty());
    assert_eq!(store.get_phase_embedding(&phase.id)?, before);
    Ok(())
}

#[tokio::test]
async fn embedder_failure_leaves_no_partial_state() -> anyhow::Result<()> {
    let store = fresh_store();
    let ok = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = ok.create_project("Demo", None, None)?;
    let phase = &phases[0];
    ok.generate(&phase.id, request("seed")).await?;

    let failing = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["beta"])),
        Arc::new(FailingEmbedder),
    );
    let err = failing
        .generate(&phase.id, request("doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalService { .. }));

    // The successful completion was discarded whole: no phase update, no
    // draft, no embedding churn.
    let after = store.get_phase(&phase.id)?;
    assert_eq!(after.ai_response.as_deref(), Some("alpha"));
    assert!(store.list_drafts(&phase.id)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn reconstruct_requires_existing_input() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;

    let err = pipeline.reconstruct(&phases[0].id).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn reconstruct_reuses_stored_input() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha", "beta"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;
    let phase = &phases[0];

    pipeline.generate(&phase.id, request("stable input")).await?;
    let outcome = pipeline.reconstruct(&phase.id).await?;

    assert_eq!(outcome.phase.ai_response.as_deref(), Some("beta"));
    assert_eq!(outcome.phase.user_input.as_deref(), Some("stable input"));
    assert_eq!(outcome.archived_version, Some(1));
    let drafts = pipeline.list_drafts(&phase.id)?;
    assert_eq!(drafts[0].ai_response.as_deref(), Some("alpha"));
    Ok(())
}

#[tokio::test]
async fn restore_draft_round_trip() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha", "beta"])),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;
    let phase = &phases[1];

    pipeline.generate(&phase.id, request("one")).await?;
    pipeline.generate(&phase.id, request("two")).await?;

    let outcome = pipeline.restore_draft(&phase.id, 1).await?;
    assert_eq!(outcome.phase.ai_response.as_deref(), Some("alpha"));
    assert_eq!(outcome.phase.user_input.as_deref(), Some("one"));
    assert_eq!(outcome.phase.status, PhaseStatus::Completed);
    assert_eq!(outcome.archived_version, Some(2));

    let err = pipeline.restore_draft(&phase.id, 42).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn concurrent_generates_on_one_phase_serialize() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = Arc::new(pipeline_on(
        &store,
        Arc::new(FakeGenerator::with_responses(["alpha", "beta"])),
        Arc::new(FakeEmbedder::new()),
    ));
    let (_, phases) = pipeline.create_project("Demo", None, None)?;
    let phase_id = phases[0].id.clone();

    let a = {
        let p = pipeline.clone();
        let id = phase_id.clone();
        tokio::spawn(async move { p.generate(&id, request("left")).await })
    };
    let b = {
        let p = pipeline.clone();
        let id = phase_id.clone();
        tokio::spawn(async move { p.generate(&id, request("right")).await })
    };
    a.await??;
    b.await??;

    // Serialized: the first call found an empty phase, the second archived
    // the first's content. Exactly one draft, version 1.
    let drafts = pipeline.list_drafts(&phase_id)?;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].version, 1);
    Ok(())
}

#[tokio::test]
async fn update_phase_archives_and_cascades() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;

    pipeline.generate(&phases[0].id, request("in1")).await?;
    pipeline.generate(&phases[1].id, request("in2")).await?;

    let outcome = pipeline
        .update_phase(
            &phases[0].id,
            PhaseUpdate {
                user_input: Some("edited".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(outcome.archived_version, Some(1));
    assert_eq!(outcome.marked_stale, 1);
    assert_eq!(outcome.phase.user_input.as_deref(), Some("edited"));
    assert_eq!(outcome.phase.status, PhaseStatus::Completed);
    assert_eq!(
        store.get_phase(&phases[1].id)?.status,
        PhaseStatus::Stale
    );
    Ok(())
}

#[tokio::test]
async fn validation_errors_surface_without_side_effects() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (_, phases) = pipeline.create_project("Demo", None, None)?;

    let err = pipeline
        .generate(&phases[0].id, request("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(
        store.get_phase(&phases[0].id)?.status,
        PhaseStatus::NotStarted
    );

    let err = pipeline.create_project("  ", None, None).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = pipeline
        .generate("no-such-phase", request("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn progress_and_prerequisites_track_completion() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (project, phases) = pipeline.create_project("Demo", None, None)?;

    assert!(pipeline.prerequisites_met(&project.id, 1)?);
    assert!(!pipeline.prerequisites_met(&project.id, 2)?);

    pipeline.generate(&phases[0].id, request("in")).await?;

    assert!(pipeline.prerequisites_met(&project.id, 2)?);
    let progress = pipeline.progress(&project.id)?;
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.current_phase, 2);
    Ok(())
}

#[tokio::test]
async fn reindex_rewrites_answered_phases() -> anyhow::Result<()> {
    let store = fresh_store();
    let pipeline = pipeline_on(
        &store,
        Arc::new(FakeGenerator::new()),
        Arc::new(FakeEmbedder::new()),
    );
    let (project, phases) = pipeline.create_project("Demo", None, None)?;

    pipeline.generate(&phases[0].id, request("a")).await?;
    pipeline.generate(&phases[1].id, request("b")).await?;

    let written = pipeline.reindex(&project.id).await?;
    assert_eq!(written, 2);
    assert!(store.get_phase_embedding(&phases[0].id)?.is_some());
    assert!(store.get_phase_embedding(&phases[2].id)?.is_none());
    Ok(())
}
