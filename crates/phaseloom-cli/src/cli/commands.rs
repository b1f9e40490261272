use crate::cli::args::{Cli, Command};
use phaseloom_core::config::{load_config, write_sample_config, AppConfig};
use phaseloom_core::engine::pipeline::Pipeline;
use phaseloom_core::model::{GenerateRequest, Phase, PhaseDraft};
use phaseloom_core::providers::embedder::{fake::FakeEmbedder, openai::OpenAiEmbedder, Embedder};
use phaseloom_core::providers::llm::{
    fake::FakeGenerator, openai::OpenAiGenerator, ContentGenerator,
};
use phaseloom_core::storage::store::Store;
use std::path::Path;
use std::sync::Arc;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const OPERATION_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Init { path } = &cli.command {
        write_sample_config(path)?;
        println!("wrote sample config to {}", path.display());
        return Ok(exit_codes::OK);
    }

    let cfg = match load_config(&cli.config, false) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            eprintln!("hint: run `phaseloom init` to write a sample config");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let pipeline = match build_pipeline(&cfg, cli.offline) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    match run(&pipeline, cli.command).await {
        Ok(()) => Ok(exit_codes::OK),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(exit_codes::OPERATION_FAILED)
        }
    }
}

fn build_pipeline(cfg: &AppConfig, offline: bool) -> anyhow::Result<Pipeline> {
    let store = Store::open(Path::new(&cfg.database))?;
    store.init_schema()?;

    let (generator, embedder): (Arc<dyn ContentGenerator>, Arc<dyn Embedder>) = if offline {
        (
            Arc::new(FakeGenerator::new()),
            Arc::new(FakeEmbedder::new()),
        )
    } else {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            anyhow::anyhow!("OPENAI_API_KEY is not set (use --offline for deterministic providers)")
        })?;
        (
            Arc::new(OpenAiGenerator::new(
                api_key.clone(),
                cfg.providers.chat_model.clone(),
            )),
            Arc::new(OpenAiEmbedder::new(
                api_key,
                cfg.providers.embedding_model.clone(),
            )),
        )
    };

    Ok(Pipeline::new(store, generator, embedder, cfg.engine.clone()))
}

async fn run(pipeline: &Pipeline, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init { .. } => unreachable!("handled in dispatch"),
        Command::New {
            title,
            description,
            owner,
        } => {
            let (project, phases) =
                pipeline.create_project(&title, description.as_deref(), owner.as_deref())?;
            println!("created project {} ({})", project.id, project.title);
            for phase in &phases {
                println!("  {:>2}. {}", phase.phase_number, phase.title);
            }
        }
        Command::Status { project_id, json } => {
            let progress = pipeline.progress(&project_id)?;
            let phases = pipeline.store().list_phases(&project_id)?;
            if json {
                let payload = serde_json::json!({
                    "progress": progress,
                    "phases": phases,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{}/{} completed ({:.1}%), {} stale, current phase {}",
                    progress.completed,
                    progress.total,
                    progress.percent,
                    progress.stale,
                    progress.current_phase
                );
                for phase in &phases {
                    println!(
                        "  {:>2}. {:<28} {}",
                        phase.phase_number,
                        phase.title,
                        phase.status.as_str()
                    );
                }
            }
        }
        Command::Generate {
            project_id,
            phase,
            input,
            input_file,
            no_rag,
            temperature,
        } => {
            let user_input = match (input, input_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => anyhow::bail!("provide --input or --input-file"),
            };
            let target = pipeline.store().get_phase_by_number(&project_id, phase)?;
            let outcome = pipeline
                .generate(
                    &target.id,
                    GenerateRequest {
                        user_input,
                        use_rag: !no_rag,
                        temperature,
                    },
                )
                .await?;
            print_generation(&outcome.phase, &outcome.context_sources, outcome.marked_stale);
        }
        Command::Reconstruct { project_id, phase } => {
            let target = pipeline.store().get_phase_by_number(&project_id, phase)?;
            let outcome = pipeline.reconstruct(&target.id).await?;
            print_generation(&outcome.phase, &outcome.context_sources, outcome.marked_stale);
        }
        Command::Drafts {
            project_id,
            phase,
            json,
        } => {
            let target = pipeline.store().get_phase_by_number(&project_id, phase)?;
            let drafts = pipeline.list_drafts(&target.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&drafts)?);
            } else if drafts.is_empty() {
                println!("no drafts for phase {phase}");
            } else {
                for draft in &drafts {
                    print_draft(draft);
                }
            }
        }
        Command::Restore {
            project_id,
            phase,
            version,
        } => {
            let target = pipeline.store().get_phase_by_number(&project_id, phase)?;
            let outcome = pipeline.restore_draft(&target.id, version).await?;
            println!(
                "restored phase {} to draft v{version}; {} downstream phase(s) marked stale",
                outcome.phase.phase_number, outcome.marked_stale
            );
        }
        Command::Reindex { project_id } => {
            let written = pipeline.reindex(&project_id).await?;
            println!("reindexed {written} phase embedding(s)");
        }
    }
    Ok(())
}

fn print_generation(phase: &Phase, sources: &[String], marked_stale: usize) {
    println!(
        "phase {} ({}) completed; {} downstream phase(s) marked stale",
        phase.phase_number, phase.title, marked_stale
    );
    if !sources.is_empty() {
        println!("context sources: {}", sources.join(", "));
    }
    if let Some(response) = &phase.ai_response {
        println!("\n{response}");
    }
}

fn print_draft(draft: &PhaseDraft) {
    let first_line = draft
        .ai_response
        .as_deref()
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(60)
        .collect::<String>();
    println!("  v{:<3} {}  {}", draft.version, draft.created_at, first_line);
}
