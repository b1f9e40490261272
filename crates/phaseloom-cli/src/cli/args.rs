use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phaseloom", version, about = "Fixed-sequence AI document pipeline")]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(
        long,
        global = true,
        default_value = "phaseloom.yaml",
        env = "PHASELOOM_CONFIG"
    )]
    pub config: PathBuf,

    /// Use the deterministic offline providers instead of the OpenAI API.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config file.
    Init {
        #[arg(default_value = "phaseloom.yaml")]
        path: PathBuf,
    },
    /// Create a project with its seeded 14-phase sequence.
    New {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show project progress and per-phase status.
    Status {
        project_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate content for a phase.
    Generate {
        project_id: String,
        /// Phase number (1-14).
        phase: u32,
        /// Inline user input.
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,
        /// Read user input from a file.
        #[arg(long)]
        input_file: Option<PathBuf>,
        /// Skip retrieval-augmented context assembly.
        #[arg(long)]
        no_rag: bool,
        #[arg(long)]
        temperature: Option<f64>,
    },
    /// Regenerate a phase from its stored input with fresh context.
    Reconstruct {
        project_id: String,
        phase: u32,
    },
    /// List archived drafts for a phase.
    Drafts {
        project_id: String,
        phase: u32,
        #[arg(long)]
        json: bool,
    },
    /// Restore a phase from a draft version.
    Restore {
        project_id: String,
        phase: u32,
        version: u32,
    },
    /// Rebuild embeddings for every answered phase in a project.
    Reindex {
        project_id: String,
    },
}
