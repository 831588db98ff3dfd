mod cmd_apply;
mod cmd_config;
mod cmd_hints;
mod cmd_init;
mod cmd_log;
mod cmd_plan;
mod prompt;

use clap::{Parser, Subcommand};
use ratify_core::paths::RatifyPaths;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ratify",
    version,
    about = "Change governance for AI-assisted edits"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a .ratify/ workspace in the current directory
    Init,
    /// Apply a proposed file content through the governance gate
    Apply {
        /// File to change
        target: PathBuf,
        /// File holding the proposed content
        #[arg(long)]
        from: PathBuf,
        /// Old path when the change is a rename
        #[arg(long)]
        rename_from: Option<PathBuf>,
        /// The edit is part of a multi-file change
        #[arg(long)]
        multi_file: bool,
        /// Always capture a decision, even for auto-approvable edits
        #[arg(long)]
        force_decision: bool,
        /// Operation type recorded in the log
        #[arg(long, default_value = "apply")]
        operation: String,
        /// Summary of what the assistant did
        #[arg(long)]
        summary: Option<String>,
    },
    /// Read, migrate, audit, and render the decision log
    Log {
        #[command(subcommand)]
        cmd: cmd_log::LogCmd,
    },
    /// Manage the active plan
    Plan {
        #[command(subcommand)]
        cmd: cmd_plan::PlanCmd,
    },
    /// Manage .ratify/config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Show repository-map hints
    Hints {
        /// Only hints related to this repository-relative path
        #[arg(long)]
        path: Option<String>,
        /// Generator script (defaults to $RATIFY_REPOMAP_SCRIPT or tools/repomap/repomap.py)
        #[arg(long)]
        script: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RATIFY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let repo_root = RatifyPaths::find_root(&cwd).unwrap_or_else(|| cwd.clone());

    match cli.cmd {
        Command::Init => cmd_init::execute(&cwd),
        Command::Apply {
            target,
            from,
            rename_from,
            multi_file,
            force_decision,
            operation,
            summary,
        } => cmd_apply::execute(
            &repo_root,
            cmd_apply::ApplyArgs {
                target,
                from,
                rename_from,
                multi_file,
                force_decision,
                operation,
                summary,
            },
        ),
        Command::Log { cmd } => cmd_log::run(cmd, &repo_root),
        Command::Plan { cmd } => cmd_plan::run(cmd, &repo_root),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
        Command::Hints { path, script, json } => {
            cmd_hints::execute(&repo_root, path.as_deref(), script, json)
        }
    }
}
