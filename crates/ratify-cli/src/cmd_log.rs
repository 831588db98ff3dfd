use clap::Subcommand;
use ratify_core::config::GovernanceConfig;
use ratify_core::paths::RatifyPaths;
use ratify_ledger::store::read_recent_from;
use ratify_ledger::{audit, migrate, report, DecisionSummary};
use std::path::{Path, PathBuf};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum LogCmd {
    /// Show the most recent decisions
    Recent {
        /// Number of decisions
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Convert a v1 log to the v2 schema
    Migrate {
        /// Input log
        input: PathBuf,
        /// Output log
        #[arg(long)]
        out: PathBuf,
    },
    /// Fail if any design decision lacks approvals or verification
    Audit {
        /// Log to check (defaults to the configured log)
        path: Option<PathBuf>,
    },
    /// Render the log to Markdown and HTML
    Report {
        /// Log to render (defaults to the configured log)
        path: Option<PathBuf>,
        /// Output base name, without extension
        #[arg(long, default_value = "decision-log-report")]
        out: PathBuf,
        /// UTC offset for displayed times, e.g. +01:00
        #[arg(long, default_value = "+01:00", allow_hyphen_values = true)]
        utc_offset: String,
    },
}

// ── Dispatch ──

pub fn run(cmd: LogCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        LogCmd::Recent { limit, json } => recent(repo_root, limit, json),
        LogCmd::Migrate { input, out } => migrate_cmd(&input, &out),
        LogCmd::Audit { path } => audit_cmd(&resolve_log(repo_root, path)),
        LogCmd::Report {
            path,
            out,
            utc_offset,
        } => report_cmd(&resolve_log(repo_root, path), &out, &utc_offset),
    }
}

fn resolve_log(repo_root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let config = GovernanceConfig::load(repo_root);
        RatifyPaths::discover(repo_root).log_file(&config.log_path)
    })
}

// ── Command Implementations ──

pub(crate) fn format_summary(s: &DecisionSummary) -> String {
    let auto = if s.auto_approved == Some(true) { " auto" } else { "" };
    format!(
        "{}  {}{}  {}  +{} -{}  {}",
        s.timestamp,
        s.predictability,
        auto,
        s.files_touched.join(","),
        s.lines_added,
        s.lines_removed,
        s.decision_note
    )
}

/// `ratify log recent`
fn recent(repo_root: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let config = GovernanceConfig::load(repo_root);
    let log = RatifyPaths::discover(repo_root).log_file(&config.log_path);
    let entries = read_recent_from(&log, limit, config.recent_order);
    if entries.is_empty() && !json {
        println!("(no decisions recorded)");
        return Ok(());
    }
    for s in &entries {
        if json {
            println!("{}", serde_json::to_string(s)?);
        } else {
            println!("{}", format_summary(s));
        }
    }
    Ok(())
}

/// `ratify log migrate`
fn migrate_cmd(input: &Path, out: &Path) -> anyhow::Result<()> {
    let stats = migrate::migrate_file(input, out)?;
    println!(
        "Migrated {} -> {} ({} converted, {} already v2)",
        input.display(),
        out.display(),
        stats.converted,
        stats.passed_through
    );
    Ok(())
}

/// `ratify log audit`
fn audit_cmd(path: &Path) -> anyhow::Result<()> {
    let failures = audit::audit_file(path)?;
    if failures.is_empty() {
        println!("Decision-log audit passed: {}", path.display());
        return Ok(());
    }
    println!("Decision-log audit FAILED: {}", path.display());
    for f in &failures {
        println!("- {f}");
    }
    std::process::exit(1);
}

/// `ratify log report`
fn report_cmd(path: &Path, out: &Path, utc_offset: &str) -> anyhow::Result<()> {
    let offset = report::parse_utc_offset(utc_offset)?;
    let (md, html, count) = report::write_report(path, out, offset)?;
    println!("Rendered {count} entries");
    println!("  {}", md.display());
    println!("  {}", html.display());
    Ok(())
}
