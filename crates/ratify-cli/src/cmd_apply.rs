use crate::cmd_hints::hints_for;
use crate::prompt::TerminalPrompter;
use ratify_capture::{govern_and_apply, AbortReason, GateOutcome, GovernedAction};
use ratify_core::classify::is_non_trivial;
use ratify_core::config::GovernanceConfig;
use ratify_core::diff::{aggregate, LineOp};
use ratify_core::paths::write_atomic;
use ratify_core::summary::{normalize_path, ChangeFlags, ChangeSummary};
use ratify_core::types::DiffStats;
use ratify_ledger::AuditLog;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

pub struct ApplyArgs {
    pub target: PathBuf,
    pub from: PathBuf,
    pub rename_from: Option<PathBuf>,
    pub multi_file: bool,
    pub force_decision: bool,
    pub operation: String,
    pub summary: Option<String>,
}

/// Added/removed line counts between two texts.
pub(crate) fn line_stats(old: &str, new: &str) -> DiffStats {
    let diff = TextDiff::from_lines(old, new);
    aggregate(diff.iter_all_changes().map(|c| match c.tag() {
        ChangeTag::Delete => LineOp::Old,
        ChangeTag::Insert => LineOp::New,
        ChangeTag::Equal => LineOp::Same,
    }))
}

/// A rename touches two paths but stays a single-file change unless the
/// caller says otherwise.
fn change_flags(multi_file: bool, is_new_file: bool, is_rename: bool) -> ChangeFlags {
    ChangeFlags {
        is_new_file,
        is_multi_file: multi_file,
        is_rename,
    }
}

fn absolute(cwd: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}

fn relative_to(root: &Path, p: &Path) -> String {
    let rel = p.strip_prefix(root).unwrap_or(p);
    normalize_path(&rel.to_string_lossy())
}

pub fn execute(repo_root: &Path, args: ApplyArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let target = absolute(&cwd, &args.target);
    let rename_from = args.rename_from.as_deref().map(|p| absolute(&cwd, p));

    let proposed = std::fs::read_to_string(absolute(&cwd, &args.from))
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", args.from.display()))?;
    let old_source = rename_from.as_deref().unwrap_or(target.as_path());
    let is_new_file = rename_from.is_none() && !target.exists();
    let current = if old_source.exists() {
        std::fs::read_to_string(old_source)?
    } else {
        String::new()
    };

    let rel = relative_to(repo_root, &target);
    let mut files_touched = vec![rel.clone()];
    if let Some(old) = &rename_from {
        files_touched.push(relative_to(repo_root, old));
    }
    let summary = ChangeSummary::from_stats(
        &rel,
        line_stats(&current, &proposed),
        change_flags(args.multi_file, is_new_file, rename_from.is_some()),
    );

    let config = GovernanceConfig::load(repo_root);
    let hints = if config.enabled && is_non_trivial(&summary, &config.capabilities()) {
        hints_for(repo_root, &rel)
    } else {
        Vec::new()
    };
    let action = GovernedAction {
        operation_type: args.operation,
        ai_action_summary: args
            .summary
            .unwrap_or_else(|| format!("Proposed edit to {rel}")),
        summary,
        files_touched,
        force_decision: args.force_decision,
        hints,
    };

    let log = AuditLog::new(repo_root, config.clone());
    let mut prompter = TerminalPrompter::stdin();
    let outcome = govern_and_apply(&mut prompter, &log, &config, &action, || {
        write_change(&target, &proposed, rename_from.as_deref())
    })?;
    match outcome {
        GateOutcome::Abort(reason) => {
            tracing::debug!(path = %rel, ?reason, "apply aborted");
            if let AbortReason::DocsOnly(paths) = &reason {
                eprintln!("Docs-only mode: non-doc edits are blocked:");
                for p in paths {
                    eprintln!("  {p}");
                }
            }
            println!("Aborted; {rel} left unchanged.");
            std::process::exit(1);
        }
        GateOutcome::Apply { decision, recorded } => {
            tracing::debug!(
                path = %rel,
                predictability = %decision.predictability,
                auto_approved = decision.auto_approved,
                recorded,
                "apply governed"
            );
            if !recorded {
                eprintln!("warning: the decision could not be written to the log");
            }
        }
        GateOutcome::Ungoverned => {
            tracing::debug!(path = %rel, "apply ungoverned");
        }
    }
    println!("Applied {rel}");
    Ok(())
}

/// Write the proposed content, then drop the old path of a rename.
fn write_change(target: &Path, proposed: &str, rename_from: Option<&Path>) -> anyhow::Result<()> {
    write_atomic(target, proposed.as_bytes())?;
    if let Some(old) = rename_from {
        if old != target && old.exists() {
            std::fs::remove_file(old)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_stats_counts_replacements() {
        let stats = line_stats("a\nb\nc\n", "a\nB\nc\nd\n");
        assert_eq!(stats.lines_added, 2);
        assert_eq!(stats.lines_removed, 1);
    }

    #[test]
    fn new_file_counts_every_line() {
        let stats = line_stats("", "one\ntwo\n");
        assert_eq!((stats.lines_added, stats.lines_removed), (2, 0));
        assert_eq!(line_stats("same\n", "same\n").changed_lines(), 0);
    }

    #[test]
    fn rename_alone_is_not_multi_file() {
        let flags = change_flags(false, false, true);
        assert!(flags.is_rename);
        assert!(!flags.is_multi_file);
        assert!(change_flags(true, false, false).is_multi_file);
    }

    #[test]
    fn rename_writes_target_and_drops_old_path() {
        let tmp = tempfile::tempdir().unwrap();
        let old = tmp.path().join("old.rs");
        let new = tmp.path().join("src/new.rs");
        std::fs::write(&old, "fn a() {}\n").unwrap();

        write_change(&new, "fn b() {}\n", Some(&old)).unwrap();
        assert_eq!(std::fs::read_to_string(&new).unwrap(), "fn b() {}\n");
        assert!(!old.exists());
    }

    #[test]
    fn paths_are_repo_relative() {
        let root = Path::new("/repo");
        assert_eq!(relative_to(root, Path::new("/repo/src/a.rs")), "src/a.rs");
        assert_eq!(relative_to(root, Path::new("/elsewhere/b.rs")), "/elsewhere/b.rs");
    }
}
