//! Governance gate: capture a decision, then record it.
//!
//! The caller applies the content change only on [`GateOutcome::Apply`] or
//! [`GateOutcome::Ungoverned`]. An aborted capture writes nothing.
//! [`govern_and_apply`] applies the change itself, before the record.

use crate::prompt::Prompter;
use crate::protocol::{capture_decision, AbortReason, Capture, CaptureRequest};
use ratify_core::classify::assess_risk;
use ratify_core::config::GovernanceConfig;
use ratify_core::summary::ChangeSummary;
use ratify_core::types::DecisionCaptureResult;
use ratify_ledger::git;
use ratify_ledger::store::{AuditLog, PendingDecision};
use std::path::{Path, PathBuf};

/// A proposed edit awaiting governance.
#[derive(Debug, Clone)]
pub struct GovernedAction {
    pub operation_type: String,
    pub summary: ChangeSummary,
    /// Every touched file; the summary's file is the context file.
    pub files_touched: Vec<String>,
    pub ai_action_summary: String,
    pub force_decision: bool,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Decision captured; `recorded` says whether the log append succeeded.
    Apply {
        decision: DecisionCaptureResult,
        recorded: bool,
    },
    /// Governance disabled; apply without a record.
    Ungoverned,
    /// Do not apply the change.
    Abort(AbortReason),
}

impl GateOutcome {
    pub fn may_apply(&self) -> bool {
        !matches!(self, GateOutcome::Abort(_))
    }
}

/// Capture finished with a decision that still has to be recorded.
struct Decided {
    decision: DecisionCaptureResult,
    pending: PendingDecision,
    context_file: PathBuf,
}

fn capture_stage(
    prompter: &mut dyn Prompter,
    log: &AuditLog,
    config: &GovernanceConfig,
    action: &GovernedAction,
) -> Result<Decided, GateOutcome> {
    let context_file = context_path(log.workspace_root(), &action.summary);
    let repo_root = log.repo_root_for(&context_file);
    // Read before anything is written.
    let head_before = git::head(&repo_root);

    let request = CaptureRequest {
        summary: &action.summary,
        files_touched: &action.files_touched,
        repo_root: &repo_root,
        force_decision: action.force_decision,
        hints: &action.hints,
    };
    let decision = match capture_decision(prompter, config, &request) {
        Capture::Decided(d) => d,
        Capture::Skipped => {
            tracing::debug!(path = %action.summary.path, "governance disabled; not recorded");
            return Err(GateOutcome::Ungoverned);
        }
        Capture::Aborted(reason) => {
            tracing::debug!(path = %action.summary.path, ?reason, "capture aborted");
            return Err(GateOutcome::Abort(reason));
        }
    };

    let pending = PendingDecision {
        operation_type: action.operation_type.clone(),
        files_touched: action.files_touched.clone(),
        diff_stats: action.summary.diff_stats(),
        ai_action_summary: action.ai_action_summary.clone(),
        head_before,
        risk: assess_risk(&action.summary, &action.files_touched),
    };
    Ok(Decided {
        decision,
        pending,
        context_file,
    })
}

fn record_stage(log: &AuditLog, d: Decided) -> GateOutcome {
    let recorded = log.record(&d.pending, &d.decision, &d.context_file);
    GateOutcome::Apply {
        decision: d.decision,
        recorded,
    }
}

/// Run capture for `action` and append the decision to `log`.
pub fn govern(
    prompter: &mut dyn Prompter,
    log: &AuditLog,
    config: &GovernanceConfig,
    action: &GovernedAction,
) -> GateOutcome {
    match capture_stage(prompter, log, config, action) {
        Ok(decided) => record_stage(log, decided),
        Err(outcome) => outcome,
    }
}

/// Like [`govern`], but runs `apply` between capture and record. A decision
/// is recorded only after `apply` succeeded; an aborted capture never runs
/// it.
pub fn govern_and_apply<F>(
    prompter: &mut dyn Prompter,
    log: &AuditLog,
    config: &GovernanceConfig,
    action: &GovernedAction,
    apply: F,
) -> anyhow::Result<GateOutcome>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match capture_stage(prompter, log, config, action) {
        Ok(decided) => {
            apply()?;
            Ok(record_stage(log, decided))
        }
        Err(GateOutcome::Ungoverned) => {
            apply()?;
            Ok(GateOutcome::Ungoverned)
        }
        Err(outcome) => Ok(outcome),
    }
}

fn context_path(workspace_root: &Path, summary: &ChangeSummary) -> PathBuf {
    let p = Path::new(&summary.path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workspace_root.join(p)
    }
}
