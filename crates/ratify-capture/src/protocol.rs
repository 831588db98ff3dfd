//! The decision-capture protocol.
//!
//! Steps run strictly in order:
//!
//! 1. docs-only enforcement
//! 2. disabled governance
//! 3. auto-approval
//! 4. plan and scope checks for non-trivial changes
//! 5. predictability
//! 6. decision note
//! 7. approval and verification for design-level changes
//!
//! A cancelled step aborts the whole capture; no partial result escapes.

use crate::prompt::Prompter;
use ratify_core::classify::{is_non_trivial, should_auto_approve};
use ratify_core::config::{Capabilities, DisabledBehavior, GovernanceConfig};
use ratify_core::plan::{self, PlanInfo};
use ratify_core::scope::ScopeMatcher;
use ratify_core::summary::{is_doc_file, normalize_path, ChangeSummary};
use ratify_core::types::{now_rfc3339, Approval, DecisionCaptureResult, Predictability, Verification};
use std::path::Path;

pub const AUTO_APPROVE_NOTE: &str = "Auto-approved: small, low-risk change.";
pub const DISABLED_NOTE: &str = "Governance disabled; change not reviewed.";

/// Substring a decision note must contain when scope was violated.
pub const OUT_OF_SCOPE_MARKER: &str = "out-of-scope";

const MIN_NOTE_CHARS: usize = 8;
const MIN_APPROVAL_CHARS: usize = 3;

/// One governed action as seen by the protocol.
#[derive(Debug, Clone)]
pub struct CaptureRequest<'a> {
    pub summary: &'a ChangeSummary,
    /// Every touched path, absolute or repository-relative.
    pub files_touched: &'a [String],
    pub repo_root: &'a Path,
    /// Skip auto-approval even when the rules allow it.
    pub force_decision: bool,
    /// Context shown before the predictability question.
    pub hints: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Docs-only mode rejected these non-documentation paths.
    DocsOnly(Vec<String>),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Decided(DecisionCaptureResult),
    /// Governance is disabled and configured to skip; nothing to record.
    Skipped,
    Aborted(AbortReason),
}

/// Run the capture protocol for one governed action.
pub fn capture_decision(
    prompter: &mut dyn Prompter,
    config: &GovernanceConfig,
    request: &CaptureRequest<'_>,
) -> Capture {
    let caps = config.capabilities();
    let touched = repo_relative_paths(request);

    if caps.docs_only_mode && config.docs_only {
        let offending: Vec<String> = touched.iter().filter(|p| !is_doc_file(p)).cloned().collect();
        if !offending.is_empty() {
            prompter.warn(&format!(
                "Docs-only mode: only documentation files may change. Rejected: {}",
                offending.join(", ")
            ));
            return Capture::Aborted(AbortReason::DocsOnly(offending));
        }
    }

    if !config.enabled {
        return match config.when_disabled {
            DisabledBehavior::Skip => Capture::Skipped,
            DisabledBehavior::AutoApprove => Capture::Decided(DecisionCaptureResult::auto(DISABLED_NOTE)),
        };
    }

    if !request.force_decision && should_auto_approve(request.summary, config, &caps) {
        return Capture::Decided(DecisionCaptureResult::auto(AUTO_APPROVE_NOTE));
    }

    match interview(prompter, &caps, request, &touched) {
        Some(result) => Capture::Decided(result),
        None => Capture::Aborted(AbortReason::Cancelled),
    }
}

fn repo_relative_paths(request: &CaptureRequest<'_>) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    let all = std::iter::once(request.summary.path.as_str())
        .chain(request.files_touched.iter().map(String::as_str));
    for raw in all {
        let raw = raw.strip_prefix("file://").unwrap_or(raw);
        let p = Path::new(raw);
        let rel = if p.is_absolute() {
            p.strip_prefix(request.repo_root).unwrap_or(p)
        } else {
            p
        };
        let rel = normalize_path(&rel.to_string_lossy());
        if !rel.is_empty() && !paths.contains(&rel) {
            paths.push(rel);
        }
    }
    paths
}

/// Steps 4 to 7. `None` on any cancellation.
fn interview(
    prompter: &mut dyn Prompter,
    caps: &Capabilities,
    request: &CaptureRequest<'_>,
    touched: &[String],
) -> Option<DecisionCaptureResult> {
    let mut plan: Option<PlanInfo> = None;
    let mut out_of_scope: Vec<String> = Vec::new();

    if caps.scope_enforcement && is_non_trivial(request.summary, caps) {
        plan = plan::active_plan(request.repo_root);
        if plan.is_none() {
            plan = offer_plan(prompter, request.repo_root);
        }
        match &plan {
            None => {}
            Some(p) if p.scope_items.is_empty() => {
                prompter.warn(&format!(
                    "Active plan \"{}\" declares no scope; scope is not enforced.",
                    p.title
                ));
            }
            Some(p) => {
                let matcher = ScopeMatcher::compile(&p.scope_items);
                out_of_scope = matcher.out_of_scope(touched.iter().map(String::as_str));
            }
        }
        if !out_of_scope.is_empty() {
            prompter.warn(&format!(
                "Outside the scope of the active plan: {}",
                out_of_scope.join(", ")
            ));
            let choice = prompter.choose(
                "Proceed under design classification?",
                &["Proceed as design", "Abort"],
            )?;
            if choice != 0 {
                return None;
            }
        }
    }

    for hint in request.hints {
        prompter.info(hint);
    }

    let predictability = if out_of_scope.is_empty() {
        let options = [Predictability::Predictable, Predictability::Design];
        let labels = options.map(|p| p.as_str());
        *options.get(prompter.choose("Classify this change", &labels)?)?
    } else {
        Predictability::Design
    };

    let scope_violated = !out_of_scope.is_empty();
    let validate_note = move |s: &str| -> Option<String> {
        let trimmed = s.trim();
        if trimmed.chars().count() < MIN_NOTE_CHARS {
            return Some(format!("Decision note must be at least {MIN_NOTE_CHARS} characters."));
        }
        if scope_violated && !trimmed.to_lowercase().contains(OUT_OF_SCOPE_MARKER) {
            return Some(format!("Decision note must mention \"{OUT_OF_SCOPE_MARKER}\"."));
        }
        None
    };
    let decision_note = prompter
        .input("Decision note (why this change?)", &validate_note)?
        .trim()
        .to_string();

    let (approvals, verification) = if predictability == Predictability::Design {
        let (approval, verification) = design_evidence(prompter)?;
        (Some(vec![approval]), Some(verification))
    } else {
        (None, None)
    };

    Some(DecisionCaptureResult {
        decision_note,
        predictability,
        auto_approved: false,
        plan_path: plan.as_ref().map(|p| p.path.clone()),
        plan_title: plan.as_ref().map(|p| p.title.clone()),
        out_of_scope_paths: (!out_of_scope.is_empty()).then_some(out_of_scope),
        approvals,
        verification,
    })
}

/// No active plan: warn and offer to create or select one. Dismissing the
/// offer continues without a plan.
fn offer_plan(prompter: &mut dyn Prompter, repo_root: &Path) -> Option<PlanInfo> {
    prompter.warn("No active plan; this non-trivial change is not checked against a scope.");
    let choice = prompter.choose(
        "Continue without a plan?",
        &["Continue", "Create plan", "Set active plan"],
    );
    let rel = match choice {
        Some(1) => {
            let title = prompter.input("Plan title", &non_blank)?;
            match plan::create_plan(repo_root, &title) {
                Ok(rel) => rel,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot create plan");
                    return None;
                }
            }
        }
        Some(2) => prompter.input("Plan path (repository-relative)", &non_blank)?,
        _ => return None,
    };
    if let Err(e) = plan::set_active_plan(repo_root, rel.trim()) {
        tracing::warn!(error = %e, "cannot set active plan");
        return None;
    }
    prompter.info(&format!("Active plan: {}", rel.trim()));
    plan::active_plan(repo_root)
}

fn non_blank(s: &str) -> Option<String> {
    s.trim().is_empty().then(|| "Value must not be empty.".to_string())
}

fn min_chars(s: &str, what: &str) -> Option<String> {
    (s.trim().chars().count() < MIN_APPROVAL_CHARS)
        .then(|| format!("{what} must be at least {MIN_APPROVAL_CHARS} characters."))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}

fn design_evidence(prompter: &mut dyn Prompter) -> Option<(Approval, Verification)> {
    let by = prompter.input("Approved by", &|s: &str| min_chars(s, "Approver"))?;
    let evidence = prompter.input("Approval evidence (link, ticket, review)", &|s: &str| {
        min_chars(s, "Evidence")
    })?;
    let tests = prompter.input("Verification tests (comma-separated)", &|s: &str| {
        split_list(s)
            .is_empty()
            .then(|| "At least one test identifier is required.".to_string())
    })?;
    let benchmarks = prompter.input("Benchmarks (comma-separated, optional)", &|_: &str| None)?;

    let approval = Approval {
        by: by.trim().to_string(),
        role: Some("approver".to_string()),
        decision: Some("approve".to_string()),
        timestamp: Some(now_rfc3339()),
        evidence: Some(evidence.trim().to_string()),
    };
    let verification = Verification {
        tests: split_list(&tests),
        benchmarks: split_list(&benchmarks),
    };
    Some((approval, verification))
}
