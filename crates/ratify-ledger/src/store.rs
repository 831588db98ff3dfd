//! Append-only decision log.
//!
//! Writers append one self-contained JSON line per decision with a single
//! `write_all` on a file opened in append mode. Readers skip lines they
//! cannot parse, so a torn final line from a racing writer is harmless.

use crate::entry::{
    ChangeInfo, ClassificationInfo, DecisionEntry, DecisionSummary, GitInfo, LogRecord,
    OperationInfo, Rationale, Traceability,
};
use crate::error::LogError;
use crate::git::{self, GitMeta};
use crate::redact::{sanitize, sanitize_all, sanitize_opt};
use ratify_core::classify::RiskAssessment;
use ratify_core::config::{GovernanceConfig, RecentOrder};
use ratify_core::paths::RatifyPaths;
use ratify_core::summary::normalize_path;
use ratify_core::types::{
    now_rfc3339, Approval, DecisionCaptureResult, DiffStats, Impact, Verification, SCHEMA_VERSION,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Facts about a governed action that the capture result does not carry.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    /// `apply`, `accept`, ...
    pub operation_type: String,
    /// Absolute or repository-relative paths; stored repository-relative.
    pub files_touched: Vec<String>,
    pub diff_stats: DiffStats,
    pub ai_action_summary: String,
    /// Commit observed before the edit was applied.
    pub head_before: Option<String>,
    pub risk: RiskAssessment,
}

/// The audit trail of one workspace.
#[derive(Debug, Clone)]
pub struct AuditLog {
    workspace_root: PathBuf,
    config: GovernanceConfig,
}

impl AuditLog {
    pub fn new(workspace_root: impl Into<PathBuf>, config: GovernanceConfig) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Root that governs `context_file`: the nearest ancestor holding
    /// `.ratify/`, then the workspace itself when the file lies inside it,
    /// then the enclosing git repository. Plans, config and the log all
    /// resolve against this one root.
    pub fn repo_root_for(&self, context_file: &Path) -> PathBuf {
        let file = strip_file_scheme(context_file);
        let file = if file.is_absolute() {
            file
        } else {
            self.workspace_root.join(file)
        };
        let mut dir = if file.is_dir() {
            file.as_path()
        } else {
            file.parent().unwrap_or(&self.workspace_root)
        };
        // New files may live in directories that do not exist yet.
        while !dir.is_dir() {
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return self.workspace_root.clone(),
            }
        }
        if let Some(root) = RatifyPaths::find_root(dir) {
            return root;
        }
        if dir.starts_with(&self.workspace_root) {
            return self.workspace_root.clone();
        }
        git::repo_root(dir).unwrap_or_else(|| self.workspace_root.clone())
    }

    /// Configured log file for a repository.
    pub fn log_path(&self, repo_root: &Path) -> PathBuf {
        RatifyPaths::discover(repo_root).log_file(&self.config.log_path)
    }

    /// Sanitize, version and append one decision. Never fails; the return
    /// value only says whether a line was written.
    pub fn record(
        &self,
        pending: &PendingDecision,
        capture: &DecisionCaptureResult,
        context_file: &Path,
    ) -> bool {
        match self.try_record(pending, capture, context_file) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "decision recorded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to record decision");
                false
            }
        }
    }

    fn try_record(
        &self,
        pending: &PendingDecision,
        capture: &DecisionCaptureResult,
        context_file: &Path,
    ) -> anyhow::Result<PathBuf> {
        let repo_root = self.repo_root_for(context_file);
        let ttl = self.config.dirty_cache_ttl_seconds.map(Duration::from_secs);
        let meta = GitMeta::collect(&repo_root, ttl);
        let entry = self.build_entry(&repo_root, &meta, pending, capture);
        let path = self.log_path(&repo_root);
        append_entry(&path, &entry)?;
        Ok(path)
    }

    /// Assemble the canonical record. Every free-text field is sanitized.
    pub fn build_entry(
        &self,
        repo_root: &Path,
        meta: &GitMeta,
        pending: &PendingDecision,
        capture: &DecisionCaptureResult,
    ) -> DecisionEntry {
        let files_touched = pending
            .files_touched
            .iter()
            .map(|f| repo_relative(repo_root, f))
            .collect();
        let out_of_scope_paths = capture
            .out_of_scope_paths
            .as_deref()
            .map(sanitize_all)
            .unwrap_or_default();
        let approvals = capture
            .approvals
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|a| Approval {
                by: sanitize(&a.by),
                role: a.role.clone(),
                decision: a.decision.clone(),
                timestamp: a.timestamp.clone(),
                evidence: sanitize_opt(a.evidence.as_deref()),
            })
            .collect();
        let verification = capture
            .verification
            .as_ref()
            .map(|v| Verification {
                tests: sanitize_all(&v.tests),
                benchmarks: sanitize_all(&v.benchmarks),
            })
            .unwrap_or_default();
        let impact = if capture.auto_approved {
            Impact::Low
        } else {
            pending.risk.impact
        };

        DecisionEntry {
            schema_version: SCHEMA_VERSION,
            id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp: now_rfc3339(),
            workspace_root: self.workspace_root.display().to_string(),
            repo_root: repo_root.display().to_string(),
            git: GitInfo {
                head_before: pending.head_before.clone(),
                head_after: meta.head.clone(),
                branch: meta.branch.clone(),
                dirty: meta.dirty,
            },
            operation: OperationInfo {
                kind: Some(pending.operation_type.clone()),
                operation_type: Some(pending.operation_type.clone()),
            },
            change: ChangeInfo {
                files_touched,
                diff_stats: pending.diff_stats,
                out_of_scope_paths,
            },
            classification: ClassificationInfo {
                predictability: capture.predictability,
                impact,
                risk_domains: pending.risk.risk_domains.clone(),
                safety_critical: Some(pending.risk.safety_critical),
                auto_approved: Some(capture.auto_approved),
            },
            rationale: Rationale {
                decision_note: sanitize(&capture.decision_note),
                ai_action_summary: sanitize(&pending.ai_action_summary),
                plan_path: capture.plan_path.as_deref().map(normalize_path),
                plan_title: sanitize_opt(capture.plan_title.as_deref()),
            },
            verification,
            approvals,
            traceability: Traceability::default(),
        }
    }

    /// Last `n` decisions of the log `context_file` belongs to.
    pub fn read_recent(&self, n: usize, context_file: &Path) -> Vec<DecisionSummary> {
        let repo_root = self.repo_root_for(context_file);
        read_recent_from(&self.log_path(&repo_root), n, self.config.recent_order)
    }
}

fn strip_file_scheme(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match raw.strip_prefix("file://") {
        Some(rest) => PathBuf::from(rest),
        None => path.to_path_buf(),
    }
}

/// Repository-relative, forward-slash form of a touched path.
fn repo_relative(repo_root: &Path, file: &str) -> String {
    let file = file.strip_prefix("file://").unwrap_or(file);
    let p = Path::new(file);
    let rel = if p.is_absolute() {
        p.strip_prefix(repo_root).unwrap_or(p)
    } else {
        p
    };
    normalize_path(&rel.to_string_lossy())
}

/// Append one record as a single line.
pub fn append_entry(path: &Path, entry: &DecisionEntry) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Up to `n` normalized summaries from the tail of the log. Missing or
/// unreadable files yield an empty list; malformed lines are skipped.
pub fn read_recent_from(path: &Path, n: usize, order: RecentOrder) -> Vec<DecisionSummary> {
    if n == 0 || !path.exists() {
        return Vec::new();
    }
    let content = match read_log(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "cannot read decision log");
            return Vec::new();
        }
    };
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    let mut out: Vec<DecisionSummary> = lines[start..]
        .iter()
        .filter_map(|line| match LogRecord::parse(line) {
            Ok(record) => Some(record.summarize()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping malformed log line");
                None
            }
        })
        .collect();
    if order == RecentOrder::NewestFirst {
        out.reverse();
    }
    out
}

/// Whole log as text. Invalid UTF-8 (a line torn inside a multi-byte
/// character) becomes U+FFFD and fails to parse on its own line only.
pub fn read_log(path: &Path) -> Result<String, LogError> {
    let bytes = std::fs::read(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Every record with its 1-based line number. The first malformed line is
/// an error.
pub fn read_all_strict(path: &Path) -> Result<Vec<(usize, LogRecord)>, LogError> {
    let content = read_log(path)?;
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = LogRecord::parse(line).map_err(|source| LogError::Record {
            line: idx + 1,
            source,
        })?;
        records.push((idx + 1, record));
    }
    Ok(records)
}

/// Every readable record; malformed lines are skipped.
pub fn read_all_lenient(path: &Path) -> Result<Vec<LogRecord>, LogError> {
    let content = read_log(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| LogRecord::parse(l).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratify_core::types::Predictability;

    fn pending(file: &str) -> PendingDecision {
        PendingDecision {
            operation_type: "apply".into(),
            files_touched: vec![file.to_string()],
            diff_stats: DiffStats::new(3, 1),
            ai_action_summary: "tidy helper".into(),
            head_before: None,
            risk: RiskAssessment {
                impact: Impact::Medium,
                risk_domains: vec!["auth".into()],
                safety_critical: true,
            },
        }
    }

    fn capture(note: &str, predictability: Predictability) -> DecisionCaptureResult {
        DecisionCaptureResult {
            decision_note: note.into(),
            predictability,
            auto_approved: false,
            plan_path: None,
            plan_title: None,
            out_of_scope_paths: None,
            approvals: None,
            verification: None,
        }
    }

    #[test]
    fn record_then_read_recent_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::new(tmp.path(), GovernanceConfig::default());
        let file = tmp.path().join("src/a.ts");

        let notes = ["first decision here", "second decision here", "third decision here"];
        for (i, note) in notes.iter().enumerate() {
            let p = if i == 1 {
                Predictability::Design
            } else {
                Predictability::Predictable
            };
            assert!(log.record(&pending(&file.to_string_lossy()), &capture(note, p), &file));
        }

        let recent = log.read_recent(3, &file);
        assert_eq!(recent.len(), 3);
        for (s, note) in recent.iter().zip(notes) {
            assert_eq!(s.decision_note, note);
            assert_eq!(s.schema_version, 2);
            assert!(s.id.is_some());
            assert_eq!(s.files_touched, vec!["src/a.ts".to_string()]);
        }
        assert_eq!(recent[1].predictability, Predictability::Design);
        assert!(tmp.path().join(".ratify/decision-log.jsonl").exists());
    }

    #[test]
    fn recent_window_and_order() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GovernanceConfig {
            recent_order: RecentOrder::NewestFirst,
            ..GovernanceConfig::default()
        };
        let log = AuditLog::new(tmp.path(), config);
        let file = tmp.path().join("a.md");
        for note in ["one one one", "two two two", "three three"] {
            log.record(&pending("a.md"), &capture(note, Predictability::Predictable), &file);
        }
        let recent = log.read_recent(2, &file);
        let notes: Vec<_> = recent.iter().map(|s| s.decision_note.as_str()).collect();
        assert_eq!(notes, vec!["three three", "two two two"]);
    }

    #[test]
    fn missing_log_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::new(tmp.path(), GovernanceConfig::default());
        assert!(log.read_recent(10, &tmp.path().join("x")).is_empty());
    }

    #[test]
    fn malformed_and_mixed_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.jsonl");
        let v1 = r#"{"timestamp":"t1","operationType":"apply","predictability":"design","decisionNote":"legacy one","filesTouched":["a"],"diffStats":{"linesAdded":1,"linesRemoved":0},"aiActionSummary":""}"#;
        let content = format!("{v1}\n\n{{broken\n{v1}\n{{\"schemaVersion\":2,\"rationale\":");
        std::fs::write(&path, content).unwrap();

        let recent = read_recent_from(&path, 10, RecentOrder::OldestFirst);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].decision_note, "legacy one");
        assert_eq!(recent[0].schema_version, 1);

        assert_eq!(read_all_lenient(&path).unwrap().len(), 2);
        match read_all_strict(&path) {
            Err(LogError::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected line error, got {other:?}"),
        }
    }

    #[test]
    fn torn_multibyte_tail_skips_only_that_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.jsonl");
        let good = r#"{"schemaVersion":2,"timestamp":"t1","rationale":{"decisionNote":"kept … intact"}}"#;
        let mut bytes = format!("{good}\n").into_bytes();
        bytes.extend_from_slice(b"{\"schemaVersion\":2,\"rationale\":{\"decisionNote\":\"cut \xE2\x80");
        std::fs::write(&path, bytes).unwrap();

        let recent = read_recent_from(&path, 10, RecentOrder::OldestFirst);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].decision_note, "kept … intact");
        assert_eq!(read_all_lenient(&path).unwrap().len(), 1);
        match read_all_strict(&path) {
            Err(LogError::Record { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected line error, got {other:?}"),
        }
    }

    #[test]
    fn nested_ratify_dir_is_the_root_below_git_top_level() {
        let tmp = tempfile::tempdir().unwrap();
        let top = tmp.path();
        // Without git the nested workspace still has to win.
        let _ = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(top)
            .status();
        let pkg = top.join("pkg");
        RatifyPaths::discover(&pkg).ensure_layout().unwrap();

        let log = AuditLog::new(&pkg, GovernanceConfig::default());
        let file = pkg.join("src/other/file.ts");
        assert_eq!(log.repo_root_for(&file), pkg);
        assert!(log.record(
            &pending(&file.to_string_lossy()),
            &capture("nested workspace", Predictability::Predictable),
            &file
        ));
        assert!(pkg.join(".ratify/decision-log.jsonl").exists());
        assert!(!top.join(".ratify").exists());
        assert_eq!(log.read_recent(5, &file)[0].files_touched, vec!["src/other/file.ts".to_string()]);
    }

    #[test]
    fn entry_fields_are_sanitized() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::new(tmp.path(), GovernanceConfig::default());
        let mut c = capture(
            "rotate   token=abcdefabcdefabcdefabcdefabcdef12\n now",
            Predictability::Design,
        );
        c.approvals = Some(vec![Approval {
            by: "  alice  ".into(),
            role: Some("approver".into()),
            decision: Some("approve".into()),
            timestamp: None,
            evidence: Some("see PR 12".into()),
        }]);
        c.verification = Some(Verification {
            tests: vec!["auth::rotate".into()],
            benchmarks: vec![],
        });
        c.out_of_scope_paths = Some(vec!["src/other.ts".into()]);
        c.plan_title = Some("   ".into());

        let abs = tmp.path().join("src/auth/session.ts");
        let entry = log.build_entry(
            tmp.path(),
            &GitMeta::default(),
            &pending(&abs.to_string_lossy()),
            &c,
        );
        assert_eq!(entry.rationale.decision_note, "rotate token=[redacted] now");
        assert_eq!(entry.approvals[0].by, "alice");
        assert_eq!(entry.verification.tests, vec!["auth::rotate".to_string()]);
        assert_eq!(entry.change.files_touched, vec!["src/auth/session.ts".to_string()]);
        assert_eq!(entry.change.out_of_scope_paths, vec!["src/other.ts".to_string()]);
        assert!(entry.rationale.plan_title.is_none());
        assert_eq!(entry.classification.impact, Impact::Medium);
        assert_eq!(entry.classification.safety_critical, Some(true));
    }

    #[test]
    fn auto_approved_entries_are_low_impact() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AuditLog::new(tmp.path(), GovernanceConfig::default());
        let c = DecisionCaptureResult::auto("Auto-approved: small, low-risk change.");
        let entry = log.build_entry(tmp.path(), &GitMeta::default(), &pending("a.ts"), &c);
        assert_eq!(entry.classification.impact, Impact::Low);
        assert_eq!(entry.classification.auto_approved, Some(true));
        let line = serde_json::to_value(&entry).unwrap();
        assert_eq!(line["schemaVersion"], 2);
    }

    #[test]
    fn unwritable_log_fails_soft() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the log file should be.
        let blocked = tmp.path().join("blocked.jsonl");
        std::fs::create_dir_all(&blocked).unwrap();
        let config = GovernanceConfig {
            log_path: blocked.to_string_lossy().into_owned(),
            ..GovernanceConfig::default()
        };
        let log = AuditLog::new(tmp.path(), config);
        let file = tmp.path().join("a.ts");
        assert!(!log.record(&pending("a.ts"), &capture("note note", Predictability::Predictable), &file));
    }
}
