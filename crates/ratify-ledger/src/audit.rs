//! CI gate: design-level decisions must carry sign-off and evidence.

use crate::entry::LogRecord;
use crate::error::LogError;
use crate::store::read_all_strict;
use ratify_core::types::Predictability;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFailure {
    pub line: usize,
    pub id: Option<String>,
    pub reason: &'static str,
}

impl fmt::Display for AuditFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} (id={}): {}",
            self.line,
            self.id.as_deref().unwrap_or("<no id>"),
            self.reason
        )
    }
}

pub fn audit_records(records: Vec<(usize, LogRecord)>) -> Vec<AuditFailure> {
    let mut failures = Vec::new();
    for (line, record) in records {
        let entry = record.into_entry();
        if entry.classification.predictability != Predictability::Design {
            continue;
        }
        if entry.approvals.is_empty() {
            failures.push(AuditFailure {
                line,
                id: entry.id.clone(),
                reason: "missing approvals",
            });
        }
        if entry.verification.is_empty() {
            failures.push(AuditFailure {
                line,
                id: entry.id.clone(),
                reason: "missing verification tests or benchmarks",
            });
        }
    }
    failures
}

/// Check every record of a log file. Malformed lines are errors.
pub fn audit_file(path: &Path) -> Result<Vec<AuditFailure>, LogError> {
    Ok(audit_records(read_all_strict(path)?))
}
