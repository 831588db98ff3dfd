//! Decision-log records.
//!
//! Two shapes share one JSONL file: the flat v1 record and the nested v2
//! record. New lines always carry `"schemaVersion": 2`. Lines without the
//! discriminator are classified once, here, and every reader works on the
//! canonical [`DecisionEntry`].

use crate::error::RecordError;
use ratify_core::types::{Approval, DiffStats, Impact, Predictability, Verification, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys that only the nested shape has.
const V2_KEYS: &[&str] = &["classification", "rationale", "change"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    #[serde(default)]
    pub head_before: Option<String>,
    #[serde(default)]
    pub head_after: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub dirty: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInfo {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub files_touched: Vec<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub diff_stats: DiffStats,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub out_of_scope_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInfo {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub predictability: Predictability,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub impact: Impact,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub risk_domains: Vec<String>,
    #[serde(default)]
    pub safety_critical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approved: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rationale {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub decision_note: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub ai_action_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traceability {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub risks: Vec<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub tickets: Vec<String>,
}

/// Canonical (v2) decision record. Immutable once written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub workspace_root: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub repo_root: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub git: GitInfo,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub operation: OperationInfo,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub change: ChangeInfo,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub classification: ClassificationInfo,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub rationale: Rationale,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub verification: Verification,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub approvals: Vec<Approval>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub traceability: Traceability,
}

/// Legacy flat record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryV1 {
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub workspace_root: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub repo_root: String,
    #[serde(default)]
    pub git_head: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub predictability: Predictability,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub decision_note: String,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub plan_path: Option<String>,
    #[serde(default)]
    pub plan_title: Option<String>,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub diff_stats: DiffStats,
    #[serde(default, deserialize_with = "ratify_core::types::null_as_default")]
    pub ai_action_summary: String,
}

impl EntryV1 {
    /// Lift into the nested shape. Fields v1 never had stay unknown/empty.
    pub fn into_v2(self, id: Option<String>) -> DecisionEntry {
        DecisionEntry {
            schema_version: SCHEMA_VERSION,
            id,
            timestamp: self.timestamp,
            workspace_root: self.workspace_root,
            repo_root: self.repo_root,
            git: GitInfo {
                head_before: None,
                head_after: self.git_head,
                branch: None,
                dirty: None,
            },
            operation: OperationInfo {
                kind: self.operation_type.clone(),
                operation_type: self.operation_type,
            },
            change: ChangeInfo {
                files_touched: self.files_touched,
                diff_stats: self.diff_stats,
                out_of_scope_paths: Vec::new(),
            },
            classification: ClassificationInfo {
                predictability: self.predictability,
                impact: Impact::Unknown,
                risk_domains: Vec::new(),
                safety_critical: None,
                auto_approved: None,
            },
            rationale: Rationale {
                decision_note: self.decision_note,
                ai_action_summary: self.ai_action_summary,
                plan_path: self.plan_path,
                plan_title: self.plan_title,
            },
            ..DecisionEntry::default()
        }
    }
}

/// One parsed log line, tagged by schema generation.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    V1(EntryV1),
    V2(DecisionEntry),
}

impl LogRecord {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let obj = value.as_object().ok_or(RecordError::NotAnObject)?;
        let version = match obj.get("schemaVersion").and_then(Value::as_u64) {
            Some(v) => v,
            None if V2_KEYS.iter().any(|k| obj.contains_key(*k)) => 2,
            None => 1,
        };
        match version {
            1 => Ok(LogRecord::V1(serde_json::from_value(value)?)),
            2 => {
                let mut entry: DecisionEntry = serde_json::from_value(value)?;
                entry.schema_version = SCHEMA_VERSION;
                Ok(LogRecord::V2(entry))
            }
            other => Err(RecordError::UnsupportedVersion(other)),
        }
    }

    /// Schema generation the line was written in.
    pub fn schema_version(&self) -> u32 {
        match self {
            LogRecord::V1(_) => 1,
            LogRecord::V2(_) => SCHEMA_VERSION,
        }
    }

    /// Migrate to the canonical shape. v1 records get no id.
    pub fn into_entry(self) -> DecisionEntry {
        match self {
            LogRecord::V1(v1) => v1.into_v2(None),
            LogRecord::V2(entry) => entry,
        }
    }

    pub fn summarize(self) -> DecisionSummary {
        let schema_version = self.schema_version();
        DecisionSummary::from_entry(schema_version, self.into_entry())
    }
}

/// Flat projection returned by recent-decision reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub timestamp: String,
    pub operation_type: String,
    pub predictability: Predictability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approved: Option<bool>,
    pub impact: Impact,
    pub decision_note: String,
    pub ai_action_summary: String,
    pub files_touched: Vec<String>,
    pub lines_added: u64,
    pub lines_removed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_head: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl DecisionSummary {
    fn from_entry(schema_version: u32, e: DecisionEntry) -> Self {
        let operation_type = e
            .operation
            .kind
            .or(e.operation.operation_type)
            .unwrap_or_default();
        Self {
            schema_version,
            id: non_empty(e.id),
            timestamp: e.timestamp,
            operation_type,
            predictability: e.classification.predictability,
            auto_approved: e.classification.auto_approved,
            impact: e.classification.impact,
            decision_note: e.rationale.decision_note,
            ai_action_summary: e.rationale.ai_action_summary,
            files_touched: e.change.files_touched,
            lines_added: e.change.diff_stats.lines_added,
            lines_removed: e.change.diff_stats.lines_removed,
            plan_path: non_empty(e.rationale.plan_path),
            plan_title: non_empty(e.rationale.plan_title),
            git_head: e.git.head_after,
        }
    }
}
