use serde::{Deserialize, Deserializer, Serialize};

/// Schema version written into every new decision-log record.
pub const SCHEMA_VERSION: u32 = 2;

/// Treat an explicit JSON `null` like a missing key. Older tooling wrote
/// `"timestamp": null` and `"diffStats": null` into otherwise valid lines.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Classification of a change: mechanical, or requiring human judgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predictability {
    Predictable,
    Design,
    /// Legacy or migrated records that never carried a label.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Predictability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predictability::Predictable => "predictable",
            Predictability::Design => "design",
            Predictability::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Predictability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inferred blast radius of a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
            Impact::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Added/removed line counts of one governed action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines_added: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines_removed: u64,
}

impl DiffStats {
    /// Build stats from raw counts. Negative inputs are clamped to 0.
    pub fn new(lines_added: i64, lines_removed: i64) -> Self {
        Self {
            lines_added: lines_added.max(0) as u64,
            lines_removed: lines_removed.max(0) as u64,
        }
    }

    pub fn changed_lines(&self) -> u64 {
        self.lines_added.saturating_add(self.lines_removed)
    }
}

/// A single sign-off on a design-level change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Evidence that a change was exercised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub benchmarks: Vec<String>,
}

impl Verification {
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.benchmarks.is_empty()
    }
}

/// Outcome of one decision capture, consumed exactly once by the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionCaptureResult {
    pub decision_note: String,
    pub predictability: Predictability,
    pub auto_approved: bool,
    pub plan_path: Option<String>,
    pub plan_title: Option<String>,
    pub out_of_scope_paths: Option<Vec<String>>,
    pub approvals: Option<Vec<Approval>>,
    pub verification: Option<Verification>,
}

impl DecisionCaptureResult {
    /// A result that needed no human interaction.
    pub fn auto(note: &str) -> Self {
        Self {
            decision_note: note.to_string(),
            predictability: Predictability::Predictable,
            auto_approved: true,
            plan_path: None,
            plan_title: None,
            out_of_scope_paths: None,
            approvals: None,
            verification: None,
        }
    }
}

/// Current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
