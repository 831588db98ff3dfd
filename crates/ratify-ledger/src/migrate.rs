//! v1 → v2 log migration.

use crate::entry::LogRecord;
use crate::error::LogError;
use crate::store::read_log;
use ratify_core::paths::write_atomic;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub converted: usize,
    pub passed_through: usize,
}

/// Rewrite every line of `content` in the v2 shape. v1 records get a fresh
/// id; v2 lines are kept byte for byte.
pub fn migrate_lines(content: &str) -> Result<(String, MigrationStats), LogError> {
    let mut out = String::with_capacity(content.len());
    let mut stats = MigrationStats::default();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let record = LogRecord::parse(line).map_err(|source| LogError::Record {
            line: idx + 1,
            source,
        })?;
        match record {
            LogRecord::V1(v1) => {
                let entry = v1.into_v2(Some(uuid::Uuid::new_v4().to_string()));
                let json = serde_json::to_string(&entry).map_err(|e| LogError::Record {
                    line: idx + 1,
                    source: e.into(),
                })?;
                out.push_str(&json);
                stats.converted += 1;
            }
            LogRecord::V2(_) => {
                out.push_str(line);
                stats.passed_through += 1;
            }
        }
        out.push('\n');
    }
    Ok((out, stats))
}

/// Migrate `input` into `output`. Nothing is written if any line is invalid.
pub fn migrate_file(input: &Path, output: &Path) -> anyhow::Result<MigrationStats> {
    let content = read_log(input)?;
    let (migrated, stats) = migrate_lines(&content)?;
    write_atomic(output, migrated.as_bytes())?;
    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        converted = stats.converted,
        passed_through = stats.passed_through,
        "log migrated"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const V1: &str = r#"{"timestamp":"2025-03-01T10:00:00Z","workspaceRoot":"/w","repoRoot":"/w","gitHead":"abc","operationType":"accept","predictability":"design","decisionNote":"split module","filesTouched":["src/a.rs"],"diffStats":{"linesAdded":12,"linesRemoved":4},"aiActionSummary":"split"}"#;
    const V2: &str = r#"{"schemaVersion":2,"id":"keep-me","timestamp":"2025-03-02T10:00:00Z","rationale":{"decisionNote":"already new"}}"#;

    #[test]
    fn converts_v1_and_keeps_v2() {
        let input = format!("{V1}\n\n{V2}\n");
        let (out, stats) = migrate_lines(&input).unwrap();
        assert_eq!(stats, MigrationStats { converted: 1, passed_through: 1 });

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["schemaVersion"], 2);
        assert!(first["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(first["git"]["headAfter"], "abc");
        assert!(first["git"]["branch"].is_null());
        assert_eq!(first["operation"]["type"], "accept");
        assert_eq!(first["operation"]["operationType"], "accept");
        assert_eq!(first["change"]["diffStats"]["linesAdded"], 12);
        assert_eq!(first["classification"]["predictability"], "design");
        assert_eq!(first["classification"]["impact"], "unknown");
        assert!(first["classification"]["safetyCritical"].is_null());
        assert_eq!(first["rationale"]["decisionNote"], "split module");
        assert_eq!(lines[1], V2);
    }

    #[test]
    fn invalid_line_reports_line_number() {
        let input = format!("{V1}\nnot json\n");
        match migrate_lines(&input) {
            Err(LogError::Record { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected line error, got {other:?}"),
        }
    }

    #[test]
    fn migrate_file_writes_nothing_on_error() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.jsonl");
        let output = tmp.path().join("out.jsonl");
        std::fs::write(&input, "{oops\n").unwrap();
        assert!(migrate_file(&input, &output).is_err());
        assert!(!output.exists());

        std::fs::write(&input, format!("{V1}\n")).unwrap();
        let stats = migrate_file(&input, &output).unwrap();
        assert_eq!(stats.converted, 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap().lines().count(), 1);
    }
}
