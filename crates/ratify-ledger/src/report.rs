//! Markdown and HTML rendering of a decision log.

use crate::entry::DecisionEntry;
use crate::store::read_all_lenient;
use ratify_core::paths::write_atomic;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const TITLE: &str = "Decision Log Report";

/// Parse `+01:00` / `-05:30` style offsets.
pub fn parse_utc_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(s.trim(), &format)
        .map_err(|e| anyhow::anyhow!("invalid UTC offset {s:?} (expected e.g. +01:00): {e}"))
}

/// Entry timestamp shifted to `offset`; unparseable timestamps are returned verbatim.
pub fn local_time(timestamp: &str, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::parse(timestamp, &Rfc3339)
        .ok()
        .and_then(|dt| dt.to_offset(offset).format(&format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn operation(e: &DecisionEntry) -> &str {
    e.operation
        .kind
        .as_deref()
        .or(e.operation.operation_type.as_deref())
        .unwrap_or_default()
}

struct Totals {
    added: u64,
    removed: u64,
}

impl Totals {
    fn of(entries: &[DecisionEntry]) -> Self {
        entries.iter().fold(Self { added: 0, removed: 0 }, |t, e| Self {
            added: t.added + e.change.diff_stats.lines_added,
            removed: t.removed + e.change.diff_stats.lines_removed,
        })
    }

    fn net(&self) -> i128 {
        self.added as i128 - self.removed as i128
    }
}

/// Rendered report bodies.
#[derive(Debug, Clone)]
pub struct Report {
    pub markdown: String,
    pub html: String,
    pub entries: usize,
}

/// Render entries sorted by timestamp.
pub fn render(mut entries: Vec<DecisionEntry>, source: &str, offset: UtcOffset) -> Report {
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    let totals = Totals::of(&entries);

    let mut md = String::new();
    let _ = writeln!(md, "# {TITLE}\n");
    let _ = writeln!(md, "**Source file:** `{source}`  ");
    let _ = writeln!(md, "**Entries:** {}  ", entries.len());
    let _ = writeln!(
        md,
        "**Net LOC delta (added - removed):** {} - {} = **{:+}**\n",
        totals.added,
        totals.removed,
        totals.net()
    );
    md.push_str("| Local time | Predictability | Operation | Files | + | − | Decision note |\n");
    md.push_str("|---|---|---|---|---:|---:|---|\n");
    for e in &entries {
        let _ = writeln!(
            md,
            "| {} | {} | {} | `{}` | {} | {} | {} |",
            local_time(&e.timestamp, offset),
            e.classification.predictability,
            escape_cell(operation(e)),
            escape_cell(&e.change.files_touched.join(", ")),
            e.change.diff_stats.lines_added,
            e.change.diff_stats.lines_removed,
            escape_cell(&e.rationale.decision_note),
        );
    }

    let mut rows = String::new();
    for e in &entries {
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><code>{}</code></td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            escape_html(&local_time(&e.timestamp, offset)),
            e.classification.predictability,
            escape_html(operation(e)),
            escape_html(&e.change.files_touched.join(", ")),
            e.change.diff_stats.lines_added,
            e.change.diff_stats.lines_removed,
            escape_html(&e.rationale.decision_note),
        );
    }
    let html = format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>{TITLE}</title>
<style>
body{{font-family:system-ui,sans-serif;margin:40px;line-height:1.35;}}
table{{border-collapse:collapse;width:100%;}}
th,td{{border:1px solid #ddd;padding:8px;vertical-align:top;}}
th{{background:#f5f5f5;text-align:left;}}
.num{{text-align:right;}}
code{{background:#f1f1f1;padding:2px 4px;border-radius:4px;}}
</style></head><body>
<h1>{TITLE}</h1>
<p><b>Source file:</b> <code>{source}</code><br>
<b>Entries:</b> {count}<br>
<b>Net LOC delta:</b> {net:+}</p>
<table>
<thead><tr><th>Local time</th><th>Predictability</th><th>Operation</th><th>Files</th><th class="num">+</th><th class="num">−</th><th>Decision note</th></tr></thead>
<tbody>
{rows}</tbody></table>
</body></html>
"#,
        source = escape_html(source),
        count = entries.len(),
        net = totals.net(),
    );

    Report {
        markdown: md,
        html,
        entries: entries.len(),
    }
}

/// Render `log` into `<out_base>.md` and `<out_base>.html`.
pub fn write_report(
    log: &Path,
    out_base: &Path,
    offset: UtcOffset,
) -> anyhow::Result<(PathBuf, PathBuf, usize)> {
    let entries = read_all_lenient(log)?
        .into_iter()
        .map(|r| r.into_entry())
        .collect();
    let report = render(entries, &log.display().to_string(), offset);

    let md_path = with_suffix(out_base, "md");
    let html_path = with_suffix(out_base, "html");
    write_atomic(&md_path, report.markdown.as_bytes())?;
    write_atomic(&html_path, report.html.as_bytes())?;
    Ok((md_path, html_path, report.entries))
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogRecord;

    fn entry(line: &str) -> DecisionEntry {
        LogRecord::parse(line).unwrap().into_entry()
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_utc_offset("+01:00").unwrap().whole_minutes(), 60);
        assert_eq!(parse_utc_offset("-05:30").unwrap().whole_minutes(), -330);
        assert!(parse_utc_offset("01").is_err());
    }

    #[test]
    fn local_time_shifts_or_passes_through() {
        let plus_one = parse_utc_offset("+01:00").unwrap();
        assert_eq!(local_time("2025-01-02T23:30:00Z", plus_one), "2025-01-03 00:30:00");
        assert_eq!(local_time("yesterday", plus_one), "yesterday");
    }

    #[test]
    fn render_sorts_and_escapes() {
        let later = entry(
            r#"{"schemaVersion":2,"timestamp":"2025-01-02T10:00:00Z","operation":{"type":"apply"},"change":{"filesTouched":["b.ts"],"diffStats":{"linesAdded":1,"linesRemoved":9}},"classification":{"predictability":"design"},"rationale":{"decisionNote":"use <Tag> | pipes & co"}}"#,
        );
        let earlier = entry(
            r#"{"timestamp":"2025-01-01T10:00:00Z","operationType":"accept","predictability":"predictable","decisionNote":"first","filesTouched":["a.ts"],"diffStats":{"linesAdded":3,"linesRemoved":0}}"#,
        );
        let report = render(vec![later, earlier], "log.jsonl", UtcOffset::UTC);
        assert_eq!(report.entries, 2);

        let md = &report.markdown;
        assert!(md.contains("**Entries:** 2"));
        assert!(md.contains("4 - 9 = **-5**"));
        let first = md.find("2025-01-01 10:00:00").unwrap();
        let second = md.find("2025-01-02 10:00:00").unwrap();
        assert!(first < second);
        assert!(md.contains("| accept |"));
        assert!(md.contains(r"use <Tag> \| pipes & co"));

        assert!(report.html.contains("use &lt;Tag&gt; | pipes &amp; co"));
        assert!(report.html.contains("<b>Net LOC delta:</b> -5"));
    }

    #[test]
    fn write_report_creates_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log.jsonl");
        std::fs::write(
            &log,
            "{\"timestamp\":\"2025-01-01T00:00:00Z\",\"decisionNote\":\"n\"}\n{torn",
        )
        .unwrap();
        let (md, html, count) =
            write_report(&log, &tmp.path().join("out/report"), UtcOffset::UTC).unwrap();
        assert_eq!(count, 1);
        assert!(md.ends_with("report.md"));
        assert!(std::fs::read_to_string(html).unwrap().starts_with("<!doctype html>"));
    }
}
