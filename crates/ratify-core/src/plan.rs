//! Markdown plan artifacts and the active-plan pointer.
//!
//! A plan looks like:
//!
//! ```text
//! # Plan: Split the renderer
//!
//! ## Scope
//! - src/renderer/**
//! - docs/renderer.md
//!
//! ## Steps
//! ...
//! ```

use crate::paths::{write_atomic, RatifyPaths};
use crate::types::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const UNTITLED_PLAN: &str = "Untitled Plan";
const MAX_TITLE_CHARS: usize = 120;

/// Parsed plan artifact. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInfo {
    /// Repository-relative path of the plan file.
    pub path: String,
    pub title: String,
    pub scope_items: Vec<String>,
}

/// `.ratify/active-plan.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlanPointer {
    pub path: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Parse plan markdown. Never fails; missing pieces fall back to defaults.
pub fn parse_plan(path: &str, content: &str) -> PlanInfo {
    PlanInfo {
        path: path.to_string(),
        title: parse_title(content),
        scope_items: parse_scope(content),
    }
}

fn parse_title(content: &str) -> String {
    let first = content.lines().next().unwrap_or_default().trim();
    let Some(heading) = first.strip_prefix("# ") else {
        return UNTITLED_PLAN.to_string();
    };
    let heading = heading.trim();
    let title = heading
        .strip_prefix("Plan:")
        .map(str::trim)
        .unwrap_or(heading);
    if title.is_empty() {
        return UNTITLED_PLAN.to_string();
    }
    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Bullet entries under `## Scope`, up to the next `## ` heading.
fn parse_scope(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_scope = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("## ") || trimmed == "##" {
            if in_scope {
                break;
            }
            in_scope = trimmed[2..].trim().eq_ignore_ascii_case("scope");
            continue;
        }
        if !in_scope {
            continue;
        }
        let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        else {
            continue;
        };
        let entry = rest.trim().trim_matches('`').trim();
        if !entry.is_empty() {
            items.push(entry.to_string());
        }
    }
    items
}

/// Read and parse a repository-relative plan file. `None` if unreadable.
pub fn read_plan(repo_root: &Path, rel_path: &str) -> Option<PlanInfo> {
    let full = repo_root.join(rel_path);
    match std::fs::read_to_string(&full) {
        Ok(content) => Some(parse_plan(rel_path, &content)),
        Err(e) => {
            tracing::warn!(path = %full.display(), error = %e, "cannot read plan");
            None
        }
    }
}

pub fn read_active_pointer(repo_root: &Path) -> Option<ActivePlanPointer> {
    let paths = RatifyPaths::discover(repo_root);
    let content = std::fs::read_to_string(&paths.active_plan_json).ok()?;
    match serde_json::from_str::<ActivePlanPointer>(&content) {
        Ok(p) if !p.path.trim().is_empty() => Some(p),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %paths.active_plan_json.display(), error = %e, "malformed active plan pointer");
            None
        }
    }
}

/// Resolve the active plan: pointer, then plan file.
pub fn active_plan(repo_root: &Path) -> Option<PlanInfo> {
    let pointer = read_active_pointer(repo_root)?;
    read_plan(repo_root, &pointer.path)
}

/// Point `.ratify/active-plan.json` at a repository-relative plan path.
pub fn set_active_plan(repo_root: &Path, rel_path: &str) -> anyhow::Result<ActivePlanPointer> {
    let paths = RatifyPaths::discover(repo_root);
    let pointer = ActivePlanPointer {
        path: crate::summary::normalize_path(rel_path),
        updated_at: now_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&pointer)?;
    write_atomic(&paths.active_plan_json, json.as_bytes())?;
    Ok(pointer)
}

/// Lowercase, dash-separated file stem for a plan title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "plan".to_string()
    } else {
        slug
    }
}

pub fn plan_template(title: &str) -> String {
    format!("# Plan: {title}\n\n## Scope\n\n## Steps\n\n1. \n")
}

/// Create `.ratify/plans/<slug>.md` from the template. Returns its
/// repository-relative path. An existing file is left untouched.
pub fn create_plan(repo_root: &Path, title: &str) -> anyhow::Result<String> {
    let paths = RatifyPaths::discover(repo_root);
    let file = paths.plans_dir.join(format!("{}.md", slugify(title)));
    if !file.exists() {
        write_atomic(&file, plan_template(title.trim()).as_bytes())?;
    }
    let rel = file
        .strip_prefix(repo_root)
        .unwrap_or(&file)
        .to_string_lossy()
        .replace('\\', "/");
    Ok(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = "# Plan: Split the renderer\n\
\n\
Some intro text.\n\
\n\
## Scope\n\
- src/renderer/**\n\
* `docs/renderer.md`\n\
-    \n\
not a bullet\n\
\n\
## Steps\n\
- src/should/not/appear\n";

    #[test]
    fn parses_title_and_scope() {
        let p = parse_plan("plans/a.md", PLAN);
        assert_eq!(p.title, "Split the renderer");
        assert_eq!(
            p.scope_items,
            vec!["src/renderer/**".to_string(), "docs/renderer.md".to_string()]
        );
    }

    #[test]
    fn missing_heading_defaults_title() {
        let p = parse_plan("x.md", "no heading here\n## Scope\n- a\n");
        assert_eq!(p.title, UNTITLED_PLAN);
        assert_eq!(p.scope_items, vec!["a".to_string()]);
        assert_eq!(parse_plan("x.md", "# Plan:   \n").title, UNTITLED_PLAN);
        assert_eq!(parse_plan("x.md", "").title, UNTITLED_PLAN);
    }

    #[test]
    fn title_truncated_to_limit() {
        let long = "x".repeat(300);
        let p = parse_plan("x.md", &format!("# Plan: {long}\n"));
        assert_eq!(p.title.chars().count(), 120);
    }

    #[test]
    fn no_scope_section_is_empty() {
        let p = parse_plan("x.md", "# Plan: T\n## Steps\n- a\n");
        assert!(p.scope_items.is_empty());
    }

    #[test]
    fn active_pointer_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(active_plan(tmp.path()).is_none());

        let rel = create_plan(tmp.path(), "Auth Rework!").unwrap();
        assert_eq!(rel, ".ratify/plans/auth-rework.md");
        set_active_plan(tmp.path(), &rel).unwrap();

        let plan = active_plan(tmp.path()).unwrap();
        assert_eq!(plan.title, "Auth Rework!");
        assert_eq!(plan.path, rel);
        assert!(plan.scope_items.is_empty());
    }

    #[test]
    fn dangling_pointer_resolves_to_none() {
        let tmp = tempfile::tempdir().unwrap();
        set_active_plan(tmp.path(), "plans/gone.md").unwrap();
        assert!(read_active_pointer(tmp.path()).is_some());
        assert!(active_plan(tmp.path()).is_none());
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Auth  Rework: phase 2"), "auth-rework-phase-2");
        assert_eq!(slugify("!!!"), "plan");
    }
}
