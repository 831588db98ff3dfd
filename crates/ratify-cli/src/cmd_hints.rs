use ratify_repomap::{generate, locate_script, RepoHints, RepoMapOptions};
use std::path::{Path, PathBuf};

/// Hint lines shown during capture.
const MAX_HINT_LINES: usize = 10;

/// Hints for one path, or an empty list when no generator is available.
pub(crate) fn hints_for(repo_root: &Path, path: &str) -> Vec<String> {
    match locate_script(repo_root) {
        Some(script) => hint_lines(repo_root, &RepoMapOptions::new(script), path),
        None => Vec::new(),
    }
}

fn hint_lines(repo_root: &Path, opts: &RepoMapOptions, path: &str) -> Vec<String> {
    let hints = generate(repo_root, opts);
    let lines = hints.lines_for(path, MAX_HINT_LINES);
    if lines.is_empty() {
        return lines;
    }
    std::iter::once("Related code:".to_string())
        .chain(lines.into_iter().map(|l| format!("  {l}")))
        .collect()
}

/// Keep only the entries for `path`; everything when no path is given.
fn only_path(hints: RepoHints, path: Option<&str>) -> RepoHints {
    match path {
        Some(p) => RepoHints {
            top_files: hints.top_files.into_iter().filter(|f| f.path == p).collect(),
            symbols: hints.symbols.into_iter().filter(|s| s.path == p).collect(),
        },
        None => hints,
    }
}

pub fn execute(
    repo_root: &Path,
    path: Option<&str>,
    script: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let Some(script) = script.or_else(|| locate_script(repo_root)) else {
        anyhow::bail!(
            "no repository-map generator found; pass --script or set {}",
            ratify_repomap::ENV_SCRIPT
        );
    };
    let hints = generate(repo_root, &RepoMapOptions::new(script));

    if json {
        println!("{}", serde_json::to_string_pretty(&only_path(hints, path))?);
        return Ok(());
    }

    if hints.is_empty() {
        println!("(no hints)");
        return Ok(());
    }
    match path {
        Some(p) => {
            for line in hints.lines_for(p, usize::MAX) {
                println!("{line}");
            }
        }
        None => {
            println!("Top files:");
            for f in &hints.top_files {
                println!("  {} ({})", f.path, f.reason);
            }
            println!("Symbols:");
            for s in &hints.symbols {
                println!("  {}:{} {} {}", s.path, s.line, s.kind, s.name);
            }
        }
    }
    Ok(())
}
