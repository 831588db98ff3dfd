//! Per-action change summary: diff stats plus file-identity predicates.

use crate::types::DiffStats;

/// Build and dependency manifests whose edits always deserve review.
const CONFIG_FILENAMES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "pnpm-lock.yaml",
    "pnpm-workspace.yaml",
    "yarn.lock",
    "cargo.toml",
    "cargo.lock",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "setup.cfg",
    "pipfile",
    "pipfile.lock",
    "go.mod",
    "go.sum",
    "gemfile",
    "gemfile.lock",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "podfile",
    "podfile.lock",
    "package.swift",
    "makefile",
    "dockerfile",
    "vite.config.ts",
    "webpack.config.js",
];

/// Path-segment keywords that mark a rendering subsystem.
const RENDERER_KEYWORDS: &[&str] = &[
    "render", "shader", "webgl", "webgpu", "gpu", "vulkan", "opengl", "metal",
];

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "adoc", "txt"];

/// Normalize a path for matching: forward slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let p = path.trim().replace('\\', "/");
    match p.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => p,
    }
}

fn basename(path: &str) -> String {
    normalize_path(path)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

pub fn is_config_file(path: &str) -> bool {
    let base = basename(path);
    CONFIG_FILENAMES.contains(&base.as_str())
        || (base.starts_with("tsconfig") && base.ends_with(".json"))
}

pub fn is_renderer_file(path: &str) -> bool {
    normalize_path(path)
        .to_lowercase()
        .split('/')
        .filter(|seg| !seg.is_empty())
        .any(|seg| RENDERER_KEYWORDS.iter().any(|kw| seg.contains(kw)))
}

pub fn is_doc_file(path: &str) -> bool {
    let base = basename(path);
    if base.starts_with("readme") {
        return true;
    }
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => DOC_EXTENSIONS.contains(&ext),
        _ => false,
    }
}

/// Flags the caller knows about the action but the diff cannot tell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    pub is_new_file: bool,
    pub is_multi_file: bool,
    pub is_rename: bool,
}

/// Immutable summary of one proposed edit. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub uri: String,
    pub path: String,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub changed_lines: u64,
    pub is_config_file: bool,
    pub is_renderer_file: bool,
    pub is_doc_file: bool,
    pub is_new_file: bool,
    pub is_multi_file: bool,
    pub is_rename: bool,
}

impl ChangeSummary {
    /// Build a summary from raw counts. Negative counts are clamped to 0.
    pub fn build(uri: &str, lines_added: i64, lines_removed: i64, flags: ChangeFlags) -> Self {
        Self::from_stats(uri, DiffStats::new(lines_added, lines_removed), flags)
    }

    pub fn from_stats(uri: &str, stats: DiffStats, flags: ChangeFlags) -> Self {
        let path = normalize_path(uri.strip_prefix("file://").unwrap_or(uri));
        Self {
            uri: uri.to_string(),
            is_config_file: is_config_file(&path),
            is_renderer_file: is_renderer_file(&path),
            is_doc_file: is_doc_file(&path),
            path,
            lines_added: stats.lines_added,
            lines_removed: stats.lines_removed,
            changed_lines: stats.changed_lines(),
            is_new_file: flags.is_new_file,
            is_multi_file: flags.is_multi_file,
            is_rename: flags.is_rename,
        }
    }

    pub fn diff_stats(&self) -> DiffStats {
        DiffStats {
            lines_added: self.lines_added,
            lines_removed: self.lines_removed,
        }
    }
}
