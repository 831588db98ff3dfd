//! Source-control metadata. Every lookup fails soft to `None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

/// Process-wide dirty-flag cache, keyed by repository root.
static DIRTY_CACHE: LazyLock<Mutex<HashMap<PathBuf, (Instant, bool)>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Run `git <args>` in `cwd`. Returns stdout on success, `None` otherwise.
fn git_output(cwd: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(cwd).output() {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(cwd = %cwd.display(), error = %e, "git not available");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(
            cwd = %cwd.display(),
            args = ?args,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git command failed"
        );
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn git_line(cwd: &Path, args: &[&str]) -> Option<String> {
    git_output(cwd, args)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Top-level directory of the repository containing `dir`.
pub fn repo_root(dir: &Path) -> Option<PathBuf> {
    git_line(dir, &["rev-parse", "--show-toplevel"]).map(PathBuf::from)
}

pub fn head(repo_root: &Path) -> Option<String> {
    git_line(repo_root, &["rev-parse", "HEAD"])
}

pub fn branch(repo_root: &Path) -> Option<String> {
    git_line(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Whether the working tree has uncommitted changes. With a TTL, results are
/// reused for that long per repository.
pub fn is_dirty(repo_root: &Path, ttl: Option<Duration>) -> Option<bool> {
    if let Some(ttl) = ttl {
        if let Ok(cache) = DIRTY_CACHE.lock() {
            if let Some((at, dirty)) = cache.get(repo_root) {
                if at.elapsed() < ttl {
                    return Some(*dirty);
                }
            }
        }
    }
    let dirty = git_output(repo_root, &["status", "--porcelain"])
        .map(|out| out.lines().any(|l| !l.trim().is_empty()))?;
    if ttl.is_some() {
        if let Ok(mut cache) = DIRTY_CACHE.lock() {
            cache.insert(repo_root.to_path_buf(), (Instant::now(), dirty));
        }
    }
    Some(dirty)
}

/// Commit metadata captured at record time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitMeta {
    pub head: Option<String>,
    pub branch: Option<String>,
    pub dirty: Option<bool>,
}

impl GitMeta {
    pub fn collect(repo_root: &Path, dirty_ttl: Option<Duration>) -> Self {
        Self {
            head: head(repo_root),
            branch: branch(repo_root),
            dirty: is_dirty(repo_root, dirty_ttl),
        }
    }
}
