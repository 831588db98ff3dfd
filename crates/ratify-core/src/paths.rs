use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the hidden workspace directory at the repository root.
pub const RATIFY_DIR: &str = ".ratify";

/// Default decision-log location, relative to the repository root.
pub const DEFAULT_LOG_PATH: &str = ".ratify/decision-log.jsonl";

/// All well-known paths under `.ratify/`.
#[derive(Debug, Clone)]
pub struct RatifyPaths {
    pub root: PathBuf,
    pub ratify_dir: PathBuf,
    pub config_json: PathBuf,
    pub active_plan_json: PathBuf,
    pub plans_dir: PathBuf,
    pub default_log: PathBuf,
}

impl RatifyPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let ratify_dir = root.join(RATIFY_DIR);
        Self {
            config_json: ratify_dir.join("config.json"),
            active_plan_json: ratify_dir.join("active-plan.json"),
            plans_dir: ratify_dir.join("plans"),
            default_log: root.join(DEFAULT_LOG_PATH),
            ratify_dir,
            root,
        }
    }

    /// Create the `.ratify/` layout. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.ratify_dir, &self.plans_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Check whether `.ratify/` exists.
    pub fn is_initialized(&self) -> bool {
        self.ratify_dir.is_dir()
    }

    /// Resolve a configured log path: absolute paths are used as-is,
    /// relative ones are joined to the repository root.
    pub fn log_file(&self, configured: &str) -> PathBuf {
        let configured = configured.trim();
        if configured.is_empty() {
            return self.default_log.clone();
        }
        let p = Path::new(configured);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Walk up from `start` looking for a directory containing `.ratify/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(RATIFY_DIR).is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}
