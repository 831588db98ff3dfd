//! Client for an external repository-map generator.
//!
//! The generator is an untrusted subprocess that prints one JSON document.
//! Output is bounded in time and size and parsed leniently; any failure
//! yields empty [`RepoHints`].

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Overrides the generator script location.
pub const ENV_SCRIPT: &str = "RATIFY_REPOMAP_SCRIPT";

/// Script location relative to the repository root.
pub const DEFAULT_SCRIPT: &str = "tools/repomap/repomap.py";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct RepoMapOptions {
    pub interpreter: String,
    pub script: PathBuf,
    pub max_tree_chars: usize,
    pub max_symbols: usize,
    pub max_top_files: usize,
    pub max_hotspots: usize,
    pub max_tree_depth: usize,
    pub timeout: Duration,
    pub max_output_bytes: u64,
}

impl RepoMapOptions {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: script.into(),
            max_tree_chars: 4000,
            max_symbols: 200,
            max_top_files: 50,
            max_hotspots: 20,
            max_tree_depth: 4,
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024 * 1024,
        }
    }

    /// Arguments passed to the interpreter.
    pub fn args(&self, repo_root: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.script.clone().into(), "--repo-root".into(), repo_root.into()];
        for (flag, value) in [
            ("--max-tree-chars", self.max_tree_chars),
            ("--max-symbols", self.max_symbols),
            ("--max-top-files", self.max_top_files),
            ("--max-hotspots", self.max_hotspots),
            ("--max-tree-depth", self.max_tree_depth),
        ] {
            args.push(flag.into());
            args.push(value.to_string().into());
        }
        args
    }
}

/// Find the generator script: `RATIFY_REPOMAP_SCRIPT`, then
/// `<repo_root>/tools/repomap/repomap.py`.
pub fn locate_script(repo_root: &Path) -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(ENV_SCRIPT).map(PathBuf::from) {
        if p.is_file() {
            return Some(p);
        }
        tracing::warn!(path = %p.display(), "{ENV_SCRIPT} does not point to a file");
    }
    let p = repo_root.join(DEFAULT_SCRIPT);
    p.is_file().then_some(p)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: String,
    pub path: String,
    pub line: u64,
}

/// Bounded hints about a repository's layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHints {
    pub top_files: Vec<TopFile>,
    pub symbols: Vec<Symbol>,
}

impl RepoHints {
    pub fn is_empty(&self) -> bool {
        self.top_files.is_empty() && self.symbols.is_empty()
    }

    /// Human-readable lines relevant to one repository-relative path: its
    /// symbols, then top files from the same directory.
    pub fn lines_for(&self, path: &str, limit: usize) -> Vec<String> {
        let dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let symbols = self
            .symbols
            .iter()
            .filter(|s| s.path == path)
            .map(|s| format!("{}:{} {} {}", s.path, s.line, s.kind, s.name));
        let related = self
            .top_files
            .iter()
            .filter(|f| f.path != path)
            .filter(|f| f.path.rsplit_once('/').map(|(d, _)| d).unwrap_or("") == dir)
            .map(|f| format!("{} ({})", f.path, f.reason));
        symbols.chain(related).take(limit).collect()
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parse generator output. Items missing a path or name are dropped; lists
/// are cut to the configured bounds.
pub fn parse_output(raw: &[u8], opts: &RepoMapOptions) -> anyhow::Result<RepoHints> {
    let doc: Value = serde_json::from_slice(raw).context("generator output is not JSON")?;
    if !doc.is_object() {
        bail!("generator output is not a JSON object");
    }
    if let Some(err) = doc.get("error") {
        bail!("generator reported an error: {err}");
    }
    let items = |key: &str| -> Vec<Value> {
        doc.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let top_files = items("top_files")
        .iter()
        .filter_map(|v| {
            Some(TopFile {
                path: str_field(v, "path")?,
                reason: str_field(v, "reason").unwrap_or_default(),
            })
        })
        .take(opts.max_top_files)
        .collect();
    let symbols = items("symbols")
        .iter()
        .filter_map(|v| {
            Some(Symbol {
                name: str_field(v, "name")?,
                kind: str_field(v, "kind").unwrap_or_default(),
                path: str_field(v, "path")?,
                line: v.get("line").and_then(Value::as_u64).unwrap_or(0),
            })
        })
        .take(opts.max_symbols)
        .collect();
    Ok(RepoHints { top_files, symbols })
}

fn run(repo_root: &Path, opts: &RepoMapOptions) -> anyhow::Result<RepoHints> {
    if !opts.script.is_file() {
        bail!("script not found: {}", opts.script.display());
    }
    // Stdout goes to an unnamed temp file so a chatty child cannot block on
    // a full pipe while we poll.
    let mut capture = tempfile::tempfile().context("create capture file")?;
    let mut child = Command::new(&opts.interpreter)
        .args(opts.args(repo_root))
        .current_dir(repo_root)
        .stdin(Stdio::null())
        .stdout(Stdio::from(capture.try_clone()?))
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn {}", opts.interpreter))?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if started.elapsed() > opts.timeout => {
                let _ = child.kill();
                let _ = child.wait();
                bail!("generator timed out after {:?}", opts.timeout);
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };
    if !status.success() {
        bail!("generator exited with {status}");
    }

    capture.seek(SeekFrom::Start(0))?;
    let mut raw = Vec::new();
    capture
        .take(opts.max_output_bytes + 1)
        .read_to_end(&mut raw)?;
    if raw.len() as u64 > opts.max_output_bytes {
        bail!("generator output exceeds {} bytes", opts.max_output_bytes);
    }
    parse_output(&raw, opts)
}

/// Run the generator. Never fails; problems are logged and yield empty hints.
pub fn generate(repo_root: &Path, opts: &RepoMapOptions) -> RepoHints {
    match run(repo_root, opts) {
        Ok(hints) => hints,
        Err(e) => {
            tracing::warn!(script = %opts.script.display(), error = %e, "repository map unavailable");
            RepoHints::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> RepoMapOptions {
        RepoMapOptions::new("unused.py")
    }

    #[test]
    fn args_carry_bounds() {
        let args: Vec<String> = opts()
            .args(Path::new("/repo"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "unused.py", "--repo-root", "/repo", "--max-tree-chars", "4000", "--max-symbols",
                "200", "--max-top-files", "50", "--max-hotspots", "20", "--max-tree-depth", "4",
            ]
        );
    }

    #[test]
    fn parse_is_lenient_and_bounded() {
        let mut o = opts();
        o.max_symbols = 1;
        let raw = br#"{
            "repo_root": "/r",
            "top_files": [{"path": "src/a.rs", "reason": "entry"}, {"reason": "no path"}, {"path": "src/b.rs"}],
            "symbols": [
                {"name": "main", "kind": "fn", "path": "src/a.rs", "line": 3},
                {"name": "Other", "kind": "struct", "path": "src/b.rs", "line": 9}
            ],
            "hotspots": []
        }"#;
        let hints = parse_output(raw, &o).unwrap();
        assert_eq!(hints.top_files.len(), 2);
        assert_eq!(hints.top_files[1].reason, "");
        assert_eq!(hints.symbols.len(), 1);
        assert_eq!(hints.symbols[0].line, 3);
    }

    #[test]
    fn parse_rejects_error_documents() {
        assert!(parse_output(br#"{"error": "repo_root is not a directory"}"#, &opts()).is_err());
        assert!(parse_output(b"[1]", &opts()).is_err());
        assert!(parse_output(b"not json", &opts()).is_err());
        let empty = parse_output(b"{}", &opts()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn lines_for_path() {
        let hints = RepoHints {
            top_files: vec![
                TopFile { path: "src/a.rs".into(), reason: "entry".into() },
                TopFile { path: "src/b.rs".into(), reason: "large".into() },
                TopFile { path: "docs/x.md".into(), reason: "docs".into() },
            ],
            symbols: vec![Symbol {
                name: "run".into(),
                kind: "fn".into(),
                path: "src/a.rs".into(),
                line: 7,
            }],
        };
        assert_eq!(
            hints.lines_for("src/a.rs", 10),
            vec!["src/a.rs:7 fn run".to_string(), "src/b.rs (large)".to_string()]
        );
        assert_eq!(hints.lines_for("src/a.rs", 1).len(), 1);
    }

    #[test]
    fn missing_script_degrades_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let o = RepoMapOptions::new(tmp.path().join("nope.py"));
        assert!(generate(tmp.path(), &o).is_empty());
    }

    #[cfg(unix)]
    fn shell_script(dir: &Path, body: &str) -> RepoMapOptions {
        let script = dir.join("gen.sh");
        std::fs::write(&script, body).unwrap();
        let mut o = RepoMapOptions::new(script);
        o.interpreter = "sh".to_string();
        o
    }

    #[cfg(unix)]
    #[test]
    fn generator_output_is_parsed() {
        let tmp = tempfile::tempdir().unwrap();
        let o = shell_script(
            tmp.path(),
            r#"echo '{"top_files":[{"path":"a.rs","reason":"entry"}],"symbols":[]}'"#,
        );
        let hints = generate(tmp.path(), &o);
        assert_eq!(hints.top_files[0].path, "a.rs");
    }

    #[cfg(unix)]
    #[test]
    fn failures_degrade_to_empty() {
        let tmp = tempfile::tempdir().unwrap();

        let o = shell_script(tmp.path(), "exit 3\n");
        assert!(generate(tmp.path(), &o).is_empty());

        let mut o = shell_script(tmp.path(), "sleep 5\n");
        o.timeout = Duration::from_millis(200);
        let started = Instant::now();
        assert!(generate(tmp.path(), &o).is_empty());
        assert!(started.elapsed() < Duration::from_secs(4));

        let mut o = shell_script(tmp.path(), r#"echo '{"top_files":[],"symbols":[]}'"#);
        o.max_output_bytes = 8;
        assert!(generate(tmp.path(), &o).is_empty());

        let mut o = shell_script(tmp.path(), "echo '{}'\n");
        o.interpreter = "ratify-no-such-interpreter".to_string();
        assert!(generate(tmp.path(), &o).is_empty());
    }
}
