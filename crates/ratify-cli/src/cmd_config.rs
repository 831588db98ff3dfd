use clap::Subcommand;
use ratify_core::config::lookup;
use ratify_core::paths::{write_atomic, RatifyPaths};
use serde_json::{Map, Value};
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Dot-notation key (e.g. governance.docsOnly)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Dot-notation key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

fn workspace(repo_root: &Path) -> anyhow::Result<RatifyPaths> {
    let paths = RatifyPaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .ratify/ workspace found. Run `ratify init` first.");
    }
    Ok(paths)
}

/// Read `.ratify/config.json`. Returns an empty map if the file doesn't exist.
pub(crate) fn read_config(path: &Path) -> anyhow::Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: Value = serde_json::from_str(&content)?;
    match val {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

pub(crate) fn write_config(path: &Path, config: &Map<String, Value>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&config)?;
    write_atomic(path, json.as_bytes())
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                Value::String(s.to_string())
            }
        }
    }
}

/// Insert `value` at a dot-notation key, creating intermediate objects.
/// Non-object intermediates are replaced.
fn insert_dotted(root: &mut Map<String, Value>, key: &str, value: Value) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("invalid key {key:?}");
    }
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("empty key"))?;
    let mut cur = root;
    for part in parents {
        let slot = cur
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        cur = slot
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("cannot descend into {part:?}"))?;
    }
    cur.insert(last.to_string(), value);
    Ok(())
}

/// Flatten nested objects into `(dot.key, value)` pairs.
fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            Value::Object(inner) if !inner.is_empty() => flatten(&key, inner, out),
            _ => out.push((key, v.clone())),
        }
    }
}

/// `ratify config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = workspace(repo_root)?;
    let mut config = read_config(&paths.config_json)?;
    insert_dotted(&mut config, key, parse_value(value))?;
    write_config(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `ratify config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = workspace(repo_root)?;
    let config = Value::Object(read_config(&paths.config_json)?);
    match lookup(&config, key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `ratify config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = workspace(repo_root)?;
    let config = read_config(&paths.config_json)?;
    let mut pairs = Vec::new();
    flatten("", &config, &mut pairs);
    if pairs.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in pairs {
            println!("{k} = {v}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratify_core::config::GovernanceConfig;
    use serde_json::json;

    #[test]
    fn parse_value_types() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("15"), json!(15));
        assert_eq!(parse_value("0.5"), json!(0.5));
        assert_eq!(parse_value("plan-aware"), json!("plan-aware"));
    }

    #[test]
    fn insert_dotted_creates_and_replaces() {
        let mut m = Map::new();
        insert_dotted(&mut m, "governance.docsOnly", json!(true)).unwrap();
        insert_dotted(&mut m, "governance.autoApproveMaxChangedLines", json!(15)).unwrap();
        assert_eq!(
            Value::Object(m.clone()),
            json!({"governance": {"docsOnly": true, "autoApproveMaxChangedLines": 15}})
        );
        insert_dotted(&mut m, "governance.docsOnly.x", json!(1)).unwrap();
        assert_eq!(m["governance"]["docsOnly"], json!({"x": 1}));
        assert!(insert_dotted(&mut m, "a..b", json!(1)).is_err());
    }

    #[test]
    fn set_then_load_governance() {
        let tmp = tempfile::tempdir().unwrap();
        RatifyPaths::discover(tmp.path()).ensure_layout().unwrap();
        set(tmp.path(), "governance.autoApproveMaxChangedLines", "15").unwrap();
        set(tmp.path(), "governance.profile", "basic").unwrap();
        let c = GovernanceConfig::load(tmp.path());
        assert_eq!(c.auto_approve_max_changed_lines, 15);
        assert_eq!(c.profile, ratify_core::config::Profile::Basic);
    }

    #[test]
    fn flatten_lists_leaves() {
        let v = json!({"governance": {"enabled": true, "nested": {"a": 1}}, "top": "x"});
        let Value::Object(m) = v else { unreachable!() };
        let mut out = Vec::new();
        flatten("", &m, &mut out);
        let keys: Vec<_> = out.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["governance.enabled", "governance.nested.a", "top"]);
    }

    #[test]
    fn requires_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(set(tmp.path(), "governance.enabled", "false").is_err());
    }
}
