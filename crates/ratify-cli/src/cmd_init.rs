use crate::cmd_config::{read_config, write_config};
use ratify_core::config::GovernanceConfig;
use ratify_core::paths::RatifyPaths;
use serde_json::{json, Value};
use std::path::Path;

/// Default `governance` object written on first init.
fn default_governance() -> Value {
    let d = GovernanceConfig::default();
    json!({
        "enabled": d.enabled,
        "autoApproveMaxChangedLines": d.auto_approve_max_changed_lines,
        "logPath": d.log_path,
        "requireDecisionForConfigFiles": d.require_decision_for_config_files,
        "docsOnly": d.docs_only,
        "profile": "plan-aware",
        "whenDisabled": "skip",
        "recentOrder": "oldest-first",
    })
}

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = RatifyPaths::discover(repo_root);
    let existed = paths.is_initialized();
    paths.ensure_layout()?;

    // Fill in a governance section without clobbering user edits.
    let mut config = read_config(&paths.config_json)?;
    if !config.contains_key("governance") {
        config.insert("governance".to_string(), default_governance());
        write_config(&paths.config_json, &config)?;
    }

    if existed {
        println!("Already initialized at {}", paths.ratify_dir.display());
    } else {
        println!("Initialized {}", paths.ratify_dir.display());
        println!("  config: {}", paths.config_json.display());
        println!("  log:    {}", paths.default_log.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = RatifyPaths::discover(tmp.path());
        assert!(paths.plans_dir.is_dir());
        let loaded = GovernanceConfig::from_value(&Value::Object(read_config(&paths.config_json).unwrap()));
        assert_eq!(loaded, GovernanceConfig::default());
    }

    #[test]
    fn init_keeps_existing_config() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = RatifyPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.config_json, r#"{"governance":{"docsOnly":true}}"#).unwrap();
        execute(tmp.path()).unwrap();
        let raw = std::fs::read_to_string(&paths.config_json).unwrap();
        assert_eq!(raw, r#"{"governance":{"docsOnly":true}}"#);
    }
}
