//! Governance configuration, read from `.ratify/config.json`.
//!
//! Loading never fails: a missing file, malformed JSON, or a malformed
//! individual field falls back to defaults.

use crate::paths::{RatifyPaths, DEFAULT_LOG_PATH};
use serde_json::Value;
use std::path::Path;

/// Environment override for `governance.enabled`.
pub const ENV_ENABLED: &str = "RATIFY_GOVERNANCE_ENABLED";

/// Which policy variant to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    /// No plan awareness; config files always need a decision.
    Basic,
    /// Scope enforcement, docs-only mode, configurable config review.
    #[default]
    PlanAware,
}

/// What the capture protocol does when governance is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisabledBehavior {
    /// Return no result and record nothing.
    #[default]
    Skip,
    /// Return a `predictable`, auto-approved stub that gets recorded.
    AutoApprove,
}

/// Ordering of `read_recent` results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecentOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigReview {
    /// Config files never auto-approve.
    Always,
    /// Config files skip auto-approval only when `requireDecisionForConfigFiles` is set.
    WhenRequired,
}

/// Feature set of the single policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub scope_enforcement: bool,
    pub docs_only_mode: bool,
    pub renderer_aware: bool,
    pub config_review: ConfigReview,
}

impl Profile {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Profile::Basic => Capabilities {
                scope_enforcement: false,
                docs_only_mode: false,
                renderer_aware: true,
                config_review: ConfigReview::Always,
            },
            Profile::PlanAware => Capabilities {
                scope_enforcement: true,
                docs_only_mode: true,
                renderer_aware: true,
                config_review: ConfigReview::WhenRequired,
            },
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Profile::Basic),
            "plan-aware" | "plan_aware" => Some(Profile::PlanAware),
            _ => None,
        }
    }
}

impl DisabledBehavior {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "skip" => Some(DisabledBehavior::Skip),
            "auto-approve" | "auto_approve" => Some(DisabledBehavior::AutoApprove),
            _ => None,
        }
    }
}

impl RecentOrder {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "oldest-first" | "oldest_first" => Some(RecentOrder::OldestFirst),
            "newest-first" | "newest_first" => Some(RecentOrder::NewestFirst),
            _ => None,
        }
    }
}

/// Governance settings for one governed action. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceConfig {
    pub enabled: bool,
    pub auto_approve_max_changed_lines: u64,
    pub log_path: String,
    pub require_decision_for_config_files: bool,
    pub docs_only: bool,
    pub dirty_cache_ttl_seconds: Option<u64>,
    pub profile: Profile,
    pub when_disabled: DisabledBehavior,
    pub recent_order: RecentOrder,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_approve_max_changed_lines: 10,
            log_path: DEFAULT_LOG_PATH.to_string(),
            require_decision_for_config_files: true,
            docs_only: false,
            dirty_cache_ttl_seconds: None,
            profile: Profile::default(),
            when_disabled: DisabledBehavior::default(),
            recent_order: RecentOrder::default(),
        }
    }
}

impl GovernanceConfig {
    /// Load from `<repo_root>/.ratify/config.json`, then apply env overrides.
    pub fn load(repo_root: &Path) -> Self {
        let paths = RatifyPaths::discover(repo_root);
        let mut config = match read_config_value(&paths.config_json) {
            Some(root) => Self::from_value(&root),
            None => Self::default(),
        };
        if let Some(enabled) = env_enabled() {
            config.enabled = enabled;
        }
        config
    }

    /// Extract the `governance` object of a config document, field by field.
    pub fn from_value(root: &Value) -> Self {
        let mut c = Self::default();
        let Some(g) = root.get("governance") else {
            return c;
        };
        if let Some(v) = g.get("enabled").and_then(Value::as_bool) {
            c.enabled = v;
        }
        if let Some(v) = g.get("autoApproveMaxChangedLines").and_then(as_count) {
            c.auto_approve_max_changed_lines = v;
        }
        if let Some(v) = g.get("logPath").and_then(Value::as_str) {
            if !v.trim().is_empty() {
                c.log_path = v.trim().to_string();
            }
        }
        if let Some(v) = g.get("requireDecisionForConfigFiles").and_then(Value::as_bool) {
            c.require_decision_for_config_files = v;
        }
        if let Some(v) = g.get("docsOnly").and_then(Value::as_bool) {
            c.docs_only = v;
        }
        c.dirty_cache_ttl_seconds = g.get("dirtyCacheTtlSeconds").and_then(as_count);
        if let Some(v) = g.get("profile").and_then(Value::as_str).and_then(Profile::parse) {
            c.profile = v;
        }
        if let Some(v) = g
            .get("whenDisabled")
            .and_then(Value::as_str)
            .and_then(DisabledBehavior::parse)
        {
            c.when_disabled = v;
        }
        if let Some(v) = g
            .get("recentOrder")
            .and_then(Value::as_str)
            .and_then(RecentOrder::parse)
        {
            c.recent_order = v;
        }
        c
    }

    pub fn capabilities(&self) -> Capabilities {
        self.profile.capabilities()
    }
}

/// Non-negative integer; negative numbers clamp to 0, floats truncate.
fn as_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(n) = v.as_i64() {
        return Some(n.max(0) as u64);
    }
    v.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0) as u64)
}

fn env_enabled() -> Option<bool> {
    let raw = std::env::var(ENV_ENABLED).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read the whole config document. `None` on any failure.
pub fn read_config_value(path: &Path) -> Option<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read config");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(v) if v.is_object() => Some(v),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "config is not a JSON object");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed config");
            None
        }
    }
}

/// Look up a dot-notation key (e.g. `governance.docsOnly`).
pub fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |cur, part| cur.get(part))
}
