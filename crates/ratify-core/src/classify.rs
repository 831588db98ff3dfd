//! Ordered auto-approval rules and risk inference.

use crate::config::{Capabilities, ConfigReview, GovernanceConfig};
use crate::summary::{is_config_file, is_renderer_file, normalize_path, ChangeSummary};
use crate::types::Impact;

/// Changes above this many lines are non-trivial and never auto-approve,
/// whatever `autoApproveMaxChangedLines` says.
pub const NON_TRIVIAL_CHANGED_LINES: u64 = 20;

/// Changes above this many lines are high impact.
const HIGH_IMPACT_CHANGED_LINES: u64 = 100;

/// Path keywords mapped to risk domains.
const RISK_KEYWORDS: &[(&str, &str)] = &[
    ("auth", "auth"),
    ("login", "auth"),
    ("session", "auth"),
    ("security", "security"),
    ("permission", "security"),
    ("crypto", "crypto"),
    ("cipher", "crypto"),
    ("payment", "payment"),
    ("billing", "payment"),
    ("migration", "migration"),
    ("schema", "migration"),
    ("infra", "infra"),
    ("deploy", "infra"),
    ("terraform", "infra"),
];

const SAFETY_CRITICAL_DOMAINS: &[&str] = &["auth", "security", "crypto", "payment"];

/// Which rule decided an auto-approval evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Disabled,
    NewFile,
    Rename,
    MultiFile,
    ConfigFile,
    RendererFile,
    NoChange,
    OverThreshold,
    WithinLimit,
    OverLimit,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Disabled => "governance disabled",
            Rule::NewFile => "new file",
            Rule::Rename => "rename",
            Rule::MultiFile => "multi-file change",
            Rule::ConfigFile => "config file",
            Rule::RendererFile => "renderer file",
            Rule::NoChange => "no changed lines",
            Rule::OverThreshold => "over non-trivial threshold",
            Rule::WithinLimit => "within auto-approve limit",
            Rule::OverLimit => "over auto-approve limit",
        }
    }
}

/// Result of running the ordered rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub auto_approve: bool,
    pub rule: Rule,
}

impl Verdict {
    fn deny(rule: Rule) -> Self {
        Self {
            auto_approve: false,
            rule,
        }
    }
}

/// A change is non-trivial when its identity alone warrants review, or when
/// it exceeds [`NON_TRIVIAL_CHANGED_LINES`].
pub fn is_non_trivial(summary: &ChangeSummary, caps: &Capabilities) -> bool {
    if summary.is_new_file
        || summary.is_rename
        || summary.is_multi_file
        || summary.is_config_file
        || (caps.renderer_aware && summary.is_renderer_file)
    {
        return true;
    }
    summary.changed_lines > NON_TRIVIAL_CHANGED_LINES
}

/// Evaluate the auto-approval rules in order; the first match wins.
pub fn evaluate(summary: &ChangeSummary, config: &GovernanceConfig, caps: &Capabilities) -> Verdict {
    let verdict = if !config.enabled {
        Verdict::deny(Rule::Disabled)
    } else if summary.is_new_file {
        Verdict::deny(Rule::NewFile)
    } else if summary.is_rename {
        Verdict::deny(Rule::Rename)
    } else if summary.is_multi_file {
        Verdict::deny(Rule::MultiFile)
    } else if summary.is_config_file
        && match caps.config_review {
            ConfigReview::Always => true,
            ConfigReview::WhenRequired => config.require_decision_for_config_files,
        }
    {
        Verdict::deny(Rule::ConfigFile)
    } else if caps.renderer_aware && summary.is_renderer_file {
        Verdict::deny(Rule::RendererFile)
    } else if summary.changed_lines == 0 {
        Verdict {
            auto_approve: true,
            rule: Rule::NoChange,
        }
    } else if summary.changed_lines > NON_TRIVIAL_CHANGED_LINES {
        Verdict::deny(Rule::OverThreshold)
    } else {
        let limit = config
            .auto_approve_max_changed_lines
            .min(NON_TRIVIAL_CHANGED_LINES);
        if summary.changed_lines <= limit {
            Verdict {
                auto_approve: true,
                rule: Rule::WithinLimit,
            }
        } else {
            Verdict::deny(Rule::OverLimit)
        }
    };
    tracing::debug!(
        path = %summary.path,
        changed = summary.changed_lines,
        auto_approve = verdict.auto_approve,
        rule = verdict.rule.as_str(),
        "auto-approve evaluation"
    );
    verdict
}

pub fn should_auto_approve(
    summary: &ChangeSummary,
    config: &GovernanceConfig,
    caps: &Capabilities,
) -> bool {
    evaluate(summary, config, caps).auto_approve
}

/// Heuristic classification stored alongside each decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub impact: Impact,
    pub risk_domains: Vec<String>,
    pub safety_critical: bool,
}

/// Infer impact and risk domains from the summary and every touched file.
pub fn assess_risk(summary: &ChangeSummary, files_touched: &[String]) -> RiskAssessment {
    let impact = if summary.is_multi_file
        || summary.is_rename
        || summary.is_config_file
        || summary.is_renderer_file
        || summary.changed_lines > HIGH_IMPACT_CHANGED_LINES
    {
        Impact::High
    } else if summary.is_new_file || summary.changed_lines > NON_TRIVIAL_CHANGED_LINES {
        Impact::Medium
    } else {
        Impact::Low
    };

    let mut domains: Vec<String> = Vec::new();
    let mut add = |d: &str| {
        if !domains.iter().any(|x| x == d) {
            domains.push(d.to_string());
        }
    };
    let all_paths = std::iter::once(summary.path.as_str()).chain(files_touched.iter().map(String::as_str));
    for path in all_paths {
        let lowered = normalize_path(path).to_lowercase();
        for seg in lowered.split('/') {
            for &(kw, domain) in RISK_KEYWORDS {
                if seg.contains(kw) {
                    add(domain);
                }
            }
        }
        if is_config_file(path) {
            add("build");
        }
        if is_renderer_file(path) {
            add("rendering");
        }
    }
    domains.sort();

    let safety_critical = domains
        .iter()
        .any(|d| SAFETY_CRITICAL_DOMAINS.contains(&d.as_str()));
    RiskAssessment {
        impact,
        risk_domains: domains,
        safety_critical,
    }
}
