pub mod classify;
pub mod config;
pub mod diff;
pub mod paths;
pub mod plan;
pub mod scope;
pub mod summary;
pub mod types;

pub use classify::{assess_risk, is_non_trivial, should_auto_approve, RiskAssessment, Verdict};
pub use config::{Capabilities, DisabledBehavior, GovernanceConfig, Profile, RecentOrder};
pub use paths::RatifyPaths;
pub use plan::PlanInfo;
pub use scope::{matches_scope, ScopeMatcher};
pub use summary::{ChangeFlags, ChangeSummary};
pub use types::*;
