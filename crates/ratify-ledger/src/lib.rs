pub mod audit;
pub mod entry;
pub mod error;
pub mod git;
pub mod migrate;
pub mod redact;
pub mod report;
pub mod store;

pub use entry::{DecisionEntry, DecisionSummary, EntryV1, LogRecord};
pub use error::{LogError, RecordError};
pub use store::{AuditLog, PendingDecision};
