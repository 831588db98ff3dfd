use std::path::PathBuf;

/// Why a single log line could not be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("unsupported schemaVersion {0}")]
    UnsupportedVersion(u64),
}

/// Errors from the strict readers used by migration and auditing.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
}
