//! Harness error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("case `{case}`: {message}")]
    InvalidInput { case: String, message: String },

    #[error("unknown fixture function `{0}`")]
    UnknownFunction(String),

    #[error("no probe binary configured")]
    ProbeUnavailable,

    #[error("failed to start probe {path}: {source}")]
    ProbeSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe exited with {status}: {stderr}")]
    ProbeFailed { status: String, stderr: String },

    #[error("probe did not report a return value")]
    MissingReturn,
}
