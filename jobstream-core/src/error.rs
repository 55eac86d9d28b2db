use thiserror::Error;

/// Core error type for jobstream.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
///
/// Only failures outside the envelope protocol live here. A server-sent
/// `error` envelope is a normal terminal outcome and reaches the caller
/// through its callbacks, never as an `Err`.
#[derive(Debug, Error)]
pub enum JobStreamError {
    /// The request could not be sent at all (DNS, refused connection, TLS).
    #[error("job stream unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The server answered with a non-success status before streaming began.
    #[error("job stream rejected with status {status}: {body}")]
    Connection { status: http::StatusCode, body: String },

    /// The body is not valid UTF-8.
    #[error("invalid utf-8 in job stream at byte {offset}")]
    Decode { offset: u64 },

    #[error("job stream transport failed: {0}")]
    Transport(String),

    #[error("no data on job stream for {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobStreamError {
    /// Stable short name used in telemetry records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Connection { .. } => "connection",
            Self::Decode { .. } => "decode",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, JobStreamError>;
