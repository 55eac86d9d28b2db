//! Streaming primitives exposed by jobstream.
//!
//! Contract:
//! - A session emits 0..n `Progress` events followed by exactly one terminal
//!   event: `Complete`, `Failed`, `Interrupted`, `Cancelled` or `Error`.
//! - After a terminal event, no further events are emitted.
//!
//! `JobEvent` does not derive `Clone` / `PartialEq` because `Error` contains
//! `JobStreamError`, which is not (and should not be) `Clone` or `Eq`.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::JobStreamError;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// A `complete` envelope was delivered.
    Completed,
    /// An `error` envelope was delivered.
    Failed,
    /// The server closed the stream without a terminal envelope.
    Interrupted,
    /// The caller cancelled through its handle.
    Cancelled,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Interrupted => "interrupted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// What the caller receives incrementally from `ActiveSession::into_events`.
#[derive(Debug)]
pub enum JobEvent<P, C, F> {
    Progress(P),
    Complete(C),
    Failed(F),
    Interrupted,
    Cancelled,
    /// Transport/decode error surfaced mid-stream; stream ends after this.
    Error(JobStreamError),
}

/// Event type produced by a session over envelope `E`.
pub type JobEventOf<E> =
    JobEvent<<E as Envelope>::Progress, <E as Envelope>::Complete, <E as Envelope>::Failure>;

impl<P, C, F> JobEvent<P, C, F> {
    /// Returns true if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    pub fn as_progress(&self) -> Option<&P> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_work() {
        let p: JobEvent<&str, (), ()> = JobEvent::Progress("25%");
        assert!(!p.is_terminal());
        assert_eq!(p.as_progress(), Some(&"25%"));

        let c: JobEvent<&str, (), ()> = JobEvent::Interrupted;
        assert!(c.is_terminal());
        assert_eq!(c.as_progress(), None);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&SessionOutcome::Interrupted).unwrap();
        assert_eq!(json, "\"interrupted\"");
        assert_eq!(SessionOutcome::Cancelled.as_str(), "cancelled");
    }
}
