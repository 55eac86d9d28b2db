use serde::{Deserialize, Serialize};

use crate::stream::SessionOutcome;

/// Summary of one session, recorded when its read loop exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionTrace {
    /// Envelope kind, e.g. "training", "download".
    pub job_kind: Option<String>,

    pub url: Option<String>,

    /// Complete frames cut from the body.
    pub frames: u64,

    /// Frames dropped because they carried no parsable envelope.
    pub dropped_frames: u64,

    /// Callbacks invoked.
    pub delivered: u64,

    /// None when the loop ended with an error.
    pub outcome: Option<SessionOutcome>,

    pub error_kind: Option<String>,
    pub error_message: Option<String>,

    pub latency_ms: Option<u64>,
}

impl SessionTrace {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn job_kind(mut self, kind: &str) -> Self {
        self.job_kind = Some(kind.to_string());
        self
    }
    pub fn url_opt(mut self, url: Option<&str>) -> Self {
        self.url = url.map(|s| s.to_string());
        self
    }
    pub fn counts(mut self, frames: u64, dropped: u64, delivered: u64) -> Self {
        self.frames = frames;
        self.dropped_frames = dropped;
        self.delivered = delivered;
        self
    }
    pub fn outcome(mut self, outcome: SessionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
    pub fn error(mut self, kind: &str, message: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self.error_message = Some(message.to_string());
        self
    }
    pub fn latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_trace_serializes() {
        let trace = SessionTrace::new()
            .job_kind("training")
            .url_opt(Some("http://x/api/training/stream"))
            .counts(4, 1, 3)
            .outcome(SessionOutcome::Completed)
            .latency_ms(42);

        let as_json = serde_json::to_value(&trace).unwrap();
        assert_eq!(as_json["job_kind"], json!("training"));
        assert_eq!(as_json["frames"], json!(4));
        assert_eq!(as_json["dropped_frames"], json!(1));
        assert_eq!(as_json["outcome"], json!("completed"));
        assert_eq!(as_json["latency_ms"], json!(42));
        assert_eq!(as_json["error_kind"], json!(null));
    }
}
