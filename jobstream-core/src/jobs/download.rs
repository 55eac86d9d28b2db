use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{ActiveSession, JobStreamClient};
use crate::config::Config;
use crate::envelope::{Envelope, ProgressUpdate, Signal, SignalOf};
use crate::error::CoreResult;

/// Wire envelope of the dataset-download progress stream.
///
/// An `error` that still carries a `result` means the server kept what it
/// fetched before failing; that is surfaced as a partial success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    Status {
        message: String,
    },
    Progress {
        #[serde(default)]
        message: String,
        #[serde(alias = "percent")]
        progress: f64,
    },
    Complete {
        #[serde(default)]
        message: String,
        result: DownloadResult,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<DownloadResult>,
    },
}

/// Summary of a downloaded dataset as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DownloadResult {
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub columns: Option<u64>,
    /// Any further fields the server attaches.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Full(DownloadResult),
    /// The download failed part-way but `result` is usable.
    Partial {
        result: DownloadResult,
        warning: String,
    },
}

impl DownloadOutcome {
    pub fn result(&self) -> &DownloadResult {
        match self {
            Self::Full(r) | Self::Partial { result: r, .. } => r,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }
}

impl Envelope for DownloadEvent {
    type Progress = ProgressUpdate;
    type Complete = DownloadOutcome;
    type Failure = String;

    const KIND: &'static str = "download";

    fn into_signal(self) -> SignalOf<Self> {
        match self {
            Self::Status { message } => Signal::Progress(ProgressUpdate::status(message)),
            Self::Progress { message, progress } => {
                Signal::Progress(ProgressUpdate::at(message, Some(progress)))
            }
            Self::Complete { result, .. } => Signal::Complete(DownloadOutcome::Full(result)),
            Self::Error {
                message,
                result: Some(result),
            } => Signal::Complete(DownloadOutcome::Partial {
                result,
                warning: message,
            }),
            Self::Error {
                message,
                result: None,
            } => Signal::Failed(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub dataset_id: String,
}

impl DownloadJob {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
        }
    }

    pub fn url(&self, cfg: &Config) -> CoreResult<reqwest::Url> {
        super::job_url(
            &cfg.server.base_url,
            &cfg.jobs.download_path,
            &[("dataset_id", &self.dataset_id)],
        )
    }

    /// Open the download progress stream for this dataset.
    pub async fn start(
        &self,
        client: &JobStreamClient,
        cfg: &Config,
        token: &SecretString,
    ) -> CoreResult<ActiveSession<DownloadEvent>> {
        let url = self.url(cfg)?;
        client.start::<DownloadEvent>(url.as_str(), token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_frame;

    #[test]
    fn progress_percent_is_required_and_aliased() {
        let ev: DownloadEvent =
            parse_frame(r#"data: {"type":"progress","message":"fetching","percent":40}"#).unwrap();
        assert_eq!(
            ev.into_signal(),
            Signal::Progress(ProgressUpdate::at("fetching", Some(40.0)))
        );
        assert!(parse_frame::<DownloadEvent>(r#"data: {"type":"progress","message":"?"}"#).is_none());
    }

    #[test]
    fn complete_keeps_unknown_fields() {
        let ev: DownloadEvent = parse_frame(
            r#"data: {"type":"complete","message":"ok","result":{"dataset_id":"d1","rows":120,"source":"kaggle"}}"#,
        )
        .unwrap();
        match ev.into_signal() {
            Signal::Complete(DownloadOutcome::Full(r)) => {
                assert_eq!(r.dataset_id.as_deref(), Some("d1"));
                assert_eq!(r.rows, Some(120));
                assert_eq!(r.extra.get("source"), Some(&Value::from("kaggle")));
            }
            other => panic!("expected full completion, got: {:?}", other),
        }
    }

    #[test]
    fn error_with_result_falls_back_to_partial_success() {
        let ev: DownloadEvent = parse_frame(
            r#"data: {"type":"error","message":"connection reset","result":{"dataset_id":"d1","rows":50}}"#,
        )
        .unwrap();
        match ev.into_signal() {
            Signal::Complete(outcome) => {
                assert!(outcome.is_partial());
                assert_eq!(outcome.result().rows, Some(50));
                match outcome {
                    DownloadOutcome::Partial { warning, .. } => assert_eq!(warning, "connection reset"),
                    DownloadOutcome::Full(_) => unreachable!(),
                }
            }
            other => panic!("expected partial completion, got: {:?}", other),
        }
    }

    #[test]
    fn error_without_result_fails() {
        let ev: DownloadEvent = parse_frame(r#"data: {"type":"error","message":"not found"}"#).unwrap();
        assert_eq!(ev.into_signal(), Signal::Failed("not found".to_string()));
    }

    #[test]
    fn url_carries_dataset_id() {
        let cfg = Config::with_base_url("http://localhost:8000");
        let url = DownloadJob::new("ds 2").url(&cfg).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/datasets/download/stream?dataset_id=ds+2"
        );
    }
}
