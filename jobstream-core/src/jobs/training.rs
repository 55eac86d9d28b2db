use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ActiveSession, JobStreamClient};
use crate::config::Config;
use crate::envelope::{Envelope, ProgressUpdate, Signal, SignalOf};
use crate::error::CoreResult;

/// Wire envelope of the model-training progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingEvent {
    Status {
        message: String,
    },
    Progress {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
    },
    Complete {
        #[serde(default)]
        message: String,
        model_id: String,
        best_model: String,
        #[serde(default)]
        metrics: BTreeMap<String, Value>,
    },
    Error {
        message: String,
    },
}

/// Result handed to the completion callback of a training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub model_id: String,
    pub best_model: String,
    pub metrics: BTreeMap<String, Value>,
}

impl Envelope for TrainingEvent {
    type Progress = ProgressUpdate;
    type Complete = TrainingResult;
    type Failure = String;

    const KIND: &'static str = "training";

    fn into_signal(self) -> SignalOf<Self> {
        match self {
            Self::Status { message } => Signal::Progress(ProgressUpdate::status(message)),
            Self::Progress { message, progress } => {
                Signal::Progress(ProgressUpdate::at(message, progress))
            }
            Self::Complete {
                model_id,
                best_model,
                metrics,
                ..
            } => Signal::Complete(TrainingResult {
                model_id,
                best_model,
                metrics,
            }),
            Self::Error { message } => Signal::Failed(message),
        }
    }
}

/// Identifies one training run: the dataset to train on and the chat that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingJob {
    pub dataset_id: String,
    pub chat_id: String,
}

impl TrainingJob {
    pub fn new(dataset_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn url(&self, cfg: &Config) -> CoreResult<reqwest::Url> {
        super::job_url(
            &cfg.server.base_url,
            &cfg.jobs.training_path,
            &[("dataset_id", &self.dataset_id), ("chat_id", &self.chat_id)],
        )
    }

    /// Open the training progress stream for this job.
    pub async fn start(
        &self,
        client: &JobStreamClient,
        cfg: &Config,
        token: &SecretString,
    ) -> CoreResult<ActiveSession<TrainingEvent>> {
        let url = self.url(cfg)?;
        client.start::<TrainingEvent>(url.as_str(), token).await
    }
}
