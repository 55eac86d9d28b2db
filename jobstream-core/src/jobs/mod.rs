//! Concrete job kinds streamed through the generic session.

pub mod download;
pub mod training;

pub use download::{DownloadEvent, DownloadJob, DownloadOutcome, DownloadResult};
pub use training::{TrainingEvent, TrainingJob, TrainingResult};

use reqwest::Url;

use crate::error::{CoreResult, JobStreamError};

/// Join `base` and `path` and append the job's identifying query pairs.
pub(crate) fn job_url(base: &str, path: &str, query: &[(&str, &str)]) -> CoreResult<Url> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined)
        .map_err(|e| JobStreamError::Config(format!("invalid job url '{joined}': {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}
