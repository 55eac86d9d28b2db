use std::time::Duration;

use bytes::Bytes;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::config::HttpCfg;
use crate::envelope::{Envelope, JobCallbacks};
use crate::error::{CoreResult, JobStreamError};
use crate::session::{SessionHandle, StreamSession};
use crate::stream::{JobEvent, JobEventOf, SessionOutcome};

/// Response body as handed out by reqwest.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Thin wrapper around reqwest::Client that opens job progress streams.
#[derive(Debug, Clone)]
pub struct JobStreamClient {
    inner: Client,
    user_agent: String,
    read_timeout: Option<Duration>,
}

impl JobStreamClient {
    /// No total request timeout is set: progress streams stay open for the
    /// whole job. Stalls are bounded by `read_timeout_ms` instead.
    pub fn new(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_millis(cfg.connect_timeout_ms));
        if let Some(max) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        let inner = builder
            .build()
            .map_err(|e| JobStreamError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "jobstream/0.1".to_string(),
            read_timeout: cfg.read_timeout(),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(&HttpCfg::default())
    }

    /// POST to `url` and hand back a session ready to read the event stream.
    ///
    /// Fails before any reading starts if the request cannot be sent
    /// (`Unreachable`) or the server answers with a non-success status
    /// (`Connection`, carrying the raw body text).
    pub async fn start<E: Envelope>(
        &self,
        url: &str,
        token: &SecretString,
    ) -> CoreResult<ActiveSession<E>> {
        let resp = self
            .inner
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| JobStreamError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(job.kind = E::KIND, %status, "job stream request rejected");
            return Err(JobStreamError::Connection { status, body });
        }
        debug!(job.kind = E::KIND, %status, "job stream accepted");

        Ok(ActiveSession {
            session: StreamSession::new(self.read_timeout).with_url(url),
            body: resp.bytes_stream().boxed(),
        })
    }
}

/// A connected stream whose read loop has not started yet.
pub struct ActiveSession<E> {
    session: StreamSession<E>,
    body: ByteStream,
}

impl<E: Envelope> ActiveSession<E> {
    pub fn handle(&self) -> SessionHandle {
        self.session.handle()
    }

    /// Read the stream to its end, delivering envelopes to `callbacks`.
    pub async fn run<C>(self, callbacks: &mut C) -> CoreResult<SessionOutcome>
    where
        C: JobCallbacks<E> + ?Sized,
    {
        self.session.run(self.body, callbacks).await
    }

    /// Run the session on a spawned task and receive its events in order.
    ///
    /// The channel ends after the first terminal `JobEvent`. Dropping the
    /// receiver cancels the session at the next delivery. Must be called
    /// from within a Tokio runtime.
    pub fn into_events(self) -> UnboundedReceiver<JobEventOf<E>>
    where
        E: Send + 'static,
        E::Progress: Send + 'static,
        E::Complete: Send + 'static,
        E::Failure: Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            let mut forward = Forward::<E> {
                tx: tx.clone(),
                handle: self.handle(),
            };
            let tail = match self.run(&mut forward).await {
                Ok(SessionOutcome::Interrupted) => Some(JobEvent::Interrupted),
                Ok(SessionOutcome::Cancelled) => Some(JobEvent::Cancelled),
                Ok(SessionOutcome::Completed | SessionOutcome::Failed) => None,
                Err(e) => Some(JobEvent::Error(e)),
            };
            if let Some(ev) = tail {
                // Receiver may be gone already; nothing left to tell.
                let _ = tx.unbounded_send(ev);
            }
        });
        rx
    }
}

/// Callback set that forwards into the `into_events` channel.
struct Forward<E: Envelope> {
    tx: UnboundedSender<JobEventOf<E>>,
    handle: SessionHandle,
}

impl<E: Envelope> Forward<E> {
    fn send(&self, event: JobEventOf<E>) {
        if self.tx.unbounded_send(event).is_err() && !self.handle.is_cancelled() {
            debug!(job.kind = E::KIND, "event receiver dropped; cancelling session");
            self.handle.cancel();
        }
    }
}

impl<E: Envelope> JobCallbacks<E> for Forward<E> {
    fn on_progress(&mut self, update: E::Progress) {
        self.send(JobEvent::Progress(update));
    }

    fn on_complete(&mut self, result: E::Complete) {
        self.send(JobEvent::Complete(result));
    }

    fn on_error(&mut self, failure: E::Failure) {
        self.send(JobEvent::Failed(failure));
    }
}
