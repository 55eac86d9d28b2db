//! The read loop: body chunks → decoder → frames → envelopes → callbacks.
//!
//! A `StreamSession` owns every piece of per-stream state and is consumed by
//! [`StreamSession::run`]. It works over any `Stream` of byte chunks, so the
//! HTTP layer in `client.rs` is only one way to feed it.

use std::fmt::Display;
use std::marker::PhantomData;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

use crate::decoder::Utf8Decoder;
use crate::dispatcher::{EventDispatcher, Flow};
use crate::envelope::{Envelope, JobCallbacks};
use crate::error::{CoreResult, JobStreamError};
use crate::frame::FrameBuffer;
use crate::parser::parse_frame;
use crate::stream::SessionOutcome;
use crate::telemetry::{self, SessionTrace};

/// Caller-facing cancellation token for one session.
///
/// Cancelling abandons any read in flight and stops delivery before the next
/// frame, even if more frames are already buffered. Calling it twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    token: CancellationToken,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct StreamSession<E> {
    decoder: Utf8Decoder,
    frames: FrameBuffer,
    dispatcher: EventDispatcher,
    handle: SessionHandle,
    read_timeout: Option<Duration>,
    url: Option<String>,
    frame_count: u64,
    dropped: u64,
    _envelope: PhantomData<fn() -> E>,
}

impl<E: Envelope> StreamSession<E> {
    /// `read_timeout` bounds the wait for each chunk; `None` waits forever.
    pub fn new(read_timeout: Option<Duration>) -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            frames: FrameBuffer::new(),
            dispatcher: EventDispatcher::new(),
            handle: SessionHandle::new(),
            read_timeout,
            url: None,
            frame_count: 0,
            dropped: 0,
            _envelope: PhantomData,
        }
    }

    /// Label the session with the endpoint it reads from (logs and telemetry only).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Drive `body` to a terminal event, end of stream, cancellation or failure.
    ///
    /// Server outcomes (`complete`, `error`) reach the caller through
    /// `callbacks`; the returned `SessionOutcome` says which path ended the
    /// session. Transport, decode and timeout failures are returned as `Err`
    /// and fire no callback.
    pub async fn run<S, B, Er, C>(mut self, body: S, callbacks: &mut C) -> CoreResult<SessionOutcome>
    where
        S: Stream<Item = Result<B, Er>>,
        B: AsRef<[u8]>,
        Er: Display,
        C: JobCallbacks<E> + ?Sized,
    {
        let started = Instant::now();
        let span = info_span!(
            "job_stream",
            job.kind = E::KIND,
            url = self.url.as_deref().unwrap_or("-")
        );
        let result = self.drive(body, callbacks).instrument(span).await;
        self.record(&result, started.elapsed());
        result
    }

    async fn drive<S, B, Er, C>(&mut self, body: S, callbacks: &mut C) -> CoreResult<SessionOutcome>
    where
        S: Stream<Item = Result<B, Er>>,
        B: AsRef<[u8]>,
        Er: Display,
        C: JobCallbacks<E> + ?Sized,
    {
        let mut body = std::pin::pin!(body);
        let cancel = self.handle.token.clone();
        info!("job stream opened");

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = next_chunk(&mut body, self.read_timeout) => Some(next),
            };
            let Some(next) = next else {
                return Ok(self.cancelled());
            };
            let Some(chunk) = next? else {
                return self.end_of_stream(callbacks);
            };

            let text = self.decoder.decode(chunk.as_ref())?;
            for frame in self.frames.push(&text) {
                if cancel.is_cancelled() {
                    return Ok(self.cancelled());
                }
                self.frame_count += 1;
                let Some(envelope) = parse_frame::<E>(&frame) else {
                    self.dropped += 1;
                    continue;
                };
                debug!(frame = self.frame_count, "dispatching envelope");
                if let Flow::Stop(outcome) = self.dispatcher.dispatch(envelope, callbacks) {
                    // Returning drops `body`, which releases the connection.
                    return Ok(outcome);
                }
            }
            if let Some(e) = self.decoder.parked_error() {
                return Err(e);
            }
        }
    }

    fn end_of_stream<C>(&mut self, callbacks: &mut C) -> CoreResult<SessionOutcome>
    where
        C: JobCallbacks<E> + ?Sized,
    {
        if self.decoder.has_pending() {
            warn!("job stream closed inside a multi-byte character");
        }
        self.decoder.finish()?;
        let tail = self.frames.remainder();
        if !tail.trim().is_empty() {
            debug!(tail_len = tail.len(), "unterminated trailing frame discarded");
        }
        warn!(
            frames = self.frame_count,
            "job stream closed without a terminal event"
        );
        callbacks.on_interrupted();
        Ok(SessionOutcome::Interrupted)
    }

    fn cancelled(&self) -> SessionOutcome {
        info!(frames = self.frame_count, "job stream cancelled");
        SessionOutcome::Cancelled
    }

    fn record(&self, result: &CoreResult<SessionOutcome>, elapsed: Duration) {
        let mut trace = SessionTrace::new()
            .job_kind(E::KIND)
            .url_opt(self.url.as_deref())
            .counts(self.frame_count, self.dropped, self.dispatcher.delivered())
            .latency_ms(elapsed.as_millis() as u64);
        match result {
            Ok(outcome) => {
                info!(
                    job.kind = E::KIND,
                    outcome = outcome.as_str(),
                    frames = self.frame_count,
                    dropped = self.dropped,
                    "job stream finished"
                );
                trace = trace.outcome(*outcome);
            }
            Err(e) => {
                warn!(job.kind = E::KIND, error = %e, "job stream failed");
                trace = trace.error(e.kind(), &e.to_string());
            }
        }
        telemetry::emit(trace);
    }
}

/// Pull the next chunk, honouring the optional per-read timeout.
async fn next_chunk<S, B, Er>(
    body: &mut Pin<&mut S>,
    read_timeout: Option<Duration>,
) -> CoreResult<Option<B>>
where
    S: Stream<Item = Result<B, Er>>,
    Er: Display,
{
    let item = match read_timeout {
        Some(limit) => tokio::time::timeout(limit, body.next())
            .await
            .map_err(|_| {
                warn!(after_ms = limit.as_millis() as u64, "job stream read timed out");
                JobStreamError::Timeout {
                    after_ms: limit.as_millis() as u64,
                }
            })?,
        None => body.next().await,
    };
    match item {
        None => Ok(None),
        Some(Ok(chunk)) => Ok(Some(chunk)),
        Some(Err(e)) => Err(JobStreamError::Transport(e.to_string())),
    }
}
