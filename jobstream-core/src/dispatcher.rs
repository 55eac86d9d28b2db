//! Terminal-state machine routing envelopes to callbacks.

use tracing::debug;

use crate::envelope::{Envelope, JobCallbacks, Signal};
use crate::stream::SessionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Streaming,
    Terminated,
}

/// Whether the read loop should keep pulling chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A terminal envelope has been dispatched; carries how the job ended.
    Stop(SessionOutcome),
}

#[derive(Debug)]
pub struct EventDispatcher {
    /// Set by the first terminal envelope; `Some` means `Terminated`.
    outcome: Option<SessionOutcome>,
    delivered: u64,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            outcome: None,
            delivered: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        match self.outcome {
            None => DispatchState::Streaming,
            Some(_) => DispatchState::Terminated,
        }
    }

    /// `Completed` or `Failed` once a terminal envelope has been dispatched.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Number of callbacks invoked so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn dispatch<E, C>(&mut self, envelope: E, callbacks: &mut C) -> Flow
    where
        E: Envelope,
        C: JobCallbacks<E> + ?Sized,
    {
        if let Some(done) = self.outcome {
            debug!(job.kind = E::KIND, "envelope after terminal event ignored");
            return Flow::Stop(done);
        }
        self.delivered += 1;
        match envelope.into_signal() {
            Signal::Progress(update) => {
                callbacks.on_progress(update);
                Flow::Continue
            }
            Signal::Complete(result) => {
                self.outcome = Some(SessionOutcome::Completed);
                callbacks.on_complete(result);
                Flow::Stop(SessionOutcome::Completed)
            }
            Signal::Failed(failure) => {
                self.outcome = Some(SessionOutcome::Failed);
                callbacks.on_error(failure);
                Flow::Stop(SessionOutcome::Failed)
            }
        }
    }
}
