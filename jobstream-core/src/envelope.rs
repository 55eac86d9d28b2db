//! Envelope typing shared by every job kind.
//!
//! A job defines its own serde enum tagged on `type` and says, through
//! [`Envelope::into_signal`], which variants are progress and which are
//! terminal. The session and dispatcher only ever see the resulting
//! [`Signal`], so one read loop serves every job.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Job-agnostic classification of one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<P, C, F> {
    /// `status` or `progress`; the session keeps streaming.
    Progress(P),
    /// `complete`; terminal.
    Complete(C),
    /// `error`; terminal.
    Failed(F),
}

impl<P, C, F> Signal<P, C, F> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Signal type produced by envelope `E`.
pub type SignalOf<E> =
    Signal<<E as Envelope>::Progress, <E as Envelope>::Complete, <E as Envelope>::Failure>;

/// One decoded event of a job's progress protocol.
pub trait Envelope: DeserializeOwned {
    type Progress;
    type Complete;
    type Failure;

    /// Short job name used in logs and telemetry, e.g. "training".
    const KIND: &'static str;

    fn into_signal(self) -> SignalOf<Self>;
}

/// Payload handed to the progress callback for `status` and `progress` envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    /// Completion percentage when the server sent one.
    pub percent: Option<f64>,
}

impl ProgressUpdate {
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: None,
        }
    }

    pub fn at(message: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            message: message.into(),
            percent,
        }
    }
}

/// Caller-supplied reactions to a session's events.
///
/// The session borrows the set mutably for the duration of `run`; at most one
/// of `on_complete` / `on_error` fires, and nothing fires after it.
pub trait JobCallbacks<E: Envelope> {
    fn on_progress(&mut self, update: E::Progress);
    fn on_complete(&mut self, result: E::Complete);
    fn on_error(&mut self, failure: E::Failure);

    /// The stream ended without a terminal envelope.
    fn on_interrupted(&mut self) {}
}

/// A callback set built from three closures.
pub struct Callbacks<P, C, F> {
    pub on_progress: P,
    pub on_complete: C,
    pub on_error: F,
}

impl<E, P, C, F> JobCallbacks<E> for Callbacks<P, C, F>
where
    E: Envelope,
    P: FnMut(E::Progress),
    C: FnMut(E::Complete),
    F: FnMut(E::Failure),
{
    fn on_progress(&mut self, update: E::Progress) {
        (self.on_progress)(update)
    }

    fn on_complete(&mut self, result: E::Complete) {
        (self.on_complete)(result)
    }

    fn on_error(&mut self, failure: E::Failure) {
        (self.on_error)(failure)
    }
}
