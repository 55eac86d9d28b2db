//! # jobstream-core
//!
//! Client for the server-sent progress streams of long-running backend jobs
//! (model training, dataset download).
//!
//! Pipeline, leaf to root:
//! `Utf8Decoder` → `FrameBuffer` → `parse_frame` → `EventDispatcher`, driven by
//! a `StreamSession` that `JobStreamClient::start` opens over an authenticated
//! POST.
//!
//! ## Example
//! ```no_run
//! use jobstream_core::client::JobStreamClient;
//! use jobstream_core::config::Config;
//! use jobstream_core::envelope::{Callbacks, ProgressUpdate};
//! use jobstream_core::jobs::{TrainingJob, TrainingResult};
//!
//! # async fn demo() -> jobstream_core::error::CoreResult<()> {
//! let cfg = Config::with_base_url("https://api.example.com");
//! let client = JobStreamClient::new(&cfg.http)?;
//! let token = cfg.token()?;
//!
//! let session = TrainingJob::new("ds-1", "chat-1").start(&client, &cfg, &token).await?;
//! let mut callbacks = Callbacks {
//!     on_progress: |u: ProgressUpdate| println!("{}", u.message),
//!     on_complete: |r: TrainingResult| println!("trained {}", r.model_id),
//!     on_error: |m: String| eprintln!("failed: {m}"),
//! };
//! let outcome = session.run(&mut callbacks).await?;
//! println!("{}", outcome.as_str());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod jobs;
pub mod parser;
pub mod session;
pub mod stream;
pub mod telemetry;

pub use client::{ActiveSession, JobStreamClient};
pub use error::{CoreResult, JobStreamError};
pub use session::{SessionHandle, StreamSession};
pub use stream::{JobEvent, SessionOutcome};
