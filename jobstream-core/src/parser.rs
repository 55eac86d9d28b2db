//! Frame → envelope parsing.
//!
//! Frame format:
//! ```text
//! data: {"type":"progress","message":"25%"}
//! ```
//! Only the first `data: ` line of a frame is read; other lines are ignored.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Reserved prefix of the payload line.
pub const DATA_PREFIX: &str = "data: ";

/// Return the payload of the frame's data line, if it has one.
///
/// # Example
/// ```
/// use jobstream_core::parser::data_line;
///
/// assert_eq!(data_line("id: 7\ndata: {\"a\":1}"), Some("{\"a\":1}"));
/// assert_eq!(data_line(": keep-alive"), None);
/// ```
pub fn data_line(frame: &str) -> Option<&str> {
    frame
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .find_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
}

/// Decode one complete frame into an envelope.
///
/// A frame without a data line, or whose payload is not valid JSON for `E`,
/// yields `None` so the caller can drop it and keep reading.
pub fn parse_frame<E: DeserializeOwned>(frame: &str) -> Option<E> {
    let Some(payload) = data_line(frame) else {
        debug!(frame_len = frame.len(), "frame without data line ignored");
        return None;
    };
    match serde_json::from_str::<E>(payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(frame_len = frame.len(), error = %e, "dropping malformed frame");
            None
        }
    }
}
