//! Incremental UTF-8 decoding for chunked response bodies.
//!
//! The transport is free to split a multi-byte character across two chunks.
//! The decoder holds back the incomplete tail (at most three bytes) and
//! prepends it to the next chunk, so callers only ever see whole characters.
//!
//! An invalid byte does not swallow the text before it: `decode` still
//! returns that prefix and parks the error for [`Utf8Decoder::parked_error`].

use crate::error::{CoreResult, JobStreamError};

#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    /// Bytes fully consumed so far; used to report error offsets.
    consumed: u64,
    /// Offset of the first invalid byte, once seen.
    failed_at: Option<u64>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning every complete character it finishes.
    ///
    /// Once an invalid byte has been seen, every later call fails.
    pub fn decode(&mut self, chunk: &[u8]) -> CoreResult<String> {
        if let Some(offset) = self.failed_at {
            return Err(JobStreamError::Decode { offset });
        }
        let joined;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => {
                self.consumed += bytes.len() as u64;
                Ok(text.to_owned())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if e.error_len().is_some() {
                    self.failed_at = Some(self.consumed + valid as u64);
                } else {
                    // Truncated sequence at the end: keep it for the next chunk.
                    self.pending.extend_from_slice(&bytes[valid..]);
                }
                self.consumed += valid as u64;
                let text = std::str::from_utf8(&bytes[..valid])
                    .map_err(|_| JobStreamError::Decode { offset: self.consumed })?;
                Ok(text.to_owned())
            }
        }
    }

    /// The error parked by the last `decode`, if it hit an invalid byte.
    pub fn parked_error(&self) -> Option<JobStreamError> {
        self.failed_at.map(|offset| JobStreamError::Decode { offset })
    }

    /// True if a partial character is waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Signal end of input. A character left incomplete is a decode error.
    pub fn finish(&mut self) -> CoreResult<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            self.pending.clear();
            Err(JobStreamError::Decode {
                offset: self.consumed,
            })
        }
    }
}
