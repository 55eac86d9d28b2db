//! Blank-line framing over decoded text.

/// Separator between two frames on the wire.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Accumulates decoded text and hands out frames once they are terminated.
///
/// The retained remainder never contains a delimiter, so a frame boundary is
/// found at the same place no matter how the text was chunked.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return every frame it completes, in stream order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buf.push_str(text);
        let mut frames = Vec::new();
        while let Some(idx) = self.buf.find(FRAME_DELIMITER) {
            let frame = self.buf[..idx].to_string();
            self.buf.drain(..idx + FRAME_DELIMITER.len());
            frames.push(frame);
        }
        frames
    }

    /// The trailing partial frame, if any.
    pub fn remainder(&self) -> &str {
        &self.buf
    }
}
