//! SSE frame splitting.
//!
//! Frames are separated by a blank line. The decoder keeps the unterminated
//! tail of the stream between reads and hands out complete frames in order.
//! There is no size limit: a producer that never sends a blank line makes the
//! buffer grow without bound. `buffered_len` lets a caller watch for that.

const FRAME_DELIMITER: &str = "\n\n";

/// One blank-line delimited block of the event stream (delimiter excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame(String);

impl StreamFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamFrame> {
        // A CRLF pair split across two reads leaves the `\r` at the end of the
        // buffer; only that byte and the new chunk need normalizing.
        let carried = self.buffer.ends_with('\r');
        if carried {
            self.buffer.pop();
        }
        // The buffer held no delimiter, so one can only start at its last byte.
        let mut cursor = self.buffer.len().saturating_sub(1);
        if carried {
            let mut tail = String::with_capacity(chunk.len() + 1);
            tail.push('\r');
            tail.push_str(chunk);
            self.buffer.push_str(&tail.replace("\r\n", "\n"));
        } else if chunk.contains("\r\n") {
            self.buffer.push_str(&chunk.replace("\r\n", "\n"));
        } else {
            self.buffer.push_str(chunk);
        }

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = find_delimiter(&self.buffer.as_bytes()[cursor..]) {
            let end = cursor + offset;
            frames.push(StreamFrame(self.buffer[start..end].to_string()));
            start = end + FRAME_DELIMITER.len();
            cursor = start;
        }
        if start > 0 {
            self.buffer.drain(..start);
        }
        frames
    }

    /// End of stream: the unterminated remainder, if it holds anything.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(StreamFrame(rest))
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(FRAME_DELIMITER.len())
        .position(|w| w == FRAME_DELIMITER.as_bytes())
}
