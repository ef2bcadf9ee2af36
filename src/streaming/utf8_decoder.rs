//! UTF-8 safe decoding of chunked byte streams.
//!
//! Network reads split multi-byte characters at arbitrary positions. The
//! decoder keeps an incomplete trailing sequence until the next read so the
//! text it produces is the same no matter how the bytes were chunked.

#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, holding back an incomplete trailing sequence.
    ///
    /// Invalid sequences are replaced with U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is still pending at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
