//! Byte stream to answer pipeline.
//!
//! `content_deltas` wires the UTF-8 decoder, the frame decoder and the event
//! parser into one async stream. Chunks are handled strictly in arrival order
//! and frames strictly in buffer order; the only suspension point is waiting
//! for the next chunk.

use super::{AnswerAccumulator, ContentDelta, EventParser, FrameDecoder, Utf8StreamDecoder};
use crate::citation::RagReference;
use crate::config::StreamOptions;
use crate::error::RagError;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<ContentDelta, RagError>> + Send>>;

/// Turn a chunked SSE body into content deltas.
///
/// - A transport error is yielded once and ends the stream.
/// - After the terminal delta nothing else is produced and the byte stream
///   is dropped, whatever else was already buffered.
/// - At end of input the unterminated remainder is still parsed.
pub fn content_deltas<S, B>(byte_stream: S, options: StreamOptions) -> DeltaStream
where
    S: Stream<Item = Result<B, RagError>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut bytes = byte_stream;
        let parser = EventParser::new(options);
        let mut utf8 = Utf8StreamDecoder::new();
        let mut frames = FrameDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(target: "ragstream::stream", err=%e, "byte stream failed");
                    yield Err(e);
                    return;
                }
            };

            let text = utf8.decode(chunk.as_ref());
            for frame in frames.push(&text) {
                tracing::debug!(target: "ragstream::stream", len = frame.as_str().len(), "frame");
                if let Some(delta) = parser.parse(&frame) {
                    let terminal = delta.is_terminal;
                    yield Ok(delta);
                    if terminal {
                        tracing::debug!(target: "ragstream::stream", "terminal sentinel received");
                        return;
                    }
                }
            }
        }

        let tail = utf8.finish();
        let mut rest = frames.push(&tail);
        rest.extend(frames.finish());
        for frame in rest {
            if let Some(delta) = parser.parse(&frame) {
                let terminal = delta.is_terminal;
                yield Ok(delta);
                if terminal {
                    return;
                }
            }
        }
        tracing::debug!(target: "ragstream::stream", "byte stream ended without sentinel");
    };

    Box::pin(out)
}

/// Result of a finished turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    pub answer: String,
    /// Whether the terminal sentinel was seen (as opposed to the body just ending).
    pub terminated: bool,
    /// Every reference bundle sent during the turn, in arrival order.
    pub references: Vec<RagReference>,
}

/// Folds deltas into an answer and collects the reference bundles.
#[derive(Debug, Default)]
pub struct AnswerAssembler {
    accumulator: AnswerAccumulator,
    references: Vec<RagReference>,
    terminated: bool,
}

impl AnswerAssembler {
    pub fn new(accumulator: AnswerAccumulator) -> Self {
        Self {
            accumulator,
            references: Vec::new(),
            terminated: false,
        }
    }

    /// Returns whether the answer text changed.
    pub fn apply(&mut self, delta: &ContentDelta) -> bool {
        if let Some(reference) = &delta.reference {
            self.references.push(reference.clone());
        }
        if delta.is_terminal {
            self.terminated = true;
        }
        delta
            .answer_fragment
            .as_deref()
            .is_some_and(|f| self.accumulator.append(f))
    }

    pub fn accumulator(&self) -> &AnswerAccumulator {
        &self.accumulator
    }

    pub fn answer(&self) -> &str {
        self.accumulator.as_str()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn into_outcome(self) -> TurnOutcome {
        TurnOutcome {
            answer: self.accumulator.into_answer(),
            terminated: self.terminated,
            references: self.references,
        }
    }
}

/// Drive a whole body to completion and return the assembled answer.
pub async fn collect_answer<S, B>(
    byte_stream: S,
    options: StreamOptions,
) -> Result<TurnOutcome, RagError>
where
    S: Stream<Item = Result<B, RagError>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let mut deltas = content_deltas(byte_stream, options);
    let mut assembler = AnswerAssembler::default();
    while let Some(delta) = deltas.next().await {
        assembler.apply(&delta?);
    }
    Ok(assembler.into_outcome())
}
