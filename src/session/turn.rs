use super::guard::TurnGuard;
use crate::error::RagError;
use crate::streaming::{AnswerAccumulator, AnswerAssembler, ContentDelta, DeltaStream, TurnOutcome};
use crate::utils::cancel::{CancelHandle, make_cancellable_stream};
use futures_util::StreamExt;
use tokio::sync::watch;

/// One in-flight answer.
///
/// Owns the delta stream and the session's in-flight guard; dropping the
/// turn closes the connection and frees the session for the next question.
pub struct AnswerTurn {
    deltas: DeltaStream,
    assembler: AnswerAssembler,
    cancel: CancelHandle,
    _guard: TurnGuard,
}

impl std::fmt::Debug for AnswerTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerTurn")
            .field("assembler", &self.assembler)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl AnswerTurn {
    pub(crate) fn new(deltas: DeltaStream, accumulator: AnswerAccumulator, guard: TurnGuard) -> Self {
        let (deltas, cancel) = make_cancellable_stream(deltas);
        Self {
            deltas,
            assembler: AnswerAssembler::new(accumulator),
            cancel,
            _guard: guard,
        }
    }

    /// Receiver holding the latest full answer.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.assembler.accumulator().subscribe()
    }

    /// Handle that abandons the turn from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn answer(&self) -> &str {
        self.assembler.answer()
    }

    /// Fold the next delta into the answer and return it. `None` once the
    /// stream is over.
    pub async fn next_update(&mut self) -> Option<Result<ContentDelta, RagError>> {
        let delta = match self.deltas.next().await? {
            Ok(delta) => delta,
            Err(e) => return Some(Err(e)),
        };
        self.assembler.apply(&delta);
        Some(Ok(delta))
    }

    /// Drain the stream and return the outcome. A transport error aborts the
    /// turn; the partial answer stays visible to subscribers.
    pub async fn finish(mut self) -> Result<TurnOutcome, RagError> {
        while let Some(update) = self.next_update().await {
            update?;
        }
        let outcome = self.assembler.into_outcome();
        tracing::debug!(
            target: "ragstream::stream",
            len = outcome.answer.len(),
            terminated = outcome.terminated,
            references = outcome.references.len(),
            "turn finished"
        );
        Ok(outcome)
    }
}
