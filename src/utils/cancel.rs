//! Cancellation utilities
//!
//! Cancellation handles for delta streams. Cancelling stops the wrapped stream
//! at its next poll and drops the inner stream, which closes the underlying
//! HTTP connection.

use crate::streaming::DeltaStream;
use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Make a delta stream cancellable and return its cancel handle.
pub fn make_cancellable_stream(stream: DeltaStream) -> (DeltaStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures_util::StreamExt;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(target: "ragstream::stream", "delta stream cancelled");
                    None
                }
                item = inner.next() => item,
            };
            let Some(item) = next else { break };
            yield item;
        }
    };
    (Box::pin(s), handle)
}
