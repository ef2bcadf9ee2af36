use crate::error::RagError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a session's in-flight flag for the duration of a turn.
///
/// The flag is cleared on drop, so every exit path releases it: normal
/// completion, an error while opening the stream, a transport error mid-turn
/// or the caller abandoning the turn.
#[derive(Debug)]
pub struct TurnGuard {
    flag: Arc<AtomicBool>,
}

impl TurnGuard {
    pub fn acquire(flag: &Arc<AtomicBool>, conversation_id: &str) -> Result<Self, RagError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RagError::TurnInFlight(conversation_id.to_string()))?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
