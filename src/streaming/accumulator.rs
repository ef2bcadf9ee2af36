//! Answer accumulation.
//!
//! Folds answer fragments into one string and publishes the full string after
//! every change, so a renderer can redraw incrementally.

use tokio::sync::watch;

/// Observer callback invoked with the full answer after each append.
pub type AnswerObserver = Box<dyn Fn(&str) + Send + Sync>;

pub struct AnswerAccumulator {
    answer: String,
    tx: watch::Sender<String>,
    observer: Option<AnswerObserver>,
    appended: usize,
    suppressed: usize,
}

impl std::fmt::Debug for AnswerAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerAccumulator")
            .field("len", &self.answer.len())
            .field("appended", &self.appended)
            .field("suppressed", &self.suppressed)
            .field("subscribers", &self.tx.receiver_count())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for AnswerAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self {
            answer: String::new(),
            tx,
            observer: None,
            appended: 0,
            suppressed: 0,
        }
    }

    pub fn with_observer(mut self, observer: AnswerObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Receiver that always holds the latest full answer.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    /// Append a fragment unless it is empty or already the tail of the answer
    /// (a re-sent token). Returns whether the answer changed.
    pub fn append(&mut self, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }
        if self.answer.ends_with(fragment) {
            self.suppressed += 1;
            tracing::trace!(target: "ragstream::stream", fragment, "duplicate fragment suppressed");
            return false;
        }

        self.answer.push_str(fragment);
        self.appended += 1;
        self.tx.send_modify(|published| published.push_str(fragment));
        self.notify_observer();
        true
    }

    /// Start a new turn.
    pub fn reset(&mut self) {
        self.answer.clear();
        self.appended = 0;
        self.suppressed = 0;
        self.tx.send_modify(String::clear);
        self.notify_observer();
    }

    pub fn as_str(&self) -> &str {
        &self.answer
    }

    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn into_answer(self) -> String {
        self.answer
    }

    fn notify_observer(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.answer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn appends_and_suppresses_immediate_repeat() {
        let mut acc = AnswerAccumulator::new();
        assert!(acc.append("Hello"));
        assert!(acc.append(" world"));
        assert!(!acc.append(" world"));
        assert!(!acc.append(""));
        assert_eq!(acc.as_str(), "Hello world");
        assert_eq!(acc.appended(), 2);
        assert_eq!(acc.suppressed(), 1);
    }

    #[test]
    fn suffix_match_also_suppresses() {
        // A fragment equal to the current tail is treated as a re-send even if
        // it was never sent on its own.
        let mut acc = AnswerAccumulator::new();
        acc.append("abc");
        assert!(!acc.append("bc"));
        assert_eq!(acc.as_str(), "abc");
    }

    #[test]
    fn subscribers_see_every_state() {
        let mut acc = AnswerAccumulator::new();
        let rx = acc.subscribe();
        acc.append("a");
        assert_eq!(*rx.borrow(), "a");
        acc.append("b");
        assert_eq!(*rx.borrow(), "ab");
        acc.reset();
        assert_eq!(*rx.borrow(), "");
    }

    #[test]
    fn published_answer_tracks_long_streams() {
        let mut acc = AnswerAccumulator::new();
        let rx = acc.subscribe();
        for i in 0..2_000 {
            acc.append(&format!("<{i}>"));
        }
        assert_eq!(*rx.borrow(), acc.as_str());
        assert_eq!(acc.appended(), 2_000);
    }

    #[test]
    fn observer_is_called_per_append() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut acc = AnswerAccumulator::new().with_observer(Box::new(move |s| {
            sink.lock().unwrap().push(s.to_string());
        }));
        acc.append("x");
        acc.append("x");
        acc.append("y");
        assert_eq!(*seen.lock().unwrap(), vec!["x".to_string(), "xy".to_string()]);
    }
}
