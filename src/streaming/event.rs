//! SSE event payload parsing.
//!
//! Each frame carries at most one `data:` payload, normally JSON of the form
//! `{"answer": "...", "reference": {...}}`. Producers are not strict about it,
//! so the parser falls back to the raw text whenever JSON decoding fails and
//! treats a frame without a `data:` prefix as literal answer text.

use super::frame::StreamFrame;
use crate::citation::RagReference;
use crate::config::StreamOptions;
use serde_json::Value;

const DATA_PREFIX: &str = "data:";

/// What one frame contributed to the turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDelta {
    pub answer_fragment: Option<String>,
    pub is_terminal: bool,
    /// Source bundle sent alongside the fragment, if any.
    pub reference: Option<RagReference>,
}

impl ContentDelta {
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            answer_fragment: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn terminal() -> Self {
        Self {
            is_terminal: true,
            ..Default::default()
        }
    }

    fn is_noise(&self) -> bool {
        self.answer_fragment.is_none() && !self.is_terminal && self.reference.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventParser {
    options: StreamOptions,
}

impl EventParser {
    pub fn new(options: StreamOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Classify one frame. `None` for blank, comment and content-free frames.
    pub fn parse(&self, frame: &StreamFrame) -> Option<ContentDelta> {
        let text = frame.as_str().trim();
        if text.is_empty() || is_comment(text) {
            return None;
        }

        let Some(idx) = text.find(DATA_PREFIX) else {
            // Non-standard producers sometimes omit the prefix entirely.
            return self.literal(text);
        };
        let payload = &text[idx + DATA_PREFIX.len()..];

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                let delta = self.from_json(&value);
                (!delta.is_noise()).then_some(delta)
            }
            Err(e) => {
                tracing::debug!(target: "ragstream::stream", err=%e, "non-JSON data payload, using raw text");
                self.literal(payload.trim())
            }
        }
    }

    fn from_json(&self, value: &Value) -> ContentDelta {
        let mut delta = ContentDelta::default();

        match value.get(&self.options.answer_field).and_then(Value::as_str) {
            Some(answer) if answer == self.options.done_marker => delta.is_terminal = true,
            Some(answer) if !answer.is_empty() => {
                delta.answer_fragment = Some(answer.to_string());
            }
            _ => {}
        }

        if let Some(raw) = value.get(&self.options.reference_field)
            && !raw.is_null()
        {
            match serde_json::from_value::<RagReference>(raw.clone()) {
                Ok(reference) => delta.reference = Some(reference),
                Err(e) => {
                    tracing::warn!(target: "ragstream::stream", err=%e, "ignoring malformed reference in event payload");
                }
            }
        }

        delta
    }

    fn literal(&self, text: &str) -> Option<ContentDelta> {
        if text.is_empty() {
            None
        } else if text == self.options.done_marker {
            Some(ContentDelta::terminal())
        } else {
            Some(ContentDelta::fragment(text))
        }
    }
}

fn is_comment(text: &str) -> bool {
    text.lines().all(|line| line.trim_start().starts_with(':'))
}
