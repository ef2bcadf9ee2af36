//! Chat backend client.
//!
//! `ChatBackend` is the seam between the engine and the network: a session
//! only needs a byte stream for a question and the stored conversation.
//! `RagClient` implements it over `reqwest`; tests substitute in-memory
//! backends.

mod rag_client;

pub use rag_client::RagClient;

use crate::error::RagError;
use crate::types::ConversationPayload;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde_json::{Value, json};
use std::pin::Pin;

/// Raw SSE body of an answer.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RagError>> + Send>>;

/// What to ask the backend for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerRequest {
    /// Conversational answer, recorded in the conversation's history.
    Chat {
        question: String,
        conversation_id: String,
    },
    /// One-off knowledge search summary.
    Search { query: String },
}

impl AnswerRequest {
    pub fn chat(question: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self::Chat {
            question: question.into(),
            conversation_id: conversation_id.into(),
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    pub fn question(&self) -> &str {
        match self {
            Self::Chat { question, .. } => question,
            Self::Search { query } => query,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::Chat {
                conversation_id, ..
            } => Some(conversation_id),
            Self::Search { .. } => None,
        }
    }

    /// JSON request body.
    pub fn body(&self) -> Value {
        match self {
            Self::Chat {
                question,
                conversation_id,
            } => json!({ "question": question, "conversationId": conversation_id }),
            Self::Search { query } => json!({ "query": query }),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), RagError> {
        if self.question().trim().is_empty() {
            return Err(RagError::InvalidInput("question cannot be empty".to_string()));
        }
        if let Some(id) = self.conversation_id()
            && id.trim().is_empty()
        {
            return Err(RagError::InvalidInput(
                "conversation id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open the SSE body for a question. Errors here are handshake failures;
    /// read failures surface as items of the returned stream.
    async fn open_answer_stream(&self, request: &AnswerRequest) -> Result<ByteStream, RagError>;

    /// Fetch the stored conversation (message list and reference bundle).
    async fn load_conversation(&self, conversation_id: &str)
    -> Result<ConversationPayload, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bodies() {
        assert_eq!(
            AnswerRequest::chat("why?", "c-1").body(),
            json!({"question": "why?", "conversationId": "c-1"})
        );
        assert_eq!(AnswerRequest::search("rates").body(), json!({"query": "rates"}));
    }

    #[test]
    fn blank_requests_are_rejected() {
        assert!(AnswerRequest::chat(" ", "c").validate().is_err());
        assert!(AnswerRequest::chat("q", "").validate().is_err());
        assert!(AnswerRequest::search("q").validate().is_ok());
    }
}
