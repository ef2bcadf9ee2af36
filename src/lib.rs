//! # ragstream
//!
//! Streaming answer assembly and citation resolution for RAG chat backends.
//!
//! The engine turns a chunked server-sent-event body into a growing answer,
//! pairs the answer with the backend's reference bundle and rewrites inline
//! citation markers into one canonical form:
//!
//! - [`streaming`]: bytes to frames to deltas to answer
//! - [`citation`]: reference bundles, correlation, markers, context blobs
//! - [`render`]: the composition that yields [`ConversationMessage`]s
//! - [`client`] / [`session`]: the transport that drives it against a backend
//!
//! ```rust,ignore
//! use ragstream::{ChatSession, RagClient, RagClientConfig};
//!
//! let client = RagClient::new(RagClientConfig::new("https://rag.example.com").with_api_token(token))?;
//! let mut session = ChatSession::new(client, conversation_id);
//! session.load_history().await?;
//!
//! let mut turn = session.stream_answer("What is the prepayment fee?").await?;
//! let mut answer = turn.subscribe();
//! while let Some(update) = turn.next_update().await {
//!     update?;
//!     redraw(&answer.borrow_and_update());
//! }
//! ```

#![deny(unsafe_code)]

pub mod citation;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod render;
pub mod session;
pub mod streaming;
pub mod types;
pub mod utils;

pub use citation::{
    CitationCorrelator, CitationRecord, KnowledgeBaseContext, RagReference, ReferenceEntry,
    SourceDocument, normalize_markers, parse_reference_bundle,
};
pub use client::{AnswerRequest, ChatBackend, RagClient};
pub use config::{CitationLabels, HttpConfig, RagClientConfig, StreamOptions};
pub use error::{ErrorCategory, RagError};
pub use render::MessageRenderer;
pub use session::{AnswerTurn, ChatSession};
pub use streaming::{ContentDelta, TurnOutcome, collect_answer, content_deltas};
pub use types::{ConversationMessage, ConversationPayload, RawTurn, Role};

pub type Result<T> = std::result::Result<T, RagError>;
