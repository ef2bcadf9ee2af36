//! Conversation types.
//!
//! - `message`: the outbound `ConversationMessage` and its `Role`
//! - `payload`: the side-channel `ConversationPayload` and its `RawTurn`s

pub mod message;
pub mod payload;

pub use message::{ConversationMessage, Role};
pub use payload::{ConversationPayload, RawTurn};
