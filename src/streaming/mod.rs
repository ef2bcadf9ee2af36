//! Streaming Module
//!
//! Incremental answer assembly from a server-sent-event body:
//! - UTF-8 safe decoding of chunked bytes
//! - Blank-line frame splitting with a carried-over tail
//! - `data:` payload parsing with raw-text fallback
//! - Answer accumulation with duplicate suppression and live publication

mod accumulator;
mod event;
mod frame;
mod pipeline;
mod utf8_decoder;

pub use accumulator::*;
pub use event::*;
pub use frame::*;
pub use pipeline::*;
pub use utf8_decoder::Utf8StreamDecoder;
