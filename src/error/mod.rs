//! Error Handling Module
//!
//! Error taxonomy for the streaming and citation engine:
//! - Core error type (`RagError`) and its coarse `ErrorCategory`
//! - Type conversions from common error types
//!
//! Decode failures inside the engine are recovered locally and never reach
//! this type; only transport, usage and configuration failures do.

mod conversions;
pub mod types;

pub use types::*;
