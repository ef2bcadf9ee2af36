//! Citation Module
//!
//! Everything between the raw side-channel payload and the citation list a
//! renderer shows:
//! - `reference`: lenient decoding of the per-turn reference bundle
//! - `correlator`: live and batch correlation, citation records, trailer
//! - `markers`: canonical `[citation](N)` marker syntax
//! - `context_blob`: citations carried in a base64 prefix of the content

mod context_blob;
mod correlator;
mod markers;
mod reference;
pub mod types;

pub use context_blob::{CONTEXT_SEPARATOR, DecodedContext, decode_context_blob};
pub use correlator::CitationCorrelator;
pub use markers::normalize_markers;
pub use reference::{parse_reference_bundle, parse_reference_value};
pub use types::*;
