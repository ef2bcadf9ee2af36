//! Citations carried inline as a base64 JSON prefix.
//!
//! Some responses are shaped `<base64 of {"context":[...]}>__LLM_RESPONSE__<answer>`.
//! Such a message takes its citations from the prefix instead of the
//! reference bundle.

use super::types::{CitationRecord, lenient};
use crate::error::RagError;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const CONTEXT_SEPARATOR: &str = "__LLM_RESPONSE__";

/// Standard alphabet, padding optional.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedContext {
    pub citations: Vec<CitationRecord>,
    /// Text after the first separator, as received.
    pub visible: String,
}

#[derive(Deserialize)]
struct ContextBlob {
    context: Vec<ContextItem>,
}

#[derive(Deserialize)]
struct ContextItem {
    #[serde(default, alias = "pageContent", deserialize_with = "lenient::string")]
    page_content: String,
    #[serde(default, deserialize_with = "lenient::object")]
    metadata: Map<String, Value>,
}

/// `Ok(None)` when `content` has no separator. An `Err` means the prefix could
/// not be decoded; callers keep the content as received.
pub fn decode_context_blob(content: &str) -> Result<Option<DecodedContext>, RagError> {
    let Some((prefix, visible)) = content.split_once(CONTEXT_SEPARATOR) else {
        return Ok(None);
    };

    let prefix = prefix.trim();
    let citations = if prefix.is_empty() {
        Vec::new()
    } else {
        let bytes = FORGIVING
            .decode(prefix)
            .map_err(|e| RagError::ParseError(format!("context blob is not base64: {e}")))?;
        let blob: ContextBlob = serde_json::from_slice(&bytes)?;
        blob.context
            .into_iter()
            .enumerate()
            .map(|(i, item)| CitationRecord {
                ordinal_id: (i + 1) as u32,
                text: item.page_content,
                metadata: item.metadata,
            })
            .collect()
    };

    tracing::debug!(target: "ragstream::citation", citations = citations.len(), "decoded context blob");
    Ok(Some(DecodedContext {
        citations,
        visible: visible.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    #[test]
    fn decodes_context_and_visible_text() {
        let blob = STANDARD.encode(r#"{"context":[{"page_content":"x","metadata":{}}]}"#);
        let content = format!("{blob}{CONTEXT_SEPARATOR}visible text");
        let decoded = decode_context_blob(&content).unwrap().unwrap();
        assert_eq!(decoded.citations.len(), 1);
        assert_eq!(decoded.citations[0].ordinal_id, 1);
        assert_eq!(decoded.citations[0].text, "x");
        assert_eq!(decoded.visible, "visible text");
    }

    #[test]
    fn camel_case_and_missing_padding() {
        let json = r#"{"context":[{"pageContent":"a","metadata":{"source":"s"}},{"pageContent":"b"}]}"#;
        let blob = STANDARD_NO_PAD.encode(json);
        let content = format!("  {blob}\n{CONTEXT_SEPARATOR}answer");
        let decoded = decode_context_blob(&content).unwrap().unwrap();
        assert_eq!(decoded.citations.len(), 2);
        assert_eq!(decoded.citations[0].metadata["source"], "s");
        assert_eq!(decoded.citations[1].ordinal_id, 2);
        assert!(decoded.citations[1].metadata.is_empty());
    }

    #[test]
    fn no_separator_is_none() {
        assert!(decode_context_blob("plain answer").unwrap().is_none());
    }

    #[test]
    fn empty_prefix_has_no_citations() {
        let decoded = decode_context_blob("__LLM_RESPONSE__only text").unwrap().unwrap();
        assert!(decoded.citations.is_empty());
        assert_eq!(decoded.visible, "only text");
    }

    #[test]
    fn splits_at_first_separator_only() {
        let decoded = decode_context_blob("__LLM_RESPONSE__a__LLM_RESPONSE__b")
            .unwrap()
            .unwrap();
        assert_eq!(decoded.visible, "a__LLM_RESPONSE__b");
    }

    #[test]
    fn undecodable_prefix_is_an_error() {
        assert!(decode_context_blob("!!not base64!!__LLM_RESPONSE__x").is_err());
        let not_json = STANDARD.encode("hello");
        assert!(decode_context_blob(&format!("{not_json}__LLM_RESPONSE__x")).is_err());
        let no_context = STANDARD.encode(r#"{"other":[]}"#);
        assert!(decode_context_blob(&format!("{no_context}__LLM_RESPONSE__x")).is_err());
    }
}
