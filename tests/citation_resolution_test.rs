//! Citation correlation, marker normalization and context blob decoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use proptest::prelude::*;
use ragstream::citation::{
    CitationCorrelator, ReferenceEntry, SourceDocument, decode_context_blob, normalize_markers,
    parse_reference_bundle,
};
use ragstream::{ConversationPayload, MessageRenderer, Role};
use serde_json::{Value, json};
use tracing_test::traced_test;

#[path = "support/sse_fixture.rs"]
mod support;

fn history_payload() -> ConversationPayload {
    let envelope: Value = serde_json::from_str(&support::read_fixture_text("history.json")).unwrap();
    serde_json::from_value(envelope["data"].clone()).unwrap()
}

fn entry(ids: &[&str]) -> ReferenceEntry {
    ReferenceEntry {
        documents: ids
            .iter()
            .map(|id| SourceDocument {
                id: id.to_string(),
                text: format!("about {id}"),
                ..Default::default()
            })
            .collect(),
    }
}

#[test]
fn history_fixture_renders_with_positional_references() {
    let messages = MessageRenderer::default()
        .render_history(&history_payload())
        .unwrap();
    assert_eq!(messages.len(), 4);

    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[0].role, Role::User);
    assert!(messages[0].citations().is_empty());

    let first = &messages[1];
    assert_eq!(
        first.content,
        "The fixed rate is 4.2% [citation](1).\n\nSources: [citation](1)"
    );
    let meta = &first.citations()[0].metadata;
    assert_eq!(meta["page"], 2);
    assert_eq!(meta["document_id"], "doc-1");
    assert_eq!(meta["kb_id"], "kb-7");
    assert_eq!(meta["knowledge_base_name"], "Retail lending");
    assert_eq!(meta["file_name"], "rates.pdf");

    // Index 3 is past the bundle, so the fallback takes the first non-empty
    // entry no direct match reserved (index 2).
    let second = &messages[3];
    assert_eq!(second.id, "msg-3");
    assert_eq!(second.citations().len(), 2);
    assert_eq!(second.citations()[0].metadata["file_name"], "fees.docx");
    assert_eq!(second.citations()[1].metadata["file_name"], "Document doc-3");
    assert_eq!(
        second.content,
        "The fee is 1% [citation](2).\n\nSources: [citation](1), [citation](2)"
    );
}

#[test]
fn three_assistant_messages_one_entry() {
    let roles = [Role::Assistant, Role::Assistant, Role::Assistant];
    let citations = CitationCorrelator::default().correlate_batch(&roles, &[entry(&["a", "b"])]);
    assert_eq!(citations[0].len(), 2);
    assert!(citations[1].is_empty());
    assert!(citations[2].is_empty());
}

#[test]
fn direct_match_is_never_taken_by_a_fallback() {
    let roles = [Role::Assistant; 5];
    let entries = vec![entry(&[]), entry(&["x"]), entry(&[]), entry(&[]), entry(&[])];
    let assigned = CitationCorrelator::assign_batch(&roles, &entries);
    assert_eq!(assigned, vec![None, Some(1), None, None, None]);
}

#[test]
fn unreserved_entry_serves_every_fallback() {
    let roles = [Role::Assistant, Role::User, Role::Assistant];
    let entries = vec![entry(&[]), entry(&[]), entry(&[]), entry(&["late"])];
    let citations = CitationCorrelator::default().correlate_batch(&roles, &entries);
    assert_eq!(citations[0][0].metadata["document_id"], "late");
    assert!(citations[1].is_empty());
    assert_eq!(citations[2][0].metadata["document_id"], "late");
}

#[test]
fn zero_citations_leave_content_byte_identical() {
    let payload: ConversationPayload = serde_json::from_value(json!({
        "message": [{"role": "ASSISTANT", "content": "No sources here.\n"}],
        "reference": "[]"
    }))
    .unwrap();
    let messages = MessageRenderer::default().render_history(&payload).unwrap();
    assert_eq!(messages[0].content, "No sources here.\n");
}

#[test]
fn trailer_appended_exactly_once() {
    let correlator = CitationCorrelator::default();
    let citations = correlator.build_citations(&entry(&["a", "b", "c"]));
    let content = correlator.with_trailer("body", &citations);
    assert_eq!(content.matches("Sources: ").count(), 1);
    assert!(content.ends_with("[citation](1), [citation](2), [citation](3)"));
}

#[test]
fn context_blob_example() {
    let blob = STANDARD.encode(r#"{"context":[{"page_content":"x","metadata":{}}]}"#);
    let decoded = decode_context_blob(&format!("{blob}__LLM_RESPONSE__visible text"))
        .unwrap()
        .unwrap();
    assert_eq!(decoded.citations.len(), 1);
    assert_eq!(decoded.citations[0].text, "x");
    assert_eq!(decoded.visible, "visible text");
}

#[test]
fn normalizer_example() {
    assert_eq!(
        normalize_markers("see [[Citation:2]] here"),
        "see [citation](2) here"
    );
}

#[traced_test]
#[test]
fn malformed_reference_is_empty_and_logged() {
    let entries = parse_reference_bundle(Some("[{\"documents\": [}"));
    assert!(entries.is_empty());
    assert!(logs_contain("reference bundle is not valid JSON"));
}

#[traced_test]
#[test]
fn broken_context_blob_is_logged_and_kept() {
    let content = "not*base64__LLM_RESPONSE__visible";
    let payload: ConversationPayload = serde_json::from_value(json!({
        "message": [{"role": "ASSISTANT", "content": content}]
    }))
    .unwrap();
    let messages = MessageRenderer::default().render_history(&payload).unwrap();
    assert_eq!(messages[0].content, content);
    assert!(messages[0].citations().is_empty());
    assert!(logs_contain("context blob could not be decoded"));
}

fn marker_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-z ]{0,6}",
        Just("[".to_string()),
        Just("]".to_string()),
        Just("[[".to_string()),
        Just("]]".to_string()),
        Just("Citation:".to_string()),
        Just("citation:".to_string()),
        "[0-9]{1,2}",
        Just("(".to_string()),
        Just(")".to_string()),
    ];
    proptest::collection::vec(piece, 0..16).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn normalization_is_idempotent(text in marker_text()) {
        let once = normalize_markers(&text);
        prop_assert_eq!(normalize_markers(&once), once);
    }

    #[test]
    fn text_without_markers_is_unchanged(text in "[a-zA-Z0-9 .,]{0,64}") {
        prop_assert_eq!(normalize_markers(&text), text);
    }
}
