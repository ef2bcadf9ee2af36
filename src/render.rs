//! Message rendering.
//!
//! Turns raw assistant text plus whatever citation source applies into the
//! `ConversationMessage` a UI shows. Per assistant message exactly one source
//! is used: the base64 context blob when the content carries the separator,
//! the correlated reference entry otherwise. User messages pass through
//! untouched.

use crate::citation::{
    CONTEXT_SEPARATOR, CitationCorrelator, CitationRecord, KnowledgeBaseContext, RagReference,
    ReferenceEntry, decode_context_blob, normalize_markers,
};
use crate::config::CitationLabels;
use crate::error::RagError;
use crate::types::{ConversationMessage, ConversationPayload, RawTurn};

#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    correlator: CitationCorrelator,
}

impl MessageRenderer {
    pub fn new(labels: CitationLabels) -> Self {
        Self {
            correlator: CitationCorrelator::new(labels),
        }
    }

    pub fn with_knowledge_base(mut self, knowledge_base: KnowledgeBaseContext) -> Self {
        self.correlator.set_knowledge_base(knowledge_base);
        self
    }

    pub fn set_knowledge_base(&mut self, knowledge_base: KnowledgeBaseContext) {
        self.correlator.set_knowledge_base(knowledge_base);
    }

    pub fn correlator(&self) -> &CitationCorrelator {
        &self.correlator
    }

    /// Render a loaded conversation, correlating references in batch mode.
    /// Assistant turns that carry a context blob take no part in batch
    /// assignment, since their citations come from the blob.
    pub fn render_history(
        &self,
        payload: &ConversationPayload,
    ) -> Result<Vec<ConversationMessage>, RagError> {
        let correlator = self.correlator_for(payload);
        let turns = payload.turns();
        let entries = payload.references();
        let candidates: Vec<bool> = turns
            .iter()
            .map(|t| t.is_assistant() && !t.content.contains(CONTEXT_SEPARATOR))
            .collect();
        let batch = correlator.correlate_candidates(&candidates, &entries);

        tracing::debug!(
            target: "ragstream::citation",
            turns = turns.len(),
            entries = entries.len(),
            "rendering history"
        );

        turns
            .iter()
            .zip(batch)
            .enumerate()
            .map(|(i, (turn, citations))| {
                let id = turn.id_or_index(i);
                if !turn.is_assistant() {
                    return Ok(ConversationMessage::new(id, turn.role(), turn.content.clone()));
                }
                let citations = if citations.is_empty() {
                    embedded_citations(&correlator, turn)
                } else {
                    citations
                };
                finalize(&correlator, id, &turn.content, citations)
            })
            .collect()
    }

    /// Render the reply of a non-streaming turn: the last decoded turn, if it
    /// is an assistant turn, with live correlation.
    pub fn render_reply(
        &self,
        payload: &ConversationPayload,
    ) -> Result<Option<ConversationMessage>, RagError> {
        let correlator = self.correlator_for(payload);
        let turns = payload.turns();
        let Some((index, turn)) = turns.iter().enumerate().next_back() else {
            return Ok(None);
        };
        if !turn.is_assistant() {
            return Ok(None);
        }

        let mut citations = correlator.correlate_live(&payload.references());
        if citations.is_empty() {
            citations = embedded_citations(&correlator, turn);
        }
        finalize(&correlator, turn.id_or_index(index), &turn.content, citations).map(Some)
    }

    /// Render a freshly streamed answer with the bundles seen on the stream.
    /// Bundles without documents are ignored; the newest remaining one wins.
    pub fn render_streamed(
        &self,
        id: impl Into<String>,
        answer: &str,
        references: &[RagReference],
    ) -> Result<ConversationMessage, RagError> {
        let entries: Vec<ReferenceEntry> = references
            .iter()
            .filter(|r| !r.is_empty())
            .map(ReferenceEntry::from)
            .collect();
        let citations = self.correlator.correlate_live(&entries);
        finalize(&self.correlator, id.into(), answer, citations)
    }

    fn correlator_for(&self, payload: &ConversationPayload) -> CitationCorrelator {
        let kb = payload.knowledge_base();
        if kb.id.is_none() && kb.name.is_none() {
            self.correlator.clone()
        } else {
            self.correlator.clone().with_knowledge_base(kb)
        }
    }
}

fn embedded_citations(correlator: &CitationCorrelator, turn: &RawTurn) -> Vec<CitationRecord> {
    turn.rag_reference
        .as_ref()
        .filter(|r| !r.is_empty())
        .map(|r| correlator.build_citations(&r.to_entry()))
        .unwrap_or_default()
}

/// Build the final assistant message.
///
/// Content with a context blob takes its citations from the blob; otherwise
/// the model text is normalized and the trailer for `citations` appended.
fn finalize(
    correlator: &CitationCorrelator,
    id: String,
    content: &str,
    citations: Vec<CitationRecord>,
) -> Result<ConversationMessage, RagError> {
    let mut message = ConversationMessage::assistant(id, "");

    match decode_context_blob(content) {
        Ok(Some(decoded)) => {
            message.content = normalize_markers(&decoded.visible);
            message.attach_citations(decoded.citations)?;
            return Ok(message);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                target: "ragstream::citation",
                id = %message.id,
                err = %e,
                "context blob could not be decoded, keeping content as received"
            );
            message.content = content.to_string();
            message.attach_citations(Vec::new())?;
            return Ok(message);
        }
    }

    let body = normalize_markers(content);
    message.content = correlator.with_trailer(&body, &citations);
    message.attach_citations(citations)?;
    Ok(message)
}
