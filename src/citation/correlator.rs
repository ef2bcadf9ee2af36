//! Correlation of reference entries with assistant messages.
//!
//! The reference bundle and the message list are produced independently by
//! the backend, so their lengths are never assumed to match. Live mode uses
//! the newest entry; batch mode pairs entries with historical messages by
//! position, falling back to an entry no direct match reserved.

use super::types::{CitationRecord, KnowledgeBaseContext, ReferenceEntry, SourceDocument};
use crate::config::CitationLabels;
use crate::types::Role;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct CitationCorrelator {
    labels: CitationLabels,
    knowledge_base: KnowledgeBaseContext,
}

impl CitationCorrelator {
    pub fn new(labels: CitationLabels) -> Self {
        Self {
            labels,
            knowledge_base: KnowledgeBaseContext::default(),
        }
    }

    pub fn with_knowledge_base(mut self, knowledge_base: KnowledgeBaseContext) -> Self {
        self.knowledge_base = knowledge_base;
        self
    }

    pub fn set_knowledge_base(&mut self, knowledge_base: KnowledgeBaseContext) {
        self.knowledge_base = knowledge_base;
    }

    pub fn knowledge_base(&self) -> &KnowledgeBaseContext {
        &self.knowledge_base
    }

    pub fn labels(&self) -> &CitationLabels {
        &self.labels
    }

    /// One record per document, ordinal = 1-based position in the entry.
    pub fn build_citations(&self, entry: &ReferenceEntry) -> Vec<CitationRecord> {
        entry
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| CitationRecord {
                ordinal_id: (i + 1) as u32,
                text: doc.text.clone(),
                metadata: self.enrich(doc),
            })
            .collect()
    }

    fn enrich(&self, doc: &SourceDocument) -> Map<String, Value> {
        let mut metadata = doc.metadata.clone();
        metadata.insert("document_id".to_string(), Value::String(doc.id.clone()));

        let kb_id = self
            .knowledge_base
            .id
            .clone()
            .or_else(|| meta_str(&doc.metadata, &["knowledgeBaseId", "kb_id"]));
        if let Some(kb_id) = &kb_id {
            metadata.insert("kb_id".to_string(), Value::String(kb_id.clone()));
        }
        let kb_name = self
            .knowledge_base
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| kb_id.map(|id| format!("{} {id}", self.labels.knowledge_base)));
        if let Some(kb_name) = kb_name {
            metadata.insert("knowledge_base_name".to_string(), Value::String(kb_name));
        }

        let file_name = doc
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| meta_str(&doc.metadata, &["fileName", "file_name"]))
            .unwrap_or_else(|| format!("{} {}", self.labels.document, doc.id));
        metadata.insert("file_name".to_string(), Value::String(file_name));

        metadata
    }

    /// `"\n\n" + prefix + "[citation](1), [citation](2), ..."`, or `None` when
    /// there is nothing to cite.
    pub fn trailer(&self, citations: &[CitationRecord]) -> Option<String> {
        if citations.is_empty() {
            return None;
        }
        let markers = citations
            .iter()
            .map(|c| format!("[citation]({})", c.ordinal_id))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("\n\n{}{markers}", self.labels.trailer_prefix))
    }

    /// Append the trailer to `content` if there are citations.
    pub fn with_trailer(&self, content: &str, citations: &[CitationRecord]) -> String {
        match self.trailer(citations) {
            Some(trailer) => format!("{content}{trailer}"),
            None => content.to_string(),
        }
    }

    /// Live mode candidate: the last entry, if it has documents.
    pub fn select_live(entries: &[ReferenceEntry]) -> Option<&ReferenceEntry> {
        entries.last().filter(|e| !e.is_empty())
    }

    pub fn correlate_live(&self, entries: &[ReferenceEntry]) -> Vec<CitationRecord> {
        Self::select_live(entries)
            .map(|entry| self.build_citations(entry))
            .unwrap_or_default()
    }

    /// Decide which entry each message uses.
    ///
    /// Direct positional matches (entry `i` for the assistant message at
    /// position `i`, in range and non-empty) are assigned first and reserved.
    /// Remaining assistant messages then fall back to the first non-empty entry
    /// that no direct match reserved.
    pub fn assign_batch(roles: &[Role], entries: &[ReferenceEntry]) -> Vec<Option<usize>> {
        let candidates: Vec<bool> = roles.iter().map(|r| *r == Role::Assistant).collect();
        Self::assign_candidates(&candidates, entries)
    }

    /// Like [`Self::assign_batch`], with the participating positions given
    /// directly. Non-candidates get nothing and reserve nothing.
    pub fn assign_candidates(candidates: &[bool], entries: &[ReferenceEntry]) -> Vec<Option<usize>> {
        let mut reserved = vec![false; entries.len()];
        let mut assigned: Vec<Option<usize>> = candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let direct = *candidate && entries.get(i).is_some_and(|e| !e.is_empty());
                if direct {
                    reserved[i] = true;
                    Some(i)
                } else {
                    None
                }
            })
            .collect();

        let fallback = entries
            .iter()
            .enumerate()
            .position(|(j, e)| !reserved[j] && !e.is_empty());
        if let Some(j) = fallback {
            for (slot, candidate) in assigned.iter_mut().zip(candidates) {
                if *candidate && slot.is_none() {
                    *slot = Some(j);
                }
            }
        }

        tracing::debug!(
            target: "ragstream::citation",
            messages = candidates.len(),
            entries = entries.len(),
            matched = assigned.iter().filter(|a| a.is_some()).count(),
            "batch correlation"
        );
        assigned
    }

    /// Citations for every message of a loaded list; empty for user messages
    /// and for assistant messages nothing matched.
    pub fn correlate_batch(
        &self,
        roles: &[Role],
        entries: &[ReferenceEntry],
    ) -> Vec<Vec<CitationRecord>> {
        self.citations_for(Self::assign_batch(roles, entries), entries)
    }

    /// [`Self::correlate_batch`] over explicit candidate positions.
    pub fn correlate_candidates(
        &self,
        candidates: &[bool],
        entries: &[ReferenceEntry],
    ) -> Vec<Vec<CitationRecord>> {
        self.citations_for(Self::assign_candidates(candidates, entries), entries)
    }

    fn citations_for(
        &self,
        assigned: Vec<Option<usize>>,
        entries: &[ReferenceEntry],
    ) -> Vec<Vec<CitationRecord>> {
        assigned
            .into_iter()
            .map(|slot| {
                slot.map(|j| self.build_citations(&entries[j]))
                    .unwrap_or_default()
            })
            .collect()
    }
}

fn meta_str(metadata: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match metadata.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
