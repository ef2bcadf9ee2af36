use crate::citation::CitationRecord;
use crate::error::RagError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a message. Parsing is case-insensitive (`ASSISTANT`, `assistant`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Unknown or missing roles are treated as user turns, which are never
    /// enriched.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(Role::User)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(RagError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// A message as handed to the rendering layer.
///
/// Citations can be attached once. Inline `[citation](N)` markers in
/// `content` resolve against their ordinals, so replacing them afterwards
/// would silently re-point the markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    citations: Vec<CitationRecord>,
    #[serde(skip)]
    citations_attached: bool,
}

impl ConversationMessage {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            citations: Vec::new(),
            citations_attached: false,
        }
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn citations(&self) -> &[CitationRecord] {
        &self.citations
    }

    pub fn citations_attached(&self) -> bool {
        self.citations_attached || !self.citations.is_empty()
    }

    /// Attach the final citation list. Fails if citations were already
    /// attached to this message.
    pub fn attach_citations(&mut self, citations: Vec<CitationRecord>) -> Result<(), RagError> {
        if self.citations_attached() {
            return Err(RagError::InvalidInput(format!(
                "citations already attached to message {}",
                self.id
            )));
        }
        self.citations = citations;
        self.citations_attached = true;
        Ok(())
    }

    pub fn with_citations(mut self, citations: Vec<CitationRecord>) -> Result<Self, RagError> {
        self.attach_citations(citations)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn record(n: u32) -> CitationRecord {
        CitationRecord {
            ordinal_id: n,
            text: format!("t{n}"),
            metadata: Map::new(),
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("ASSISTANT".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(" User ".parse::<Role>().unwrap(), Role::User);
        assert!("data".parse::<Role>().is_err());
        assert_eq!(Role::parse_lenient("data"), Role::User);
    }

    #[test]
    fn citations_attach_once() {
        let mut msg = ConversationMessage::assistant("m1", "body");
        msg.attach_citations(vec![record(1)]).unwrap();
        let err = msg.attach_citations(vec![record(1), record(2)]).unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
        assert_eq!(msg.citations().len(), 1);
    }

    #[test]
    fn attaching_empty_list_still_counts() {
        let mut msg = ConversationMessage::assistant("m1", "body");
        msg.attach_citations(Vec::new()).unwrap();
        assert!(msg.attach_citations(vec![record(1)]).is_err());
    }

    #[test]
    fn serializes_for_rendering_layer() {
        let msg = ConversationMessage::assistant("m1", "body")
            .with_citations(vec![record(1)])
            .unwrap();
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "m1",
                "role": "assistant",
                "content": "body",
                "citations": [{"id": 1, "text": "t1", "metadata": {}}]
            })
        );
    }
}
