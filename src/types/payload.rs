//! Side-channel conversation payload.
//!
//! The history endpoint returns the message list and the reference bundle
//! as JSON-encoded strings (older deployments inline them as arrays). Both
//! are decoded on demand and never fail: whatever cannot be read is empty.

use super::message::Role;
use crate::citation::types::lenient;
use crate::citation::{
    KnowledgeBaseContext, RagReference, ReferenceEntry, parse_reference_value,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub knowledgebase_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub knowledgebase_name: Option<String>,
    /// Message list: a JSON-encoded string or an inline array.
    #[serde(default)]
    pub message: Option<Value>,
    /// Reference bundle: a JSON-encoded string or an inline array.
    #[serde(default)]
    pub reference: Option<Value>,
}

impl ConversationPayload {
    /// Decode the message list. Elements that are not objects are dropped.
    pub fn turns(&self) -> Vec<RawTurn> {
        let items = match self.message.as_ref().map(decode_nested) {
            Some(Some(Value::Array(items))) => items,
            None | Some(None) | Some(Some(Value::Null)) => return Vec::new(),
            Some(Some(_)) => {
                tracing::warn!(target: "ragstream::citation", "message list is not an array, ignoring it");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawTurn>(item) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    tracing::debug!(target: "ragstream::citation", err=%e, "skipping malformed turn");
                    None
                }
            })
            .collect()
    }

    /// Decode the reference bundle, one entry per assistant turn.
    pub fn references(&self) -> Vec<ReferenceEntry> {
        self.reference
            .as_ref()
            .map(parse_reference_value)
            .unwrap_or_default()
    }

    pub fn knowledge_base(&self) -> KnowledgeBaseContext {
        KnowledgeBaseContext {
            id: self.knowledgebase_id.clone(),
            name: self.knowledgebase_name.clone(),
        }
    }
}

/// One element of the decoded message list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTurn {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    /// Reference bundle embedded in the turn itself.
    #[serde(default, deserialize_with = "embedded_reference")]
    pub rag_reference: Option<RagReference>,
}

impl RawTurn {
    pub fn role(&self) -> Role {
        Role::parse_lenient(&self.role)
    }

    pub fn is_assistant(&self) -> bool {
        self.role() == Role::Assistant
    }

    /// The turn's id, or `msg-{index}` when it has none.
    pub fn id_or_index(&self, index: usize) -> String {
        self.id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("msg-{index}"))
    }
}

/// Unwrap a JSON-encoded string into the value it holds. `None` when the
/// string does not decode.
fn decode_nested(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if s.trim().is_empty() => Some(Value::Null),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner) => Some(inner),
            Err(e) => {
                tracing::warn!(target: "ragstream::citation", err=%e, "message list is not valid JSON, ignoring it");
                None
            }
        },
        other => Some(other.clone()),
    }
}

fn embedded_reference<'de, D>(d: D) -> Result<Option<RagReference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => serde_json::from_str::<Value>(&s).ok(),
        other => other,
    };
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value::<RagReference>(v).ok()))
}
