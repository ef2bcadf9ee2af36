//! Citation data types.
//!
//! Inbound shapes (`SourceDocument`, `ReferenceEntry`, `RagReference`) are
//! deserialized leniently: the backend is loose about nulls and about whether
//! ids are strings or numbers, and a sloppy field must not cost the message
//! its citations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved chunk as sent by the backend. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub metadata: Map<String, Value>,
}

/// Sources used for one assistant turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(default, deserialize_with = "lenient::list")]
    pub documents: Vec<SourceDocument>,
}

impl ReferenceEntry {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A citation attached to a message.
///
/// `ordinal_id` is the 1-based position of the source in the entry it was
/// built from and never changes once attached: inline `[citation](N)` markers
/// resolve against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    #[serde(rename = "id")]
    pub ordinal_id: u32,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// One chunk in the backend's native reference bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDocument {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub chunk_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub document_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub document_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub score: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub page_range: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub document_url: Option<String>,
}

/// Reference bundle as emitted on the event stream and embedded in history
/// turns: `{ chatid, reference: [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagReference {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub chatid: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub reference: Vec<ReferenceDocument>,
}

impl RagReference {
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// View the bundle as a `ReferenceEntry` so it flows through the same
    /// correlation path as side-channel references.
    pub fn to_entry(&self) -> ReferenceEntry {
        let documents = self
            .reference
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let id = doc
                    .document_id
                    .clone()
                    .or_else(|| doc.chunk_id.clone())
                    .unwrap_or_else(|| (i + 1).to_string());

                let mut metadata = Map::new();
                let mut put = |key: &str, value: &Option<String>| {
                    if let Some(v) = value {
                        metadata.insert(key.to_string(), Value::String(v.clone()));
                    }
                };
                put("title", &doc.document_name);
                put("source", &doc.content_type);
                put("page", &doc.page_range);
                put("url", &doc.document_url);
                put("documentId", &doc.document_id);
                put("chunkId", &doc.chunk_id);
                put("score", &doc.score);

                SourceDocument {
                    id,
                    text: doc.text.clone(),
                    name: doc.document_name.clone(),
                    metadata,
                }
            })
            .collect();
        ReferenceEntry { documents }
    }
}

impl From<&RagReference> for ReferenceEntry {
    fn from(r: &RagReference) -> Self {
        r.to_entry()
    }
}

/// Knowledge base the conversation is bound to; used for citation labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBaseContext {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl KnowledgeBaseContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    fn scalar_to_string(v: Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(d)?.and_then(scalar_to_string))
    }

    pub fn string<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(opt_string(d)?.unwrap_or_default())
    }

    pub fn object<'de, D>(d: D) -> Result<Map<String, Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            Some(Value::Object(map)) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }
}
