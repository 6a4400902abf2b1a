//! Document representation and the conventions CouchDB attaches to it.
//!
//! A CouchDB document is an arbitrary JSON object. Two reserved members matter to the
//! connector: `_id`, the identifier that routes a save to update or insert, and `_rev`,
//! the revision the store requires before it accepts an update or delete.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ConnectorError, ConnectorResult};

/// Reserved member holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// Reserved member holding the document revision.
pub const REV_FIELD: &str = "_rev";

/// Property used to wrap raw, non-JSON content when no property name is given.
pub const DEFAULT_CONTENT_PROPERTY: &str = "content";

/// Returns `true` when `content` should be treated as a JSON object rather than raw text.
///
/// Detection is purely syntactic: the content must start with `{`. Parsing happens later
/// and fails loudly if the text only looks like JSON.
pub fn is_json_object(content: &str) -> bool {
    content.starts_with('{')
}

/// Generates an identifier for a document that is created without one.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A JSON object stored and retrieved by identifier.
///
/// # Example
///
/// ```ignore
/// use couchflow::document::Document;
///
/// let mut doc = Document::from_json_str(r#"{"name": "Alice"}"#)?;
/// doc.set_id("alice");
///
/// assert_eq!(doc.id(), Some("alice"));
/// assert_eq!(doc.rev(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parses JSON text into a document.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Serialization`] for malformed JSON and
    /// [`ConnectorError::InvalidDocument`] when the JSON is not an object.
    pub fn from_json_str(text: &str) -> ConnectorResult<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Converts a JSON value into a document.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidDocument`] when the value is not an object.
    pub fn from_value(value: Value) -> ConnectorResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ConnectorError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the document identifier, if the document carries a string `_id`.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Returns the document revision, if the document carries a string `_rev`.
    pub fn rev(&self) -> Option<&str> {
        self.0.get(REV_FIELD).and_then(Value::as_str)
    }

    /// Sets the `_id` member, replacing any previous identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Sets the `_rev` member, replacing any previous revision.
    pub fn set_rev(&mut self, rev: impl Into<String>) {
        self.0.insert(REV_FIELD.to_string(), Value::String(rev.into()));
    }

    /// Returns the value of a member.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Inserts a member, returning the previous value if there was one.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a member, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Serializes the document to compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> ConnectorResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = ConnectorError;

    fn try_from(value: Value) -> ConnectorResult<Self> {
        Self::from_value(value)
    }
}

/// Outcome of a successful write: the document identifier and its new revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub rev: String,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
