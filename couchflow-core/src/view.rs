//! View addressing and view query construction.
//!
//! A view is a server-side map/reduce index identified by a design document and a view
//! name. The connector never evaluates views itself; it only names them and forwards the
//! key constraints.
//!
//! ```ignore
//! use couchflow::view::{ViewName, ViewQuery};
//! use serde_json::json;
//!
//! let view: ViewName = "orders/by_customer".parse()?;
//! let query = ViewQuery::builder()
//!     .start_key(json!("a"))
//!     .end_key(json!("m"))
//!     .limit(20)
//!     .include_docs(true)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::{
    document::Document,
    error::{ConnectorError, ConnectorResult},
};

const ALL_DOCS: &str = "_all_docs";
const DESIGN_PREFIX: &str = "_design/";

/// Identifies the index a view query runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewName {
    /// The built-in index of every document, keyed by `_id`.
    AllDocs,
    /// A view defined in a design document.
    Design { design: String, view: String },
}

impl ViewName {
    pub fn new(design: impl Into<String>, view: impl Into<String>) -> Self {
        ViewName::Design {
            design: design.into(),
            view: view.into(),
        }
    }

    /// Parses `design/view`, `_design/design/view` or `_all_docs`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidView`] when the name does not split into a
    /// non-empty design document and view name.
    pub fn parse(name: &str) -> ConnectorResult<Self> {
        let name = name.trim();

        if name == ALL_DOCS {
            return Ok(ViewName::AllDocs);
        }

        let path = name.strip_prefix(DESIGN_PREFIX).unwrap_or(name);

        match path.split_once('/') {
            Some((design, view))
                if !design.is_empty() && !view.is_empty() && !view.contains('/') =>
            {
                Ok(ViewName::new(design, view))
            }
            _ => Err(ConnectorError::InvalidView(format!(
                "'{name}' is not of the form design/view"
            ))),
        }
    }
}

impl FromStr for ViewName {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewName::parse(s)
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewName::AllDocs => f.write_str(ALL_DOCS),
            ViewName::Design { design, view } => write!(f, "{design}/{view}"),
        }
    }
}

/// Key constraints and options for a view query.
///
/// `key` and the `start_key`/`end_key` range are mutually exclusive by convention only;
/// both are forwarded to the store when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    /// Only rows whose key equals this value.
    pub key: Option<Value>,
    /// Only rows whose key collates at or after this value.
    pub start_key: Option<Value>,
    /// Only rows whose key collates at or before this value.
    pub end_key: Option<Value>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
    /// Attach the full document to each row.
    pub include_docs: bool,
}

impl ViewQuery {
    pub fn builder() -> ViewQueryBuilder {
        ViewQueryBuilder::default()
    }
}

/// Fluent builder for [`ViewQuery`].
#[derive(Debug, Default)]
pub struct ViewQueryBuilder {
    query: ViewQuery,
}

impl ViewQueryBuilder {
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.query.key = Some(key.into());
        self
    }

    pub fn start_key(mut self, start_key: impl Into<Value>) -> Self {
        self.query.start_key = Some(start_key.into());
        self
    }

    pub fn end_key(mut self, end_key: impl Into<Value>) -> Self {
        self.query.end_key = Some(end_key.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn include_docs(mut self, include_docs: bool) -> Self {
        self.query.include_docs = include_docs;
        self
    }

    pub fn build(self) -> ViewQuery {
        self.query
    }
}

/// A single row of a view result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    /// Identifier of the emitting document. Absent for reduced rows.
    #[serde(default)]
    pub id: Option<String>,
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    /// The full document, when the query asked for it.
    #[serde(default)]
    pub doc: Option<Document>,
}

/// Interprets key text supplied by a flow.
///
/// Text that parses as JSON is used as that JSON value, so `42` is a number and `["a", 1]`
/// a compound key. Anything else is taken as a plain string key.
pub fn key_from_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
