//! Processor invocations as data.
//!
//! A flow engine configures connector calls rather than writing code for them. A
//! [`Processor`] is one such call, tagged by `operation`:
//!
//! ```json
//! { "operation": "save", "content": "hello", "property_name": "greeting" }
//! { "operation": "find_by_id", "id": "order-1", "default_value": "{\"status\": \"new\"}" }
//! { "operation": "list_view", "view": "orders/by_total", "start_key": "10", "limit": 5 }
//! ```
//!
//! [`CouchConnector::invoke`] routes a processor to the matching handler.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{backend::BackendBuilder, connector::CouchConnector, error::ConnectorResult};

/// One connector operation with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Processor {
    Save {
        content: Option<String>,
        id: Option<String>,
        property_name: Option<String>,
    },
    FindById {
        id: String,
        default_value: Option<String>,
    },
    FindByKey {
        view: String,
        key: String,
        default_value: Option<String>,
    },
    ListView {
        view: String,
        key: Option<String>,
        start_key: Option<String>,
        end_key: Option<String>,
        limit: Option<usize>,
    },
    Remove {
        /// A JSON document carrying `_id`, or a bare identifier.
        document: String,
        rev: Option<String>,
    },
}

impl Processor {
    /// Returns the operation tag.
    pub fn name(&self) -> &'static str {
        match self {
            Processor::Save { .. } => "save",
            Processor::FindById { .. } => "find_by_id",
            Processor::FindByKey { .. } => "find_by_key",
            Processor::ListView { .. } => "list_view",
            Processor::Remove { .. } => "remove",
        }
    }
}

impl<B: BackendBuilder> CouchConnector<B> {
    /// Runs `processor` and returns the handler's payload.
    pub async fn invoke(&self, processor: &Processor) -> ConnectorResult<String> {
        debug!(operation = processor.name(), "invoking processor");

        match processor {
            Processor::Save {
                content,
                id,
                property_name,
            } => {
                self.save(content.as_deref(), id.as_deref(), property_name.as_deref())
                    .await
            }
            Processor::FindById { id, default_value } => {
                self.find_by_id(id, default_value.as_deref()).await
            }
            Processor::FindByKey {
                view,
                key,
                default_value,
            } => {
                self.find_by_key(view, key, default_value.as_deref())
                    .await
            }
            Processor::ListView {
                view,
                key,
                start_key,
                end_key,
                limit,
            } => {
                self.list_view(
                    view,
                    key.as_deref(),
                    start_key.as_deref(),
                    end_key.as_deref(),
                    *limit,
                )
                .await
            }
            Processor::Remove { document, rev } => self.remove(document, rev.as_deref()).await,
        }
    }
}
