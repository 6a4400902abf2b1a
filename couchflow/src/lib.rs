//! CouchDB document operations as flow processors.
//!
//! This crate is the primary entry point of couchflow. It re-exports the core types and
//! the available backends.
//!
//! # Features
//!
//! - **Processors** - `save`, `find_by_id`, `find_by_key`, `list_view` and `remove`, taking
//!   and returning JSON text the way a message flow carries it
//! - **Lifecycle** - `connect`, `disconnect`, `validate_connection` and `connection_id`
//!   hooks for the host runtime
//! - **Configuration-driven dispatch** - [`Processor`](processor::Processor) values
//!   deserialized from flow configuration and run with `invoke`
//! - **Pluggable backends** - in-memory for development and tests, HTTP for CouchDB
//!
//! # Quick Start
//!
//! ```ignore
//! use couchflow::{prelude::*, memory::InMemoryStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ConnectorError> {
//!     let connector = CouchConnector::new(ConnectionConfig::default(), InMemoryStoreBuilder::default());
//!     connector.connect(None).await?;
//!
//!     // Raw text is stored under the `content` property
//!     let id = connector.save(Some("Another string"), None, None).await?;
//!
//!     // Missing documents come back as the default value carrying the requested id
//!     let order = connector.find_by_id("order-1", Some(r#"{"status": "new"}"#)).await?;
//!
//!     // ...so they can be saved straight back
//!     connector.save(Some(&order), None, None).await?;
//!
//!     connector.remove(&id, None).await?;
//!     connector.disconnect().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration-driven dispatch
//!
//! ```ignore
//! use couchflow::prelude::*;
//!
//! let processor: Processor = serde_json::from_str(
//!     r#"{"operation": "list_view", "view": "orders/by_customer", "key": "alice"}"#,
//! )?;
//! let orders = connector.invoke(&processor).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process store for development and testing
//! - [`http`] - CouchDB over HTTP (requires `http` feature)

pub mod prelude;

pub use couchflow_core::{backend, config, connector, document, error, processor, view};

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory backend implementations.
pub mod memory {
    pub use couchflow_memory::{FieldView, InMemoryStore, InMemoryStoreBuilder};
}

/// CouchDB HTTP backend implementations.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http {
    pub use couchflow_http::{HttpStore, HttpStoreBuilder};
}
