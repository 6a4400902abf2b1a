//! Client abstraction between the connector and the store.
//!
//! The connector never speaks CouchDB's protocol itself. Every round trip goes through a
//! [`CouchBackend`], which maps one-to-one onto CouchDB's document and view endpoints.
//!
//! # Traits
//!
//! - [`CouchBackend`]: document get/put/delete and view queries against one database
//! - [`BackendBuilder`]: opens a backend for a configuration and optional credentials
//!
//! # Revisions
//!
//! Updates and deletes must carry the document's current revision. Backends reject stale
//! revisions with [`ConnectorError::Conflict`](crate::error::ConnectorError::Conflict) and
//! never resolve them on the caller's behalf.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    config::{ConnectionConfig, Credentials},
    document::{Document, DocumentResponse},
    error::ConnectorResult,
    view::{ViewName, ViewQuery, ViewRow},
};

/// Database metadata as reported by `GET /{db}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
    /// Opaque update sequence. Numeric on CouchDB 1.x, a string afterwards.
    #[serde(default)]
    pub update_seq: Value,
    #[serde(default)]
    pub instance_start_time: String,
}

/// Abstract interface for a client bound to a single CouchDB database.
///
/// Implementations must be thread-safe: the connector shares one backend between all
/// concurrently running processors and adds no locking around calls.
#[async_trait]
pub trait CouchBackend: Send + Sync + Debug {
    /// Returns metadata about the bound database. Doubles as the liveness probe.
    async fn info(&self) -> ConnectorResult<DatabaseInfo>;

    /// Returns `true` if a live document with this identifier exists.
    async fn contains(&self, id: &str) -> ConnectorResult<bool>;

    /// Fetches the current revision of a document, or `None` if it does not exist.
    async fn get(&self, id: &str) -> ConnectorResult<Option<Document>>;

    /// Stores a new document under its `_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if the document has no `_id` and `Conflict` if the
    /// identifier is already taken.
    async fn create(&self, document: Document) -> ConnectorResult<DocumentResponse>;

    /// Replaces an existing document. The document must carry `_id` and its current `_rev`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for an unknown identifier and `Conflict` for a stale or
    /// missing revision.
    async fn update(&self, document: Document) -> ConnectorResult<DocumentResponse>;

    /// Deletes a document at the given revision.
    ///
    /// # Errors
    ///
    /// Same as [`update`](CouchBackend::update).
    async fn delete(&self, id: &str, rev: &str) -> ConnectorResult<DocumentResponse>;

    /// Runs a view query and returns its rows in key order.
    async fn query_view(&self, view: &ViewName, query: ViewQuery) -> ConnectorResult<Vec<ViewRow>>;

    /// Releases the client. The default implementation is a no-op.
    async fn shutdown(self) -> ConnectorResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory for backends, invoked by the connector on every `connect`.
#[async_trait]
pub trait BackendBuilder: Send + Sync {
    type Backend: CouchBackend;

    /// Opens a backend for `config`. When `config.auto_create` is set a missing database is
    /// created; otherwise a missing database is an error.
    async fn build(
        &self,
        config: &ConnectionConfig,
        credentials: Option<&Credentials>,
    ) -> ConnectorResult<Self::Backend>;
}
