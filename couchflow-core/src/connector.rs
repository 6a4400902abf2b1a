//! The CouchDB connector and its processors.
//!
//! [`CouchConnector`] owns one client handle, opened by `connect` and released by
//! `disconnect`, and exposes five processors that each make a single pass through the
//! backend: [`save`](CouchConnector::save), [`find_by_id`](CouchConnector::find_by_id),
//! [`find_by_key`](CouchConnector::find_by_key), [`list_view`](CouchConnector::list_view)
//! and [`remove`](CouchConnector::remove).
//!
//! Processors speak JSON text in and out, which is what a message flow carries. Errors
//! from the backend are returned untouched.
//!
//! # Example
//!
//! ```ignore
//! use couchflow::{prelude::*, memory::InMemoryStoreBuilder};
//!
//! let connector = CouchConnector::new(ConnectionConfig::default(), InMemoryStoreBuilder::default());
//! connector.connect(None).await?;
//!
//! let id = connector.save(Some("hello"), None, None).await?;
//! let stored = connector.find_by_id(&id, None).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mea::rwlock::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    backend::{BackendBuilder, CouchBackend},
    config::{ConnectionConfig, Credentials},
    document::{DEFAULT_CONTENT_PROPERTY, Document, ID_FIELD, generate_id, is_json_object},
    error::{ConnectorError, ConnectorResult},
    view::{ViewName, ViewQuery, key_from_text},
};

/// Lifecycle hooks a host runtime drives on every connector it manages.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens the client handle, replacing any handle that is already open.
    async fn connect(&self, credentials: Option<Credentials>) -> ConnectorResult<()>;

    /// Releases the client handle. Calling it while disconnected does nothing.
    async fn disconnect(&self);

    /// Probes the live handle. Returns `false` when disconnected or when the probe fails.
    async fn validate_connection(&self) -> bool;

    /// Identifies the live connection for the host's connection pool.
    async fn connection_id(&self) -> ConnectorResult<String>;
}

/// An open client handle and when it was opened.
#[derive(Debug)]
struct Session<C> {
    backend: C,
    connected_at: DateTime<Utc>,
}

/// Connector exposing CouchDB document operations as processors.
///
/// # Type Parameters
///
/// * `B` - Builder producing the backend opened on `connect`
pub struct CouchConnector<B: BackendBuilder> {
    config: ConnectionConfig,
    builder: B,
    session: RwLock<Option<Session<B::Backend>>>,
}

impl<B: BackendBuilder> CouchConnector<B> {
    /// Creates a disconnected connector.
    pub fn new(config: ConnectionConfig, builder: B) -> Self {
        Self {
            config,
            builder,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns when the current handle was opened, or `None` while disconnected.
    pub async fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.connected_at)
    }

    /// Saves or updates a document and returns its identifier.
    ///
    /// Content starting with `{` is parsed as a JSON document; an `_id` inside it takes
    /// precedence over `id`. Any other content is stored as the single member
    /// `property_name` (default `content`). When the resulting identifier already exists
    /// the document is updated, resolving its current revision if none was given;
    /// otherwise it is created, with a generated identifier if needed.
    ///
    /// Blank `id` and `property_name` values count as absent. A numeric or boolean `_id`
    /// is used as its text form.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingInput`] when `content` is absent, and any error
    /// raised while parsing the content or writing the document.
    pub async fn save(
        &self,
        content: Option<&str>,
        id: Option<&str>,
        property_name: Option<&str>,
    ) -> ConnectorResult<String> {
        let content = content.ok_or_else(|| ConnectorError::MissingInput("content".into()))?;
        let property_name = non_blank(property_name).unwrap_or(DEFAULT_CONTENT_PROPERTY);
        let mut document = shape_document(content, non_blank(id), property_name)?;

        let session = self.session.read().await;
        let backend = live(&*session)?;

        let exists = match document.id() {
            Some(id) => backend.contains(id).await?,
            None => false,
        };

        let response = if exists {
            if document.rev().is_none() {
                resolve_rev(backend, &mut document).await?;
            }
            debug!(id = ?document.id(), "updating existing document");
            backend.update(document).await?
        } else {
            if document.id().is_none() {
                document.set_id(generate_id());
            }
            debug!(id = ?document.id(), "creating document");
            backend.create(document).await?
        };

        Ok(response.id)
    }

    /// Returns the stored document as JSON, or `default_value` annotated with `id` when
    /// no such document exists.
    ///
    /// An absent default is treated as `{}`, so the result can be fed straight into
    /// [`save`](CouchConnector::save).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingInput`] for a blank `id`,
    /// [`ConnectorError::InvalidDocument`] or [`ConnectorError::Serialization`] when the
    /// default is not a JSON object, and any backend error.
    pub async fn find_by_id(&self, id: &str, default_value: Option<&str>) -> ConnectorResult<String> {
        if id.trim().is_empty() {
            return Err(ConnectorError::MissingInput("id".into()));
        }

        let session = self.session.read().await;
        let backend = live(&*session)?;

        match backend.get(id).await? {
            Some(document) => document.to_json_string(),
            None => {
                debug!(id, "document not found, returning default");
                let mut fallback = parse_default(default_value)?;
                fallback.set_id(id);
                fallback.to_json_string()
            }
        }
    }

    /// Queries `view` for rows whose key equals `key` and returns the first hit's
    /// document, or `default_value` (`{}` when absent) if nothing matches.
    ///
    /// `key` is read as JSON when it parses, and as a string key otherwise.
    pub async fn find_by_key(
        &self,
        view: &str,
        key: &str,
        default_value: Option<&str>,
    ) -> ConnectorResult<String> {
        let view = ViewName::parse(view)?;
        let query = ViewQuery::builder()
            .key(key_from_text(key))
            .limit(1)
            .include_docs(true)
            .build();

        let session = self.session.read().await;
        let backend = live(&*session)?;

        match backend.query_view(&view, query).await?.into_iter().next() {
            Some(row) => match row.doc {
                Some(document) => document.to_json_string(),
                None => Ok(serde_json::to_string(&row.value)?),
            },
            None => {
                debug!(%view, key, "no row matched, returning default");
                Ok(default_value.unwrap_or("{}").to_string())
            }
        }
    }

    /// Returns every document matched by `view` as a JSON array.
    ///
    /// `key` selects an exact key; `start_key`/`end_key` select an inclusive range. They are
    /// meant to be used one or the other, but all given constraints are forwarded.
    pub async fn list_view(
        &self,
        view: &str,
        key: Option<&str>,
        start_key: Option<&str>,
        end_key: Option<&str>,
        limit: Option<usize>,
    ) -> ConnectorResult<String> {
        let view = ViewName::parse(view)?;

        let mut builder = ViewQuery::builder().include_docs(true);
        if let Some(key) = non_blank(key) {
            builder = builder.key(key_from_text(key));
        }
        if let Some(start_key) = non_blank(start_key) {
            builder = builder.start_key(key_from_text(start_key));
        }
        if let Some(end_key) = non_blank(end_key) {
            builder = builder.end_key(key_from_text(end_key));
        }
        if let Some(limit) = limit {
            builder = builder.limit(limit);
        }

        let session = self.session.read().await;
        let backend = live(&*session)?;

        let documents = backend
            .query_view(&view, builder.build())
            .await?
            .into_iter()
            .map(|row| row.doc.map(Value::from).unwrap_or(row.value))
            .collect::<Vec<_>>();

        debug!(%view, rows = documents.len(), "listed view");

        Ok(serde_json::to_string(&documents)?)
    }

    /// Deletes a document and returns its identifier.
    ///
    /// `document_or_id` is either a JSON document carrying `_id` (and possibly `_rev`) or
    /// a bare identifier. An explicit `rev` wins over an embedded one; with neither, the
    /// current revision is read from the store first.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DocumentNotFound`] when the revision has to be resolved
    /// and the document does not exist, and any backend error, notably `Conflict` for a
    /// stale revision.
    pub async fn remove(&self, document_or_id: &str, rev: Option<&str>) -> ConnectorResult<String> {
        let (id, embedded_rev) = if is_json_object(document_or_id) {
            let mut document = Document::from_json_str(document_or_id)?;
            stringify_id(&mut document)?;
            let id = document
                .id()
                .ok_or_else(|| ConnectorError::InvalidDocument(format!("document to remove has no {ID_FIELD}")))?
                .to_string();
            (id, document.rev().map(str::to_string))
        } else {
            (document_or_id.to_string(), None)
        };

        if id.trim().is_empty() {
            return Err(ConnectorError::MissingInput("id".into()));
        }

        let session = self.session.read().await;
        let backend = live(&*session)?;

        let rev = match non_blank(rev).map(str::to_string).or(embedded_rev) {
            Some(rev) => rev,
            None => backend
                .get(&id)
                .await?
                .and_then(|current| current.rev().map(str::to_string))
                .ok_or_else(|| ConnectorError::DocumentNotFound(id.clone(), self.config.database.clone()))?,
        };

        debug!(id = %id, rev = %rev, "removing document");

        Ok(backend.delete(&id, &rev).await?.id)
    }

    async fn open(&self, credentials: Option<&Credentials>) -> ConnectorResult<B::Backend> {
        self.config.validate()?;
        self.builder.build(&self.config, credentials).await
    }
}

#[async_trait]
impl<B: BackendBuilder> Connector for CouchConnector<B> {
    async fn connect(&self, credentials: Option<Credentials>) -> ConnectorResult<()> {
        let backend = self.open(credentials.as_ref()).await.map_err(|e| {
            ConnectorError::Connection(format!("Failed to connect to {}: {}", self.config.address(), e))
        })?;

        let previous = self.session.write().await.replace(Session {
            backend,
            connected_at: Utc::now(),
        });

        info!(
            address = %self.config.address(),
            database = %self.config.database,
            user = credentials.as_ref().map(|c| c.username.as_str()),
            "connected to CouchDB"
        );

        if let Some(previous) = previous {
            if let Err(e) = previous.backend.shutdown().await {
                warn!(error = %e, "failed to shut down replaced client handle");
            }
        }

        Ok(())
    }

    async fn disconnect(&self) {
        let session = self.session.write().await.take();

        if let Some(session) = session {
            if let Err(e) = session.backend.shutdown().await {
                warn!(error = %e, "failed to shut down client handle");
            }
            info!(address = %self.config.address(), "disconnected from CouchDB");
        }
    }

    async fn validate_connection(&self) -> bool {
        let session = self.session.read().await;

        match session.as_ref() {
            Some(session) => match session.backend.info().await {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "connection probe failed");
                    false
                }
            },
            None => false,
        }
    }

    async fn connection_id(&self) -> ConnectorResult<String> {
        let session = self.session.read().await;
        let info = live(&*session)?.info().await?;

        Ok(format!("{}@{}", info.db_name, info.instance_start_time))
    }
}

fn live<C>(session: &Option<Session<C>>) -> ConnectorResult<&C> {
    session
        .as_ref()
        .map(|session| &session.backend)
        .ok_or(ConnectorError::NotConnected)
}

/// Reads the stored revision of `document` into it, leaving it untouched if the document
/// has disappeared in the meantime.
async fn resolve_rev<C: CouchBackend>(backend: &C, document: &mut Document) -> ConnectorResult<()> {
    let Some(id) = document.id() else {
        return Ok(());
    };

    if let Some(rev) = backend.get(id).await?.as_ref().and_then(Document::rev) {
        let rev = rev.to_string();
        document.set_rev(rev);
    }

    Ok(())
}

/// Builds the document `save` writes, before create/update routing.
fn shape_document(content: &str, id: Option<&str>, property_name: &str) -> ConnectorResult<Document> {
    let mut document = if is_json_object(content) {
        let mut document = Document::from_json_str(content)?;
        stringify_id(&mut document)?;
        if document.id().is_some_and(|id| id.trim().is_empty()) {
            document.remove(ID_FIELD);
        }
        document
    } else {
        let mut document = Document::new();
        document.insert(property_name, content);
        document
    };

    if document.id().is_none() {
        if let Some(id) = id {
            document.set_id(id);
        }
    }

    Ok(document)
}

/// Rewrites a numeric or boolean `_id` as its string form, so `42` addresses document `"42"`.
fn stringify_id(document: &mut Document) -> ConnectorResult<()> {
    let id = match document.get(ID_FIELD) {
        None | Some(Value::String(_)) => return Ok(()),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => {
            return Err(ConnectorError::InvalidDocument(format!(
                "{ID_FIELD} must be a scalar, got {other}"
            )));
        }
    };

    document.set_id(id);

    Ok(())
}

fn parse_default(default_value: Option<&str>) -> ConnectorResult<Document> {
    match non_blank(default_value) {
        Some(text) => Document::from_json_str(text),
        None => Ok(Document::new()),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
