//! In-memory CouchDB backend.
//!
//! Databases live in a map shared by every store a builder hands out, so data survives a
//! disconnect/connect cycle the way it would on a real server. Revisions follow CouchDB's
//! `{generation}-{hash}` shape and are checked on every update and delete.

use async_trait::async_trait;
use chrono::Utc;
use mea::rwlock::RwLock;
use serde_json::{Value, json};
use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use couchflow_core::{
    backend::{BackendBuilder, CouchBackend, DatabaseInfo},
    config::{ConnectionConfig, Credentials},
    document::{Document, DocumentResponse},
    error::{ConnectorError, ConnectorResult},
    view::{ViewName, ViewQuery, ViewRow},
};

use crate::collate::collate;

type ServerMap = HashMap<String, Database>;

/// A view that emits one or more document members as its key.
///
/// Documents missing any key member are not emitted. The row value is the `value` member
/// when one is configured and `null` otherwise.
///
/// # Example
///
/// ```ignore
/// use couchflow_memory::FieldView;
///
/// // emit(doc.customer, doc.total)
/// let by_customer = FieldView::new("customer").with_value("total");
///
/// // emit([doc.customer, doc.created], null)
/// let by_customer_and_date = FieldView::compound(["customer", "created"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    key_fields: Vec<String>,
    compound: bool,
    value_field: Option<String>,
}

impl FieldView {
    /// Emits the given member as a scalar key.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            key_fields: vec![field.into()],
            compound: false,
            value_field: None,
        }
    }

    /// Emits the given members as an array key.
    pub fn compound<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_fields: fields.into_iter().map(Into::into).collect(),
            compound: true,
            value_field: None,
        }
    }

    /// Emits the given member as the row value.
    pub fn with_value(mut self, field: impl Into<String>) -> Self {
        self.value_field = Some(field.into());
        self
    }

    fn emit(&self, document: &Document) -> Option<(Value, Value)> {
        let mut keys = self
            .key_fields
            .iter()
            .map(|field| document.get(field).cloned())
            .collect::<Option<Vec<_>>>()?;

        let key = if self.compound || keys.len() != 1 {
            Value::Array(keys)
        } else {
            keys.remove(0)
        };

        let value = self
            .value_field
            .as_deref()
            .and_then(|field| document.get(field))
            .cloned()
            .unwrap_or(Value::Null);

        Some((key, value))
    }
}

#[derive(Debug, Default)]
struct Database {
    /// document_id -> current revision of the document
    documents: BTreeMap<String, Document>,
    views: HashMap<ViewName, FieldView>,
    update_seq: u64,
}

impl Database {
    fn rows(&self, view: &ViewName) -> ConnectorResult<Vec<ViewRow>> {
        match view {
            ViewName::AllDocs => Ok(self
                .documents
                .iter()
                .map(|(id, document)| ViewRow {
                    id: Some(id.clone()),
                    key: Value::String(id.clone()),
                    value: json!({ "rev": document.rev() }),
                    doc: Some(document.clone()),
                })
                .collect()),
            ViewName::Design { .. } => {
                let definition = self
                    .views
                    .get(view)
                    .ok_or_else(|| ConnectorError::InvalidView(format!("view {view} is not defined")))?;

                Ok(self
                    .documents
                    .iter()
                    .filter_map(|(id, document)| {
                        definition.emit(document).map(|(key, value)| ViewRow {
                            id: Some(id.clone()),
                            key,
                            value,
                            doc: Some(document.clone()),
                        })
                    })
                    .collect())
            }
        }
    }

    /// Checks that `rev` is the current revision of `id` and returns the next one.
    fn advance(&self, id: &str, rev: Option<&str>, database: &str) -> ConnectorResult<String> {
        let current = self
            .documents
            .get(id)
            .ok_or_else(|| ConnectorError::DocumentNotFound(id.to_string(), database.to_string()))?
            .rev();

        if rev.is_none() || rev != current {
            return Err(ConnectorError::Conflict(id.to_string()));
        }

        Ok(next_rev(current))
    }
}

fn next_rev(current: Option<&str>) -> String {
    let generation = current
        .and_then(|rev| rev.split_once('-'))
        .and_then(|(generation, _)| generation.parse::<u64>().ok())
        .unwrap_or(0);

    format!("{}-{}", generation + 1, Uuid::new_v4().simple())
}

/// Thread-safe in-memory backend bound to one database.
///
/// Clones share the same underlying server, so a store can be handed to several tasks.
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    database: String,
    server: Arc<RwLock<ServerMap>>,
    instance_start_time: String,
}

impl InMemoryStore {
    /// Creates a store with a fresh server holding an empty `database`.
    pub fn new(database: &str) -> Self {
        let server = ServerMap::from([(database.to_string(), Database::default())]);

        Self {
            database: database.to_string(),
            server: Arc::new(RwLock::new(server)),
            instance_start_time: instance_start_time(),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Defines (or redefines) a view on the bound database.
    pub async fn define_view(&self, view: ViewName, definition: FieldView) -> ConnectorResult<()> {
        let mut server = self.server.write().await;
        self.database_mut(&mut server)?
            .views
            .insert(view, definition);

        Ok(())
    }

    fn missing_database(&self) -> ConnectorError {
        ConnectorError::Backend(format!("database {} does not exist", self.database))
    }

    fn database_ref<'a>(&self, server: &'a ServerMap) -> ConnectorResult<&'a Database> {
        server
            .get(&self.database)
            .ok_or_else(|| self.missing_database())
    }

    fn database_mut<'a>(&self, server: &'a mut ServerMap) -> ConnectorResult<&'a mut Database> {
        server
            .get_mut(&self.database)
            .ok_or_else(|| self.missing_database())
    }
}

#[async_trait]
impl CouchBackend for InMemoryStore {
    async fn info(&self) -> ConnectorResult<DatabaseInfo> {
        let server = self.server.read().await;
        let database = self.database_ref(&server)?;

        Ok(DatabaseInfo {
            db_name: self.database.clone(),
            doc_count: database.documents.len() as u64,
            update_seq: json!(database.update_seq),
            instance_start_time: self.instance_start_time.clone(),
        })
    }

    async fn contains(&self, id: &str) -> ConnectorResult<bool> {
        let server = self.server.read().await;

        Ok(self
            .database_ref(&server)?
            .documents
            .contains_key(id))
    }

    async fn get(&self, id: &str) -> ConnectorResult<Option<Document>> {
        let server = self.server.read().await;

        Ok(self
            .database_ref(&server)?
            .documents
            .get(id)
            .cloned())
    }

    async fn create(&self, mut document: Document) -> ConnectorResult<DocumentResponse> {
        let id = document
            .id()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::InvalidDocument("document has no _id".into()))?;

        let mut server = self.server.write().await;
        let database = self.database_mut(&mut server)?;

        // A revision on a new document means the caller expected an existing one.
        if database.documents.contains_key(&id) || document.rev().is_some() {
            return Err(ConnectorError::Conflict(id));
        }

        let rev = next_rev(None);
        document.set_rev(rev.clone());
        database.documents.insert(id.clone(), document);
        database.update_seq += 1;

        debug!(id = %id, rev = %rev, "created document");

        Ok(DocumentResponse { id, rev })
    }

    async fn update(&self, mut document: Document) -> ConnectorResult<DocumentResponse> {
        let id = document
            .id()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::InvalidDocument("document has no _id".into()))?;

        let mut server = self.server.write().await;
        let database = self.database_mut(&mut server)?;

        let rev = database.advance(&id, document.rev(), &self.database)?;
        document.set_rev(rev.clone());
        database.documents.insert(id.clone(), document);
        database.update_seq += 1;

        debug!(id = %id, rev = %rev, "updated document");

        Ok(DocumentResponse { id, rev })
    }

    async fn delete(&self, id: &str, rev: &str) -> ConnectorResult<DocumentResponse> {
        let mut server = self.server.write().await;
        let database = self.database_mut(&mut server)?;

        let rev = database.advance(id, Some(rev), &self.database)?;
        database.documents.remove(id);
        database.update_seq += 1;

        debug!(id, rev = %rev, "deleted document");

        Ok(DocumentResponse {
            id: id.to_string(),
            rev,
        })
    }

    async fn query_view(&self, view: &ViewName, query: ViewQuery) -> ConnectorResult<Vec<ViewRow>> {
        let server = self.server.read().await;
        let mut rows = self.database_ref(&server)?.rows(view)?;

        rows.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));

        Ok(rows
            .into_iter()
            .filter(|row| query.key.as_ref().is_none_or(|key| collate(&row.key, key).is_eq()))
            .filter(|row| query.start_key.as_ref().is_none_or(|start| collate(&row.key, start).is_ge()))
            .filter(|row| query.end_key.as_ref().is_none_or(|end| collate(&row.key, end).is_le()))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|mut row| {
                if !query.include_docs {
                    row.doc = None;
                }
                row
            })
            .collect())
    }
}

/// Builder handing out [`InMemoryStore`]s that share one server.
///
/// Views registered with [`with_view`](InMemoryStoreBuilder::with_view) are installed into
/// every database the builder opens. Setting a user makes `build` reject any other
/// credentials, which mimics a server with authentication enabled.
#[derive(Clone, Debug)]
pub struct InMemoryStoreBuilder {
    server: Arc<RwLock<ServerMap>>,
    views: Vec<(ViewName, FieldView)>,
    user: Option<Credentials>,
    instance_start_time: String,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            server: Arc::new(RwLock::new(ServerMap::new())),
            views: Vec::new(),
            user: None,
            instance_start_time: instance_start_time(),
        }
    }
}

impl InMemoryStoreBuilder {
    pub fn with_view(mut self, view: ViewName, definition: FieldView) -> Self {
        self.views.push((view, definition));
        self
    }

    pub fn with_user(mut self, credentials: Credentials) -> Self {
        self.user = Some(credentials);
        self
    }

    /// Creates an empty database on the shared server if it does not exist yet.
    pub async fn create_database(&self, name: &str) {
        self.server
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }
}

#[async_trait]
impl BackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(
        &self,
        config: &ConnectionConfig,
        credentials: Option<&Credentials>,
    ) -> ConnectorResult<Self::Backend> {
        if let Some(expected) = &self.user {
            if credentials != Some(expected) {
                return Err(ConnectorError::Unauthorized(
                    "name or password is incorrect".into(),
                ));
            }
        }

        let mut server = self.server.write().await;
        let database = match server.entry(config.database.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) if config.auto_create => {
                debug!(database = %config.database, "creating database");
                entry.insert(Database::default())
            }
            Entry::Vacant(_) => {
                return Err(ConnectorError::Backend(format!(
                    "database {} does not exist",
                    config.database
                )));
            }
        };

        for (view, definition) in &self.views {
            database
                .views
                .entry(view.clone())
                .or_insert_with(|| definition.clone());
        }

        Ok(InMemoryStore {
            database: config.database.clone(),
            server: Arc::clone(&self.server),
            instance_start_time: self.instance_start_time.clone(),
        })
    }
}

fn instance_start_time() -> String {
    Utc::now().timestamp_micros().to_string()
}
