use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use couchflow_core::{
    backend::{BackendBuilder, CouchBackend, DatabaseInfo},
    config::{ConnectionConfig, Credentials},
    document::{Document, DocumentResponse, ID_FIELD, REV_FIELD},
    error::{ConnectorError, ConnectorResult},
    view::{ViewName, ViewQuery, ViewRow},
};

use crate::{
    query::{database_url, document_url, revision_url, view_url},
    response::{check, transport},
};

#[derive(Debug, Deserialize)]
struct ViewResponse {
    rows: Vec<ViewRow>,
}

/// CouchDB client bound to one database.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    database: String,
    database_url: Url,
    credentials: Option<Credentials>,
}

impl HttpStore {
    pub fn new(client: Client, config: &ConnectionConfig, credentials: Option<Credentials>) -> ConnectorResult<Self> {
        Ok(Self {
            client,
            database: config.database.clone(),
            database_url: database_url(config)?,
            credentials,
        })
    }

    pub fn builder() -> HttpStoreBuilder {
        HttpStoreBuilder::default()
    }

    pub fn database_url(&self) -> &Url {
        &self.database_url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "couchdb request");

        let request = self.client.request(method, url);

        match &self.credentials {
            Some(credentials) => request.basic_auth(&credentials.username, credentials.password.as_deref()),
            None => request,
        }
    }

    /// Creates the bound database if it does not exist and `auto_create` allows it.
    async fn ensure_database(&self, auto_create: bool) -> ConnectorResult<()> {
        let response = self
            .request(Method::HEAD, self.database_url.clone())
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND if auto_create => {
                debug!(database = %self.database, "creating database");

                let response = self
                    .request(Method::PUT, self.database_url.clone())
                    .send()
                    .await
                    .map_err(transport)?;

                // 412 means someone else created it first.
                if response.status() == StatusCode::PRECONDITION_FAILED {
                    return Ok(());
                }

                check(response, &self.database, &self.database).await?;

                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ConnectorError::Backend(format!(
                "database {} does not exist",
                self.database
            ))),
            _ => {
                check(response, &self.database, &self.database).await?;

                Ok(())
            }
        }
    }

    async fn put(&self, document: Document) -> ConnectorResult<DocumentResponse> {
        let id = document
            .id()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::InvalidDocument(format!("document has no {ID_FIELD}")))?;

        let response = self
            .request(Method::PUT, document_url(&self.database_url, &id)?)
            .json(&document)
            .send()
            .await
            .map_err(transport)?;

        Ok(check(response, &id, &self.database)
            .await?
            .json::<DocumentResponse>()
            .await
            .map_err(transport)?)
    }
}

#[async_trait]
impl CouchBackend for HttpStore {
    async fn info(&self) -> ConnectorResult<DatabaseInfo> {
        let response = self
            .request(Method::GET, self.database_url.clone())
            .send()
            .await
            .map_err(transport)?;

        check(response, &self.database, &self.database)
            .await?
            .json::<DatabaseInfo>()
            .await
            .map_err(transport)
    }

    async fn contains(&self, id: &str) -> ConnectorResult<bool> {
        let response = self
            .request(Method::HEAD, document_url(&self.database_url, id)?)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        check(response, id, &self.database).await?;

        Ok(true)
    }

    async fn get(&self, id: &str) -> ConnectorResult<Option<Document>> {
        let response = self
            .request(Method::GET, document_url(&self.database_url, id)?)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(
            check(response, id, &self.database)
                .await?
                .json::<Document>()
                .await
                .map_err(transport)?,
        ))
    }

    async fn create(&self, document: Document) -> ConnectorResult<DocumentResponse> {
        if let Some(id) = document.id().filter(|_| document.rev().is_some()) {
            return Err(ConnectorError::Conflict(id.to_string()));
        }

        self.put(document).await
    }

    async fn update(&self, document: Document) -> ConnectorResult<DocumentResponse> {
        if document.rev().is_none() {
            return Err(ConnectorError::Conflict(format!(
                "{} has no {REV_FIELD}",
                document.id().unwrap_or_default()
            )));
        }

        self.put(document).await
    }

    async fn delete(&self, id: &str, rev: &str) -> ConnectorResult<DocumentResponse> {
        let response = self
            .request(Method::DELETE, revision_url(&self.database_url, id, rev)?)
            .send()
            .await
            .map_err(transport)?;

        check(response, id, &self.database)
            .await?
            .json::<DocumentResponse>()
            .await
            .map_err(transport)
    }

    async fn query_view(&self, view: &ViewName, query: ViewQuery) -> ConnectorResult<Vec<ViewRow>> {
        let response = self
            .request(Method::GET, view_url(&self.database_url, view, &query)?)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConnectorError::InvalidView(format!("view {view} is not defined")));
        }

        Ok(check(response, &view.to_string(), &self.database)
            .await?
            .json::<ViewResponse>()
            .await
            .map_err(transport)?
            .rows)
    }
}

/// Builder for [`HttpStore`].
///
/// A client is built from the connection configuration on every `connect` unless one is
/// supplied with [`with_client`](HttpStoreBuilder::with_client), in which case it is shared.
#[derive(Debug, Clone, Default)]
pub struct HttpStoreBuilder {
    client: Option<Client>,
}

impl HttpStoreBuilder {
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    fn client(&self, config: &ConnectionConfig) -> ConnectorResult<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| ConnectorError::Connection(e.to_string()))
    }
}

#[async_trait]
impl BackendBuilder for HttpStoreBuilder {
    type Backend = HttpStore;

    async fn build(
        &self,
        config: &ConnectionConfig,
        credentials: Option<&Credentials>,
    ) -> ConnectorResult<Self::Backend> {
        let store = HttpStore::new(self.client(config)?, config, credentials.cloned())?;
        store.ensure_database(config.auto_create).await?;

        Ok(store)
    }
}
