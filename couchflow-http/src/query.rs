//! Translation of connector addresses into CouchDB request URLs.
//!
//! Path segments are pushed through [`Url::path_segments_mut`] so identifiers and database
//! names containing `/` or spaces are percent-encoded. View keys are JSON-encoded
//! query parameters, as CouchDB expects.

use reqwest::Url;

use couchflow_core::{
    config::ConnectionConfig,
    error::{ConnectorError, ConnectorResult},
    view::{ViewName, ViewQuery},
};

/// Returns the URL of the configured database, e.g. `http://localhost:5984/test`.
pub(crate) fn database_url(config: &ConnectionConfig) -> ConnectorResult<Url> {
    let mut url = Url::parse(&config.base_url())
        .map_err(|e| ConnectorError::InvalidConfig(format!("{}: {e}", config.base_url())))?;
    push_segments(&mut url, [config.database.as_str()])?;

    Ok(url)
}

/// Returns the URL of a document inside the database.
///
/// An empty identifier is rejected, since `/{db}/` would address the database itself.
pub(crate) fn document_url(database: &Url, id: &str) -> ConnectorResult<Url> {
    if id.is_empty() {
        return Err(ConnectorError::InvalidDocument("document identifier is empty".into()));
    }

    let mut url = database.clone();
    push_segments(&mut url, [id])?;

    Ok(url)
}

/// Returns the URL of a document deletion at revision `rev`.
pub(crate) fn revision_url(database: &Url, id: &str, rev: &str) -> ConnectorResult<Url> {
    let mut url = document_url(database, id)?;
    url.query_pairs_mut().append_pair("rev", rev);

    Ok(url)
}

/// Returns the URL running `query` against `view`.
pub(crate) fn view_url(database: &Url, view: &ViewName, query: &ViewQuery) -> ConnectorResult<Url> {
    let mut url = database.clone();

    match view {
        ViewName::AllDocs => push_segments(&mut url, ["_all_docs"])?,
        ViewName::Design { design, view } => {
            push_segments(&mut url, ["_design", design.as_str(), "_view", view.as_str()])?
        }
    }

    {
        let mut pairs = url.query_pairs_mut();

        if let Some(key) = &query.key {
            pairs.append_pair("key", &serde_json::to_string(key)?);
        }
        if let Some(start_key) = &query.start_key {
            pairs.append_pair("startkey", &serde_json::to_string(start_key)?);
        }
        if let Some(end_key) = &query.end_key {
            pairs.append_pair("endkey", &serde_json::to_string(end_key)?);
        }
        if let Some(limit) = query.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
        if query.include_docs {
            pairs.append_pair("include_docs", "true");
        }
    }

    // An empty pair list still leaves a dangling `?`.
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

fn push_segments<'a>(url: &mut Url, segments: impl IntoIterator<Item = &'a str>) -> ConnectorResult<()> {
    url.path_segments_mut()
        .map_err(|_| ConnectorError::InvalidConfig("base URL cannot carry a path".into()))?
        .pop_if_empty()
        .extend(segments);

    Ok(())
}
