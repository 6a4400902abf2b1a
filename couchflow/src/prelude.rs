//! Convenient re-exports of commonly used types from couchflow.
//!
//! ```ignore
//! use couchflow::prelude::*;
//! ```

pub use couchflow_core::{
    backend::{BackendBuilder, CouchBackend, DatabaseInfo},
    config::{ConnectionConfig, Credentials},
    connector::{Connector, CouchConnector},
    document::{Document, DocumentResponse},
    error::{ConnectorError, ConnectorResult},
    processor::Processor,
    view::{ViewName, ViewQuery, ViewRow},
};
