//! A thin CouchDB connector exposing document operations as flow processors.
//!
//! This crate is the core of the couchflow project and provides:
//!
//! - **Documents** ([`document`]) - JSON documents with `_id`/`_rev` conventions
//! - **Client abstraction** ([`backend`]) - Traits a CouchDB client implements
//! - **Views** ([`view`]) - View addressing and key-constrained view queries
//! - **Connector** ([`connector`]) - Lifecycle hooks and the save/find/list/remove processors
//! - **Processor dispatch** ([`processor`]) - Processor invocations as configuration data
//! - **Configuration** ([`config`]) - Connection settings and credentials
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use couchflow::prelude::*;
//!
//! let connector = CouchConnector::new(ConnectionConfig::default(), builder);
//! connector.connect(Some(Credentials::new("admin", "secret"))).await?;
//!
//! let id = connector.save(Some(r#"{"status": "new"}"#), Some("order-1"), None).await?;
//! let order = connector.find_by_id(&id, None).await?;
//! connector.remove(&order, None).await?;
//!
//! connector.disconnect().await;
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchflow_core;

pub mod backend;
pub mod config;
pub mod connector;
pub mod document;
pub mod error;
pub mod processor;
pub mod view;
