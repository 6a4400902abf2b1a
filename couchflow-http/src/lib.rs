//! CouchDB HTTP backend for couchflow.
//!
//! This crate implements the `CouchBackend` trait over CouchDB's REST API using
//! `reqwest`. Each backend call is exactly one HTTP request; nothing is cached or retried.
//!
//! To use this backend, include the `http` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! couchflow = { version = "x.y.z", features = ["http"] }
//! ```
//!
//! # Endpoints
//!
//! | operation      | request                                   |
//! |----------------|-------------------------------------------|
//! | `info`         | `GET /{db}`                               |
//! | `contains`     | `HEAD /{db}/{id}`                         |
//! | `get`          | `GET /{db}/{id}`                          |
//! | `create`       | `PUT /{db}/{id}`                          |
//! | `update`       | `PUT /{db}/{id}` with `_rev` in the body  |
//! | `delete`       | `DELETE /{db}/{id}?rev={rev}`             |
//! | `query_view`   | `GET /{db}/_design/{d}/_view/{v}` or `GET /{db}/_all_docs` |
//!
//! Connecting issues `HEAD /{db}` and, with `auto_create`, `PUT /{db}`.
//!
//! # Example
//!
//! ```ignore
//! use couchflow::{prelude::*, http::HttpStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::default().with_database("orders");
//!     let connector = CouchConnector::new(config, HttpStoreBuilder::default());
//!
//!     connector.connect(Some(Credentials::new("admin", "secret"))).await?;
//!     let id = connector.save(Some("hello"), None, None).await?;
//!     connector.disconnect().await;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchflow_http;

pub mod store;
mod query;
mod response;

pub use store::{HttpStore, HttpStoreBuilder};
