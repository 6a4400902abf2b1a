//! In-memory CouchDB backend for couchflow.
//!
//! This crate provides a thread-safe, in-process implementation of the `CouchBackend`
//! trait. It keeps CouchDB's observable document semantics (revisions, update conflicts,
//! view key collation) without a server, which makes it suitable for development and
//! for testing flows.
//!
//! # Features
//!
//! - **Revision checks** - Updates and deletes must carry the current `_rev`
//! - **Shared server** - Stores built by one builder see the same databases
//! - **Field views** - Views that emit document members as keys, queried by key or range
//! - **Authentication** - Optional user check on connect
//!
//! # Quick Start
//!
//! ```ignore
//! use couchflow::{prelude::*, memory::{FieldView, InMemoryStoreBuilder}};
//!
//! let builder = InMemoryStoreBuilder::default()
//!     .with_view("orders/by_customer".parse()?, FieldView::new("customer"));
//!
//! let connector = CouchConnector::new(ConnectionConfig::default(), builder);
//! connector.connect(None).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchflow_memory;

pub mod store;
mod collate;

pub use store::{FieldView, InMemoryStoreBuilder, InMemoryStore};
