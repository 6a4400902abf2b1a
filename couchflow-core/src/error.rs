//! Error types and result types for connector operations.
//!
//! Every processor and backend call returns [`ConnectorResult<T>`]. Failures coming from
//! the store are surfaced as-is; nothing in this crate retries or recovers.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to CouchDB through the connector.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Serialization/deserialization error when converting between JSON text and documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The client handle could not be established.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A processor was invoked before `connect` or after `disconnect`.
    #[error("Not connected")]
    NotConnected,
    /// A required input was absent. The argument names the missing input.
    #[error("Missing required input: {0}")]
    MissingInput(String),
    /// The content does not describe a valid document (e.g. JSON that is not an object).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A view name could not be parsed into a design document and view pair.
    #[error("Invalid view: {0}")]
    InvalidView(String),
    /// The connection configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The requested document was not found.
    /// The first argument is the document ID, the second is the database name.
    #[error("Document {0} not found in database {1}")]
    DocumentNotFound(String, String),
    /// The revision supplied for a write is not the current one, or the ID is already taken.
    #[error("Document update conflict: {0}")]
    Conflict(String),
    /// The server rejected the supplied credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// An error occurred in the underlying client or store.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl From<SerdeJsonError> for ConnectorError {
    fn from(err: SerdeJsonError) -> Self {
        ConnectorError::Serialization(err.to_string())
    }
}
