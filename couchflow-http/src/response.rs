//! Mapping of CouchDB HTTP responses onto connector errors.

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use couchflow_core::error::ConnectorError;

/// Error body CouchDB returns with every non-2xx status, e.g.
/// `{"error": "conflict", "reason": "Document update conflict."}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CouchErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub reason: String,
}

impl CouchErrorBody {
    fn detail(&self) -> String {
        match (self.error.is_empty(), self.reason.is_empty()) {
            (true, true) => "no error details".to_string(),
            (false, true) => self.error.clone(),
            (true, false) => self.reason.clone(),
            (false, false) => format!("{}: {}", self.error, self.reason),
        }
    }
}

/// Converts a failed response for `resource` into the matching error variant.
pub(crate) fn status_error(
    status: StatusCode,
    body: &CouchErrorBody,
    resource: &str,
    database: &str,
) -> ConnectorError {
    match status {
        StatusCode::NOT_FOUND => ConnectorError::DocumentNotFound(resource.to_string(), database.to_string()),
        StatusCode::CONFLICT => ConnectorError::Conflict(resource.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::Unauthorized(body.detail()),
        StatusCode::BAD_REQUEST => ConnectorError::InvalidDocument(body.detail()),
        _ => ConnectorError::Backend(format!("{status}: {}", body.detail())),
    }
}

/// Passes successful responses through and turns the rest into errors.
pub(crate) async fn check(response: Response, resource: &str, database: &str) -> Result<Response, ConnectorError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<CouchErrorBody>().await.unwrap_or_default();

    Err(status_error(status, &body, resource, database))
}

/// Wraps transport failures (DNS, TLS, refused connections, timeouts).
pub(crate) fn transport(err: reqwest::Error) -> ConnectorError {
    ConnectorError::Backend(err.to_string())
}
