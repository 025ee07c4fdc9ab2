//! Failures of the CouchDB room store.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for the CouchDB room store.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failure talking to CouchDB, mapped to a storage error at the trait boundary.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The HTTP client could not be configured.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer.
    #[error("CouchDB request to `{path}` failed")]
    Transport {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with a status the room store does not handle.
    #[error("unexpected CouchDB status {status} for `{path}`")]
    UnexpectedStatus {
        /// Request path relative to the server.
        path: String,
        /// Status CouchDB answered with.
        status: StatusCode,
    },
    /// The response body was not the JSON the store expected.
    #[error("failed to decode CouchDB response for `{path}`")]
    Decode {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A `_find` row did not match the room document layout.
    #[error("malformed CouchDB document returned for `{path}`")]
    MalformedDocument {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A write succeeded but CouchDB did not report the new revision.
    #[error("CouchDB did not return a revision for `{path}`")]
    MissingRevision {
        /// Request path relative to the server.
        path: String,
    },
}
