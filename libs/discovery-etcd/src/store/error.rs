use std::time::Duration;

use serde::Deserialize;

/// etcd v2 error codes used by this crate.
pub mod codes {
    pub const KEY_NOT_FOUND: u64 = 100;
    pub const NOT_FILE: u64 = 102;
    pub const NOT_DIR: u64 = 104;
}

/// Errors from a keys API client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Error document returned by etcd.
    #[error("{error_code}: {message} ({cause}) [{index}]")]
    Etcd {
        error_code: u64,
        message: String,
        cause: String,
        index: u64,
    },

    /// Non-2xx response whose body is not an etcd error document.
    #[error("unexpected HTTP {status}: {body_preview}")]
    UnexpectedStatus {
        status: http::StatusCode,
        body_preview: String,
    },

    /// A 2xx response body could not be parsed.
    #[error("invalid response body: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// Connection-level failure (refused, reset, DNS, ...).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A single request attempt exceeded the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("no etcd endpoints configured")]
    NoEndpoints,
}

impl StoreError {
    pub(crate) fn key_not_found(key: &str, index: u64) -> Self {
        Self::Etcd {
            error_code: codes::KEY_NOT_FOUND,
            message: "Key not found".to_owned(),
            cause: key.to_owned(),
            index,
        }
    }

    /// True when the queried key does not exist.
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::Etcd { error_code, .. } if *error_code == codes::KEY_NOT_FOUND)
    }

    /// True for failures where another cluster member may still answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Wire form of an etcd error document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EtcdErrorBody {
    pub error_code: u64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub index: u64,
}

impl From<EtcdErrorBody> for StoreError {
    fn from(body: EtcdErrorBody) -> Self {
        Self::Etcd {
            error_code: body.error_code,
            message: body.message,
            cause: body.cause,
            index: body.index,
        }
    }
}
