use std::time::Duration;

use reqwest::StatusCode;

/// Network-level failure talking to the tracker API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {reason}")]
    Client { reason: String },

    #[error("request to {path} timed out")]
    Timeout { path: String },

    #[error("HTTP request to {path} failed: {reason}")]
    Network { path: String, reason: String },
}

/// Terminal outcome of a failed refresh cycle. Every request queued on the
/// cycle receives a clone of the same value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("credential refresh rejected with HTTP {status}")]
    Rejected { status: StatusCode },

    #[error("credential refresh request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("credential refresh response is unusable: {reason}")]
    MalformedResponse { reason: String },

    #[error("credential refresh did not settle within {after:?}")]
    TimedOut { after: Duration },

    #[error("credential refresh ended without an outcome")]
    Abandoned,
}

/// Error returned by [`RequestDispatcher::send`](crate::RequestDispatcher::send).
///
/// A 401 that survives a retry is not an error here: it comes back as a
/// regular response with [`Response::is_exhausted_retry`](crate::Response::is_exhausted_retry) set.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session expired: {0}")]
    RefreshFailed(#[from] RefreshError),
}

/// Errors from the typed auth endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{path} answered HTTP {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode {path} response: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether the failure means the user has to log in again.
    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::Dispatch(DispatchError::RefreshFailed(_)) => true,
            Self::Status { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}
