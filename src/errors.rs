//! Error types for quakemap.
//!
//! Uses `thiserror` for library-style error definitions.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message shown in the sidebar banner when a load fails.
pub const LOAD_FAILED_MESSAGE: &str = "Could not load earthquakes";

/// Errors that can occur while loading a feed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Feed answered with a non-success status
    #[error("feed error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// Body was not valid JSON for a feature collection
    #[error("failed to parse feed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Body parsed but is not a feature collection
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Source abandoned the load; never shown to the user. Reported by
    /// `FeedSource` implementations, not by `FeedClient`, whose superseded
    /// loads are aborted outright.
    #[error("load cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this error is a superseded request rather than a real failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Rejected control input from the sidebar.
#[derive(Error, Debug, PartialEq)]
pub enum ControlError {
    #[error("unknown time range: {0}")]
    UnknownRange(String),

    #[error("invalid magnitude: {0}")]
    InvalidMagnitude(String),
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
