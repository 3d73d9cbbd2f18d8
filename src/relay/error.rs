//! Relay error taxonomy.
//!
//! Every variant maps to a response status; none of them may take the process
//! down. Failures stay contained to the request or session that raised them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::metadata::MetadataError;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Bad or missing target encoding on the inbound request.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The upstream target could not be reached.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The upstream target did not answer within the configured deadline.
    #[error("upstream timed out")]
    UpstreamTimeout,

    /// The upstream answered with something the relay could not carry.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Unexpected condition inside the relay itself.
    #[error("internal relay fault: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Metadata(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "relay request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "relay request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
