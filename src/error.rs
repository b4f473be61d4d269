//! Error types shared across the gate.
//!
//! Everything that can go wrong while handling a request is resolved to a
//! status/body pair here, so downstream handlers only ever see an
//! authenticated context.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::ResponseState;

/// Reasons an authentication attempt is rejected.
///
/// Every variant surfaces as `401 Unauthorized` with a fresh challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no username specified")]
    NoUsername,
    #[error("unknown user")]
    UnknownUser,
    #[error("access denied")]
    BadCredentials,
    #[error("wrong authentication method")]
    WrongAuthMethod,
    #[error("malformed digest header")]
    MalformedDigestHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
}

impl AuthFailure {
    /// Short label used for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            AuthFailure::NoUsername => "no_username",
            AuthFailure::UnknownUser => "unknown_user",
            AuthFailure::BadCredentials => "bad_credentials",
            AuthFailure::WrongAuthMethod => "wrong_auth_method",
            AuthFailure::MalformedDigestHeader => "malformed_digest",
            AuthFailure::MalformedHeader => "malformed_header",
        }
    }
}

/// Request-level failures raised before a downstream handler runs.
#[derive(Debug, Error)]
pub enum GateError {
    /// The body stream could not be read (oversized payload, broken transport).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// A status was written after the response had already been committed.
    #[error("response already committed")]
    TransportAlreadyCommitted,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GateError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            GateError::TransportAlreadyCommitted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcome of a failed authentication attempt.
///
/// Credential problems earn a challenge and a blocker delay. Request
/// problems met while verifying (an unreadable `auth-int` body) are answered
/// with their own status and are not charged to the client.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Request(#[from] GateError),
}

impl Rejection {
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            Rejection::Auth(failure) => Some(*failure),
            Rejection::Request(_) => None,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let mut state = ResponseState::default();
        state.status(self.status(), None, Some(&self.to_string()));
        state.into_response()
    }
}
