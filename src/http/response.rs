//! Response state and output sanitizing.
//!
//! # Responsibilities
//! - Record the single status/body pair of a request
//! - Sanitize status messages and diagnostic bodies
//! - Attach `WWW-Authenticate` challenges to 401 responses
//!
//! # Design Decisions
//! - First write wins; later writes are logged and dropped
//! - HTTP/1.1 reason phrases are fixed by the transport, so the message
//!   travels in `X-Status-Message`

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::GateError;

pub const X_STATUS_MESSAGE: &str = "x-status-message";

/// Replace everything outside printable ASCII with `?`.
pub fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

/// Normalize line endings to `\n`; other control characters except tab become `?`.
pub fn normalize_body(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .map(|c| if c.is_control() && c != '\n' && c != '\t' { '?' } else { c })
        .collect()
}

#[derive(Debug, Clone)]
struct Committed {
    status: StatusCode,
    message: Option<String>,
    challenge: Option<String>,
    body: Option<String>,
}

/// Outbound status of one request.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    committed: Option<Committed>,
}

impl ResponseState {
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Commit a status, failing if one was already written.
    pub fn try_status(
        &mut self,
        status: StatusCode,
        message: Option<&str>,
        body: Option<&str>,
    ) -> Result<(), GateError> {
        if self.committed.is_some() {
            return Err(GateError::TransportAlreadyCommitted);
        }
        self.committed = Some(Committed {
            status,
            message: message.map(sanitize_message),
            challenge: None,
            body: body.map(normalize_body),
        });
        Ok(())
    }

    /// Commit a status; a second write is demoted to a log entry.
    ///
    /// Returns whether this call took effect.
    pub fn status(&mut self, status: StatusCode, message: Option<&str>, body: Option<&str>) -> bool {
        match self.try_status(status, message, body) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(status = %status, error = %e, "Dropping late status write");
                false
            }
        }
    }

    /// Commit a 401 carrying the given challenge.
    pub fn unauthorized(&mut self, challenge: String, message: &str) -> bool {
        if !self.status(StatusCode::UNAUTHORIZED, Some(message), Some(message)) {
            return false;
        }
        if let Some(committed) = self.committed.as_mut() {
            committed.challenge = Some(challenge);
        }
        true
    }
}

impl IntoResponse for ResponseState {
    fn into_response(self) -> Response {
        let Some(committed) = self.committed else {
            return StatusCode::OK.into_response();
        };

        let mut response = match committed.body {
            Some(body) => {
                let mut response = Response::new(Body::from(body));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                response
            }
            None => Response::new(Body::empty()),
        };
        *response.status_mut() = committed.status;

        let headers = response.headers_mut();
        if let Some(value) = committed.message.and_then(|m| HeaderValue::from_str(&m).ok()) {
            headers.insert(X_STATUS_MESSAGE, value);
        }
        if let Some(value) = committed.challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_printable_ascii() {
        assert_eq!(sanitize_message("ok"), "ok");
        assert_eq!(sanitize_message("bad\r\nSet-Cookie: x"), "bad??Set-Cookie: x");
        assert_eq!(sanitize_message("größe"), "gr??e");
    }

    #[test]
    fn body_line_endings() {
        assert_eq!(normalize_body("a\r\nb\rc\nd\te\u{7}"), "a\nb\nc\nd\te?");
    }

    #[test]
    fn second_write_is_dropped() {
        let mut state = ResponseState::default();
        assert!(state.status(StatusCode::BAD_REQUEST, Some("first"), None));
        assert!(!state.status(StatusCode::OK, Some("second"), None));
        assert!(matches!(
            state.try_status(StatusCode::OK, None, None),
            Err(GateError::TransportAlreadyCommitted)
        ));

        let response = state.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[X_STATUS_MESSAGE], "first");
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let mut state = ResponseState::default();
        assert!(state.unauthorized("Basic realm=\"docstore\"".into(), "access denied"));

        let response = state.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"docstore\"");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn uncommitted_state_is_ok() {
        assert_eq!(ResponseState::default().into_response().status(), StatusCode::OK);
    }
}
