//! HTTP Basic credentials (RFC 7617).
//!
//! ```text
//! Authorization: Basic <base64(username:password)>
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::AuthFailure;

/// Encode a user/password pair into a Basic payload (without the scheme token).
pub fn encode(user: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", user, password))
}

/// Decode a Basic payload into `(user, password)`.
///
/// The split happens on the first colon, so passwords may contain colons.
pub fn decode(payload: &str) -> Result<(String, String), AuthFailure> {
    let raw = STANDARD
        .decode(payload.trim())
        .map_err(|_| AuthFailure::MalformedHeader)?;
    let text = String::from_utf8(raw).map_err(|_| AuthFailure::MalformedHeader)?;

    match text.split_once(':') {
        Some((user, password)) => Ok((user.to_string(), password.to_string())),
        None => Err(AuthFailure::NoUsername),
    }
}
