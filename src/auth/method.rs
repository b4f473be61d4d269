//! Authentication schemes and challenge construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::digest;
use crate::auth::digest::QuoteForDigest;

/// Supported authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Basic,
    Digest,
    /// No wire scheme of its own. Presented Basic or Digest credentials are
    /// still verified and challenges fall back to Basic. Without credentials the
    /// default user applies, and with none configured the request fails with
    /// `NoUsername`.
    Custom,
}

impl AuthMethod {
    /// Scheme token as it appears in `Authorization` and `WWW-Authenticate`.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthMethod::Basic => "Basic",
            AuthMethod::Digest => "Digest",
            AuthMethod::Custom => "Custom",
        }
    }

    /// Resolve a scheme token presented by a client (case-insensitive).
    ///
    /// Only schemes a client can actually present are recognized.
    pub fn from_scheme(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("basic") {
            Some(AuthMethod::Basic)
        } else if token.eq_ignore_ascii_case("digest") {
            Some(AuthMethod::Digest)
        } else {
            None
        }
    }

    /// Build a `WWW-Authenticate` value for this method.
    ///
    /// Digest challenges carry a freshly generated nonce on every call.
    /// Custom has no wire scheme of its own and falls back to Basic.
    pub fn challenge(&self, realm: &str) -> String {
        let realm = realm.quote_for_digest();
        match self {
            AuthMethod::Digest => format!(
                "Digest realm=\"{}\", nonce=\"{}\", qop=\"auth,auth-int\", algorithm=MD5",
                realm,
                digest::generate_nonce()
            ),
            AuthMethod::Basic | AuthMethod::Custom => format!("Basic realm=\"{}\"", realm),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::digest::parse_header_map;

    #[test]
    fn scheme_tokens_are_case_insensitive() {
        assert_eq!(AuthMethod::from_scheme("basic"), Some(AuthMethod::Basic));
        assert_eq!(AuthMethod::from_scheme("DIGEST"), Some(AuthMethod::Digest));
        assert_eq!(AuthMethod::from_scheme("Bearer"), None);
        assert_eq!(AuthMethod::from_scheme("Custom"), None);
    }

    #[test]
    fn basic_challenge_names_realm() {
        assert_eq!(AuthMethod::Basic.challenge("docstore"), "Basic realm=\"docstore\"");
        assert_eq!(AuthMethod::Custom.challenge("docstore"), "Basic realm=\"docstore\"");
    }

    #[test]
    fn digest_challenge_has_fresh_nonce() {
        let first = AuthMethod::Digest.challenge("docstore");
        let second = AuthMethod::Digest.challenge("docstore");
        assert!(first.starts_with("Digest "));

        let a = parse_header_map(&first["Digest ".len()..]).unwrap();
        let b = parse_header_map(&second["Digest ".len()..]).unwrap();
        assert_eq!(a["realm"], "docstore");
        assert_eq!(a["qop"], "auth,auth-int");
        assert_eq!(a["nonce"].len(), 32);
        assert_ne!(a["nonce"], b["nonce"]);
    }
}
