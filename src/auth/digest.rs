//! HTTP Digest authentication (RFC 2617).
//!
//! Header parsing, response computation and nonce generation. The same
//! routines back the server-side check and `gate-cli`, so both sides
//! hash exactly the same input.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};
use rand::Rng;

use crate::error::AuthFailure;

/// Hex-encoded MD5 of a byte string.
pub fn md5_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(bytes.as_ref()))
}

/// `HA1 = MD5(user:realm:password)`.
pub fn ha1(user: &str, realm: &str, password: &str) -> String {
    md5_hex(format!("{}:{}:{}", user, realm, password))
}

/// Fresh server nonce: MD5 over the nanosecond clock and a random salt.
pub fn generate_nonce() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let salt: u64 = rand::thread_rng().gen();
    md5_hex(format!("{}:{:016x}", nanos, salt))
}

/// Random client nonce, used by `gate-cli`.
pub fn generate_cnonce() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Backslash-escape a value for use inside a quoted digest parameter.
pub trait QuoteForDigest {
    fn quote_for_digest(&self) -> String;
}

impl QuoteForDigest for str {
    fn quote_for_digest(&self) -> String {
        self.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

/// Digest algorithms accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Md5,
    Md5Sess,
}

impl FromStr for Algorithm {
    type Err = AuthFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MD5" => Ok(Algorithm::Md5),
            "MD5-sess" => Ok(Algorithm::Md5Sess),
            _ => Err(AuthFailure::WrongAuthMethod),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
        })
    }
}

/// Quality-of-protection values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    Auth,
    AuthInt,
}

impl FromStr for Qop {
    type Err = AuthFailure;

    /// Parse from "auth" or "auth-int" as used in HTTP headers
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(Qop::Auth),
            "auth-int" => Ok(Qop::AuthInt),
            _ => Err(AuthFailure::MalformedDigestHeader),
        }
    }
}

impl Display for Qop {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        })
    }
}

/// Split a comma separated `key=value` / `key="quoted value"` list.
pub fn parse_header_map(input: &str) -> Result<HashMap<String, String>, AuthFailure> {
    #[derive(Debug, Clone, Copy)]
    enum State {
        White,
        Name(usize),
        ValueBegin,
        ValueQuoted,
        ValueQuotedNextLiteral,
        ValuePlain,
    }

    let mut state = State::White;
    let mut parsed = HashMap::new();
    let mut current_token = String::new();
    let mut current_value = String::new();

    for (pos, c) in input.char_indices() {
        match state {
            State::White => {
                if c.is_alphabetic() {
                    state = State::Name(pos);
                }
            }
            State::Name(start) => {
                if c == '=' {
                    current_token = input[start..pos].trim().to_string();
                    state = State::ValueBegin;
                }
            }
            State::ValueBegin => {
                current_value.clear();
                state = match c {
                    '"' => State::ValueQuoted,
                    _ => {
                        current_value.push(c);
                        State::ValuePlain
                    }
                };
            }
            State::ValueQuoted => match c {
                '"' => {
                    parsed.insert(std::mem::take(&mut current_token), std::mem::take(&mut current_value));
                    state = State::White;
                }
                '\\' => state = State::ValueQuotedNextLiteral,
                _ => current_value.push(c),
            },
            State::ValueQuotedNextLiteral => {
                current_value.push(c);
                state = State::ValueQuoted;
            }
            State::ValuePlain => {
                if c == ',' || c.is_ascii_whitespace() {
                    parsed.insert(std::mem::take(&mut current_token), std::mem::take(&mut current_value));
                    state = State::White;
                } else {
                    current_value.push(c);
                }
            }
        }
    }

    match state {
        State::ValuePlain => {
            parsed.insert(current_token, current_value);
        }
        State::White => {}
        _ => return Err(AuthFailure::MalformedDigestHeader),
    }

    Ok(parsed)
}

/// Fields of a client's `Authorization: Digest ...` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestParams {
    pub username: Option<String>,
    pub realm: Option<String>,
    pub nonce: Option<String>,
    pub cnonce: Option<String>,
    pub nc: Option<String>,
    pub qop: Option<String>,
    pub response: Option<String>,
    pub uri: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestParams {
    /// Parse the part of the header following the `Digest` token.
    pub fn parse(input: &str) -> Result<Self, AuthFailure> {
        let mut map = parse_header_map(input)?;
        Ok(Self {
            username: map.remove("username"),
            realm: map.remove("realm"),
            nonce: map.remove("nonce"),
            cnonce: map.remove("cnonce"),
            nc: map.remove("nc"),
            qop: map.remove("qop"),
            response: map.remove("response"),
            uri: map.remove("uri"),
            algorithm: map.remove("algorithm"),
        })
    }
}

/// Server challenge as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Vec<Qop>,
    pub algorithm: Algorithm,
}

impl Challenge {
    /// Parse a full `WWW-Authenticate` value. Returns `None` for non-digest challenges.
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, rest) = header.trim().split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }
        let map = parse_header_map(rest).ok()?;
        let qop = map
            .get("qop")
            .map(|list| list.split(',').filter_map(|q| q.trim().parse().ok()).collect())
            .unwrap_or_default();
        let algorithm = match map.get("algorithm") {
            Some(a) => a.parse().ok()?,
            None => Algorithm::Md5,
        };
        Some(Self {
            realm: map.get("realm")?.clone(),
            nonce: map.get("nonce")?.clone(),
            qop,
            algorithm,
        })
    }
}

/// Inputs to the digest `response` hash.
#[derive(Debug, Clone, Copy)]
pub struct DigestResponse<'a> {
    /// Stored `MD5(user:realm:password)`.
    pub ha1: &'a str,
    pub algorithm: Algorithm,
    pub nonce: &'a str,
    pub cnonce: &'a str,
    pub nc: &'a str,
    pub qop: Option<Qop>,
    pub method: &'a str,
    pub uri: &'a str,
    /// Request body, only hashed for `auth-int`.
    pub body: &'a [u8],
}

impl DigestResponse<'_> {
    pub fn compute(&self) -> String {
        let ha1 = match self.algorithm {
            Algorithm::Md5 => self.ha1.to_string(),
            Algorithm::Md5Sess => md5_hex(format!("{}:{}:{}", self.ha1, self.nonce, self.cnonce)),
        };

        let ha2 = match self.qop {
            Some(Qop::AuthInt) => md5_hex(format!(
                "{}:{}:{}",
                self.method,
                self.uri,
                md5_hex(self.body)
            )),
            _ => md5_hex(format!("{}:{}", self.method, self.uri)),
        };

        let mut input = format!("{}:{}", ha1, self.nonce);
        if let Some(qop) = self.qop {
            let _ = write!(input, ":{}:{}:{}", self.nc, self.cnonce, qop);
        }
        input.push(':');
        input.push_str(&ha2);

        md5_hex(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_NONCE: &str = "dcd98b7102dd2f0e8b11d0f600bfb0c093";

    #[test]
    fn rfc2617_ha1() {
        assert_eq!(
            ha1("Mufasa", "testrealm@host.com", "Circle Of Life"),
            "939e7578ed9e3c518a452acee763bce9"
        );
    }

    #[test]
    fn rfc2617_worked_example() {
        let response = DigestResponse {
            ha1: "939e7578ed9e3c518a452acee763bce9",
            algorithm: Algorithm::Md5,
            nonce: RFC_NONCE,
            cnonce: "0a4f113b",
            nc: "00000001",
            qop: Some(Qop::Auth),
            method: "GET",
            uri: "/dir/index.html",
            body: &[],
        };
        assert_eq!(response.compute(), "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn rfc2069_without_qop() {
        let ha1 = ha1("Mufasa", "testrealm@host.com", "CircleOfLife");
        let response = DigestResponse {
            ha1: &ha1,
            algorithm: Algorithm::Md5,
            nonce: RFC_NONCE,
            cnonce: "",
            nc: "",
            qop: None,
            method: "GET",
            uri: "/dir/index.html",
            body: &[],
        };
        assert_eq!(response.compute(), "1949323746fe6a43ef61f9606e7febea");
    }

    #[test]
    fn rfc7616_md5_example() {
        let ha1 = ha1("Mufasa", "http-auth@example.org", "Circle of Life");
        let response = DigestResponse {
            ha1: &ha1,
            algorithm: Algorithm::Md5,
            nonce: "7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v",
            cnonce: "f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ",
            nc: "00000001",
            qop: Some(Qop::Auth),
            method: "GET",
            uri: "/dir/index.html",
            body: &[],
        };
        assert_eq!(response.compute(), "8ca523f5e9506fed4657c9700eebdbec");
    }

    #[test]
    fn auth_int_hashes_body() {
        let base = DigestResponse {
            ha1: "939e7578ed9e3c518a452acee763bce9",
            algorithm: Algorithm::Md5,
            nonce: RFC_NONCE,
            cnonce: "0a4f113b",
            nc: "00000001",
            qop: Some(Qop::AuthInt),
            method: "POST",
            uri: "/dir/index.html",
            body: b"payload",
        };
        let other = DigestResponse { body: b"tampered", ..base };

        let ha2 = md5_hex(format!("POST:/dir/index.html:{}", md5_hex(b"payload")));
        let expected = md5_hex(format!(
            "939e7578ed9e3c518a452acee763bce9:{}:00000001:0a4f113b:auth-int:{}",
            RFC_NONCE, ha2
        ));
        assert_eq!(base.compute(), expected);
        assert_ne!(base.compute(), other.compute());
    }

    #[test]
    fn md5_sess_rehashes_ha1() {
        let plain = "939e7578ed9e3c518a452acee763bce9";
        let sess = DigestResponse {
            ha1: plain,
            algorithm: Algorithm::Md5Sess,
            nonce: RFC_NONCE,
            cnonce: "0a4f113b",
            nc: "00000001",
            qop: Some(Qop::Auth),
            method: "GET",
            uri: "/dir/index.html",
            body: &[],
        };
        let rehashed = md5_hex(format!("{}:{}:0a4f113b", plain, RFC_NONCE));
        let equivalent = DigestResponse { ha1: &rehashed, algorithm: Algorithm::Md5, ..sess };
        assert_eq!(sess.compute(), equivalent.compute());
    }

    #[test]
    fn parses_authorization_fields() {
        let params = DigestParams::parse(
            r#"username="Mufasa", realm="testrealm@host.com",
               nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html",
               qop=auth, nc=00000001, cnonce="0a4f113b",
               response="6629fae49393a05397450978507c4ef1""#,
        )
        .unwrap();

        assert_eq!(params.username.as_deref(), Some("Mufasa"));
        assert_eq!(params.qop.as_deref(), Some("auth"));
        assert_eq!(params.nc.as_deref(), Some("00000001"));
        assert_eq!(params.algorithm, None);
    }

    #[test]
    fn quoted_values_unescape() {
        let map = parse_header_map(r#"realm="a \"quoted\" realm", x=1"#).unwrap();
        assert_eq!(map["realm"], "a \"quoted\" realm");
        assert_eq!(map["x"], "1");
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        assert_eq!(
            parse_header_map(r#"username="Mufasa"#),
            Err(AuthFailure::MalformedDigestHeader)
        );
    }

    #[test]
    fn unknown_algorithm_is_wrong_method() {
        assert_eq!("SHA-256".parse::<Algorithm>(), Err(AuthFailure::WrongAuthMethod));
    }

    #[test]
    fn challenge_round_trip() {
        let header = format!(
            "Digest realm=\"{}\", nonce=\"abc\", qop=\"auth,auth-int\", algorithm=MD5",
            "a \"b\"".quote_for_digest()
        );
        let challenge = Challenge::parse(&header).unwrap();
        assert_eq!(challenge.realm, "a \"b\"");
        assert_eq!(challenge.nonce, "abc");
        assert_eq!(challenge.qop, vec![Qop::Auth, Qop::AuthInt]);
        assert!(Challenge::parse("Basic realm=\"x\"").is_none());
    }

    #[test]
    fn nonces_are_unique() {
        assert_ne!(generate_nonce(), generate_nonce());
        assert_eq!(generate_cnonce().len(), 16);
    }
}
