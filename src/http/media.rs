//! Accept header parsing.
//!
//! Entries keep the order in which the client listed them; callers that want
//! quality-sorted negotiation sort the result themselves.

use serde::Serialize;

/// One entry of an Accept header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptEntry {
    pub main: String,
    pub sub: String,
    /// Quality factor in `(0, 1]`.
    pub quality: f64,
    /// Parameters other than `q`.
    pub params: Vec<(String, String)>,
}

impl AcceptEntry {
    fn wildcard() -> Self {
        Self {
            main: "*".to_string(),
            sub: "*".to_string(),
            quality: 1.0,
            params: Vec::new(),
        }
    }

    /// Wildcard-aware comparison against a concrete type.
    pub fn matches(&self, main: &str, sub: &str) -> bool {
        (self.main == "*" || self.main.eq_ignore_ascii_case(main))
            && (self.sub == "*" || self.sub.eq_ignore_ascii_case(sub))
    }
}

/// Parse an Accept header. A missing or blank header accepts everything.
pub fn parse_accept(header: Option<&str>) -> Vec<AcceptEntry> {
    let header = match header.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return vec![AcceptEntry::wildcard()],
    };

    header
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(token: &str) -> Option<AcceptEntry> {
    let mut parts = token.split(';');
    let expression = parts.next().unwrap_or_default().trim();
    let (main, sub) = expression.split_once('/').unwrap_or((expression, ""));

    let mut quality = 1.0;
    let mut params = Vec::new();
    for param in parts {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if key.eq_ignore_ascii_case("q") {
            quality = value.parse::<f64>().ok().filter(|q| *q > 0.0 && *q <= 1.0)?;
        } else if !key.is_empty() {
            params.push((key.to_string(), value.to_string()));
        }
    }

    Some(AcceptEntry {
        main: wildcard_if_empty(main),
        sub: wildcard_if_empty(sub),
        quality,
        params,
    })
}

fn wildcard_if_empty(component: &str) -> String {
    let component = component.trim();
    if component.is_empty() {
        "*".to_string()
    } else {
        component.to_ascii_lowercase()
    }
}
