//! Form and query parameter decoding.

use std::collections::HashMap;

use axum::body::Bytes;
use serde_json::{json, Value};

use crate::http::multipart;

/// A single parameter occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    /// An uploaded file part.
    Binary {
        filename: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(text) => Some(text),
            ParamValue::Binary { .. } => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(text) => Value::String(text.clone()),
            ParamValue::Binary { filename, content_type, data } => json!({
                "filename": filename,
                "content_type": content_type,
                "size": data.len(),
            }),
        }
    }
}

/// Parameter name → occurrences in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, Vec<ParamValue>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence; repeated names accumulate.
    pub fn add(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.entry(name.into()).or_default().push(value);
    }

    pub fn get(&self, name: &str) -> Option<&[ParamValue]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Text occurrences of a parameter.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .unwrap_or_default()
            .iter()
            .filter_map(ParamValue::as_text)
            .collect()
    }

    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.texts(name).into_iter().next()
    }

    /// Append all occurrences of `other` after the existing ones.
    pub fn merge(&mut self, other: Params) {
        for (name, values) in other.values {
            self.values.entry(name).or_default().extend(values);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// JSON object view: single occurrences as scalars, repeated ones as arrays.
    pub fn to_json(&self) -> Value {
        let map = self
            .iter()
            .map(|(name, values)| {
                let value = match values {
                    [single] => single.to_json(),
                    many => Value::Array(many.iter().map(ParamValue::to_json).collect()),
                };
                (name.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }
}

/// Decode `application/x-www-form-urlencoded` text into `params`.
///
/// Pairs without `=` are skipped.
pub fn decode_urlencoded(input: &str, params: &mut Params) {
    for pair in input.split('&') {
        if !pair.contains('=') {
            continue;
        }
        if let Some((name, value)) = url::form_urlencoded::parse(pair.as_bytes()).next() {
            params.add(name.into_owned(), ParamValue::Text(value.into_owned()));
        }
    }
}

/// Decode a cached body according to its content type.
///
/// Unrecognized content types yield no parameters.
pub fn decode(body: &Bytes, content_type: Option<&str>) -> Params {
    let mut params = Params::new();
    let Some(content_type) = content_type else {
        return params;
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();

    if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        decode_urlencoded(&String::from_utf8_lossy(body), &mut params);
    } else if essence.eq_ignore_ascii_case("multipart/form-data") {
        let parts = multipart::parse_boundary(content_type)
            .and_then(|boundary| multipart::parse(body, &boundary));
        match parts {
            Ok(parts) => {
                for part in parts {
                    let value = match part.filename {
                        None => ParamValue::Text(String::from_utf8_lossy(&part.data).into_owned()),
                        filename => ParamValue::Binary {
                            filename,
                            content_type: part.content_type,
                            data: part.data,
                        },
                    };
                    params.add(part.name, value);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed multipart body"),
        }
    }
    params
}
