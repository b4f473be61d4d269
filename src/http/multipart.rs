//! `multipart/form-data` payload parsing.
//!
//! Works on an already cached body; part contents are zero-copy slices of it.

use std::collections::HashMap;

use axum::body::Bytes;
use thiserror::Error;

/// RFC 2046 recommends multipart boundary length <= 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    #[error("multipart delimiter not found")]
    MissingDelimiter,
    #[error("unexpected end of multipart body")]
    UnexpectedEof,
    #[error("invalid part headers")]
    InvalidPartHeaders,
}

/// One named part of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Parse boundary from Content-Type header.
///
/// Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(boundary.to_string());
        }
    }
    Err(MultipartError::MissingBoundary)
}

/// Split a multipart body into its named parts.
///
/// Parts without a `form-data` name are skipped.
pub fn parse(body: &Bytes, boundary: &str) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let data = &body[..];
    let mut parts = Vec::new();
    let mut pos = find_delimiter(data, &delimiter, 0, 0)?;

    loop {
        let after = pos + delimiter.len();
        match data.get(after..after + 2) {
            Some(b"--") => return Ok(parts),
            Some(b"\r\n") => {}
            _ => return Err(MultipartError::UnexpectedEof),
        }

        let (headers, content_start) = parse_part_headers(data, after + 2)?;
        let next = find_delimiter(data, &delimiter, content_start, content_start + 2)?;
        let content = body.slice(content_start..next - 2);

        if let Some(part) = build_part(&headers, content) {
            parts.push(part);
        }
        pos = next;
    }
}

/// Position of the next delimiter at or after `start` that begins a line,
/// is followed by CRLF or `--`, and does not begin before `min`.
fn find_delimiter(
    data: &[u8],
    delimiter: &[u8],
    start: usize,
    min: usize,
) -> Result<usize, MultipartError> {
    let len = delimiter.len();
    if data.len() < len {
        return Err(MultipartError::MissingDelimiter);
    }

    for i in start.max(min)..=data.len() - len {
        if !data[i..].starts_with(delimiter) {
            continue;
        }
        if i != 0 && (i < 2 || &data[i - 2..i] != b"\r\n") {
            continue;
        }
        match data.get(i + len..i + len + 2) {
            Some(b"\r\n") | Some(b"--") => return Ok(i),
            Some(_) => continue,
            None => return Err(MultipartError::UnexpectedEof),
        }
    }
    Err(MultipartError::MissingDelimiter)
}

fn parse_part_headers(
    data: &[u8],
    start: usize,
) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;

    loop {
        let line_end = data[pos..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|offset| pos + offset)
            .ok_or(MultipartError::UnexpectedEof)?;
        let line = &data[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }

        let line = std::str::from_utf8(line).map_err(|_| MultipartError::InvalidPartHeaders)?;
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        pos = line_end + 2;
    }
}

fn build_part(headers: &HashMap<String, String>, data: Bytes) -> Option<Part> {
    let disposition = headers.get("content-disposition")?;
    let mut params = disposition.split(';');
    if !params.next()?.trim().eq_ignore_ascii_case("form-data") {
        return None;
    }

    let mut name = None;
    let mut filename = None;
    for param in params {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "filename" => filename = Some(value),
            _ => {}
        }
    }

    Some(Part {
        name: name?,
        filename,
        content_type: headers.get("content-type").cloned(),
        data,
    })
}
