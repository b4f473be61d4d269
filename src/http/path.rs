//! Request path normalization.

/// Canonical form of a request path.
///
/// Collapses repeated separators, drops a trailing separator and guarantees a
/// single leading one. Absent or empty input maps to `/`.
pub fn normalize(raw: Option<&str>) -> String {
    let mut path = String::from("/");
    for segment in raw.unwrap_or_default().split('/').filter(|s| !s.is_empty()) {
        if path.len() > 1 {
            path.push('/');
        }
        path.push_str(segment);
    }
    path
}
