//! Lexical path canonicalization for file-name strings.

/// Collapse `.` segments, `..` segments and repeated separators.
///
/// Purely lexical: the filesystem is never consulted. Leading `..` segments
/// of a relative path are kept, and `..` at the root of an absolute path is
/// dropped. An empty result becomes `.` (or `/` for absolute paths).
#[must_use]
pub fn simplify_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
