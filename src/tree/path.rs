//! Queue path utilities
//!
//! A queue path is the dot-joined ancestry of a queue, always starting at `root`.

use crate::error::StructuralError;
use crate::types::ROOT_QUEUE;

/// Path separator between segments
pub const SEPARATOR: char = '.';

/// Check that a path is well formed: starts at `root`, no empty segments, no whitespace.
pub fn validate_path(path: &str) -> Result<(), StructuralError> {
    let malformed = || StructuralError::MalformedPath(path.to_string());
    let mut segments = path.split(SEPARATOR);
    if segments.next() != Some(ROOT_QUEUE) {
        return Err(malformed());
    }
    for segment in segments {
        if segment.is_empty() || segment.chars().any(char::is_whitespace) {
            return Err(malformed());
        }
    }
    Ok(())
}

/// Join a parent path and a child segment.
pub fn join(parent: &str, segment: &str) -> String {
    format!("{}{}{}", parent, SEPARATOR, segment)
}

/// Parent path, or None for a single-segment path.
pub fn parent_of(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|idx| &path[..idx])
}

/// Last segment of a path.
pub fn segment_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Depth of a path; `root` is 0.
pub fn depth(path: &str) -> usize {
    path.matches(SEPARATOR).count()
}

/// True if `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}
