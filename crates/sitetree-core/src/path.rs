// ABOUTME: Absolute page path helpers shared by traversal, navigation, and routing
// ABOUTME: Paths look like `/blog/post-1`; the project root is the empty string

/// Normalize a user or route supplied path: collapse empty segments,
/// drop trailing slashes, and map `/` to the root path `""`.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    normalized
}

/// Non-empty segments of a path
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Absolute path of a child given its parent's absolute path
pub fn join(prefix: &str, segment: &str) -> String {
    format!("{prefix}/{segment}")
}

/// Parent path, or `None` for the root
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    path.rfind('/').map(|index| &path[..index])
}

/// Last segment of a path; the root displays as `/`
pub fn display_name(path: &str) -> &str {
    segments(path).last().unwrap_or("/")
}

/// Whether `ancestor` names `path` itself or one of its ancestors,
/// compared segment by segment so `/bl` is not a prefix of `/blog`.
pub fn is_prefix(ancestor: &str, path: &str) -> bool {
    let mut path_segments = segments(path);
    segments(ancestor).all(|segment| path_segments.next() == Some(segment))
}

/// Every prefix of a normalized path from the root down to the path itself
pub fn prefixes(path: &str) -> Vec<String> {
    let mut result = vec![String::new()];
    let mut current = String::new();
    for segment in segments(path) {
        current = join(&current, segment);
        result.push(current.clone());
    }
    result
}

/// Whether a string is usable as a single page segment
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.trim().is_empty() && !segment.contains('/')
}
