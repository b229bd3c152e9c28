//! Virtual path handling.
//!
//! Entry names are forward-slash paths that may cross archive boundaries,
//! e.g. `bundle.tar/docs.zip/readme.txt`. Nothing here touches the
//! filesystem.

/// Normalize a path into the canonical entry-name form.
///
/// Backslashes become slashes, `.` and empty segments are dropped, and `..`
/// cancels the preceding segment. A `..` with nothing left to cancel is kept
/// on relative paths and dropped on absolute ones. A leading `/` and a
/// trailing `/` survive when the result is not empty.
///
/// ```
/// use arcstream_core::path::normalize;
///
/// assert_eq!(normalize("./a/../b/c"), "b/c");
/// assert_eq!(normalize("dir\\sub\\"), "dir/sub/");
/// assert_eq!(normalize("."), "");
/// ```
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let trailing = unified.len() > 1 && unified.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
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

    let mut result = String::with_capacity(unified.len());
    if absolute {
        result.push('/');
    }
    result.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        result.push('/');
    }
    result
}

/// Join a base directory and a name with a single slash.
///
/// No slash is inserted when either side is empty or the base already ends
/// with one.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Last segment of a path.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Extension of the last segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let base = basename(path);
    base.rfind('.').map(|pos| &base[pos + 1..])
}

/// Strip the last extension from the last segment of a path.
///
/// `dir/foo.txt.gz` gives `foo.txt`; names without a dot are returned whole.
pub fn strip_extension(path: &str) -> &str {
    let base = basename(path);
    match base.rfind('.') {
        Some(pos) => &base[..pos],
        None => base,
    }
}

/// Number of directory separators in a name.
pub fn depth(name: &str) -> usize {
    name.matches('/').count()
}

/// Position of `name` relative to the directory `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `name` equals `base`.
    Exact,
    /// `name` lies inside `base`.
    Inside,
    /// `name` is a parent of `base` (for example the archive holding it).
    Ancestor,
    /// Unrelated paths.
    Outside,
}

/// Classify `name` against `base` by whole path segments.
///
/// An empty base contains every name.
pub fn scope(base: &str, name: &str) -> Scope {
    if base.is_empty() {
        return if name.is_empty() {
            Scope::Exact
        } else {
            Scope::Inside
        };
    }
    if name == base {
        return Scope::Exact;
    }
    if name.len() > base.len() {
        if name.starts_with(base)
            && (base.ends_with('/') || name.as_bytes()[base.len()] == b'/')
        {
            return Scope::Inside;
        }
    } else if base.starts_with(name)
        && (name.ends_with('/') || base.as_bytes()[name.len()] == b'/')
    {
        return Scope::Ancestor;
    }
    Scope::Outside
}
