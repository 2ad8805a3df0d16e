//! Path classification against the engine's debris area.

/// Check whether `path` lies outside the debris area rooted at `debris_path`.
///
/// Returns `false` when `path` is the debris path itself or is nested below
/// it (starts with `debris_path` followed by `separator`). Paths that merely
/// share a string prefix with the debris path stay syncable.
///
/// No normalization is performed: both paths must be built with the same
/// separator.
pub fn is_syncable(path: &str, debris_path: &str, separator: &str) -> bool {
    match path.strip_prefix(debris_path) {
        None => true,
        Some("") => false,
        Some(rest) => !rest.starts_with(separator),
    }
}

/// Join a parent path and a child name with `separator`.
pub fn join(parent: &str, name: &str, separator: &str) -> String {
    let mut path = String::with_capacity(parent.len() + separator.len() + name.len());
    path.push_str(parent);
    if !parent.is_empty() && !parent.ends_with(separator) {
        path.push_str(separator);
    }
    path.push_str(name);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBRIS: &str = ".debris";

    #[test]
    fn test_debris_itself_not_syncable() {
        assert!(!is_syncable(DEBRIS, DEBRIS, "/"));
        assert!(!is_syncable("dir/foo/.debris", "dir/foo/.debris", "/"));
    }

    #[test]
    fn test_nested_under_debris_not_syncable() {
        assert!(!is_syncable(".debris/", DEBRIS, "/"));
        assert!(!is_syncable(".debris/2024-01-01/file.txt", DEBRIS, "/"));
    }

    #[test]
    fn test_shared_prefix_is_syncable() {
        assert!(is_syncable(".debrisbar", DEBRIS, "/"));
        assert!(is_syncable("dir/foo", "dir/foo/.debris", "/"));
        assert!(is_syncable("dir/other", DEBRIS, "/"));
    }

    #[test]
    fn test_separator_is_not_normalized() {
        assert!(is_syncable(".debris\\nested", DEBRIS, "/"));
        assert!(!is_syncable(".debris\\nested", DEBRIS, "\\"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("d", "f", "/"), "d/f");
        assert_eq!(join("/", "f", "/"), "/f");
        assert_eq!(join("", "f", "/"), "f");
        assert_eq!(join("C:\\d", "f", "\\"), "C:\\d\\f");
    }
}
