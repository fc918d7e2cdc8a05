//! Path normalization, containment checks and autocomplete listing.
//!
//! Everything here is lexical. Suggestions are bounded by the configured
//! media root, so containment must hold before any directory is read, and
//! symlinks are deliberately not resolved.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{Error, Result};

/// Lexically normalize a path: collapse separators, drop `.` components,
/// resolve `..` against preceding components, and never escape the root.
///
/// An empty input normalizes to `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Normalize a user-supplied path string: trim whitespace, strip
/// surrounding double quotes, then clean. Returns `None` when nothing
/// is left.
pub fn clean_user_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }
    Some(clean_path(Path::new(trimmed)))
}

/// Whether `path` sits at or under `root`, lexically.
pub fn is_subpath(root: &Path, path: &Path) -> bool {
    clean_path(path).strip_prefix(clean_path(root)).is_ok()
}

/// Complete a partial path under `root`.
///
/// An empty prefix lists the root itself. A prefix ending in a separator
/// lists that directory. Anything else splits into parent and partial
/// name, and the parent's entries are filtered by case-insensitive name
/// prefix. Directories gain a trailing separator so the client can keep
/// descending. The listed directory must sit inside the root.
///
/// The prefix is expected to be pre-trimmed; relative prefixes resolve
/// against the root.
pub fn suggest_paths(root: &Path, prefix: &str, limit: usize) -> Result<Vec<String>> {
    let root_abs = absolutize(root)?;

    if prefix.is_empty() {
        return list_dir(&root_abs, "", limit);
    }

    let cleaned = clean_path(Path::new(prefix));
    let abs_prefix = if cleaned.is_absolute() {
        cleaned
    } else {
        clean_path(&root_abs.join(cleaned))
    };

    if prefix.ends_with(MAIN_SEPARATOR) || prefix.ends_with('/') {
        if !is_subpath(&root_abs, &abs_prefix) {
            return Err(Error::Validation("path is outside the media root".into()));
        }
        return list_dir(&abs_prefix, "", limit);
    }

    let dir = match abs_prefix.parent() {
        Some(parent) => parent.to_path_buf(),
        None => abs_prefix.clone(),
    };
    let base = match abs_prefix.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => abs_prefix.to_string_lossy().into_owned(),
    };
    if !is_subpath(&root_abs, &dir) {
        return Err(Error::Validation("path is outside the media root".into()));
    }
    list_dir(&dir, &base, limit)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(clean_path(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(clean_path(&cwd.join(path)))
}

/// List `dir` entries whose names start with `base` (case-insensitive),
/// in name order, as full paths. `limit == 0` means unbounded.
fn list_dir(dir: &Path, base: &str, limit: usize) -> Result<Vec<String>> {
    let read = fs::read_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::not_found(dir),
        _ => Error::from(e),
    })?;

    let mut entries = read.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let base_lower = base.to_lowercase();
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.file_name();
        if !base_lower.is_empty() && !name.to_string_lossy().to_lowercase().starts_with(&base_lower)
        {
            continue;
        }

        let mut full = dir.join(&name).to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            full.push(MAIN_SEPARATOR);
        }
        items.push(full);
        if limit > 0 && items.len() >= limit {
            break;
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn clean_collapses_dots_and_separators() {
        assert_eq!(clean_path(Path::new("./foo/./bar")), PathBuf::from("foo/bar"));
        assert_eq!(clean_path(Path::new("/x//y/")), PathBuf::from("/x/y"));
        assert_eq!(clean_path(Path::new("a/b/../c")), PathBuf::from("a/c"));
    }

    #[test]
    fn clean_never_escapes_the_root() {
        assert_eq!(clean_path(Path::new("/a/../..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn clean_keeps_leading_parent_components() {
        assert_eq!(clean_path(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(clean_path(Path::new("../../a")), PathBuf::from("../../a"));
    }

    #[test]
    fn clean_empty_is_current_dir() {
        assert_eq!(clean_path(Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn user_path_strips_whitespace_and_quotes() {
        assert_eq!(
            clean_user_path(" \"/media/movie.mkv\" "),
            Some(PathBuf::from("/media/movie.mkv"))
        );
        assert_eq!(clean_user_path("  "), None);
        assert_eq!(clean_user_path("\"\""), None);
    }

    #[test]
    fn subpath_containment() {
        let root = Path::new("/media");
        assert!(is_subpath(root, Path::new("/media")));
        assert!(is_subpath(root, Path::new("/media/movies/a.mkv")));
        assert!(!is_subpath(root, Path::new("/media2")));
        assert!(!is_subpath(root, Path::new("/")));
        assert!(!is_subpath(root, Path::new("/media/../etc")));
    }

    fn fixture_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("beta.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("Gamma.mkv"), b"x").unwrap();
        dir
    }

    #[test]
    fn empty_prefix_lists_root_in_name_order() {
        let root = fixture_root();
        let items = suggest_paths(root.path(), "", 10).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[0].ends_with("Gamma.mkv"), "{items:?}");
        assert!(items[1].ends_with(&format!("alpha{MAIN_SEPARATOR}")), "{items:?}");
        assert!(items[2].ends_with("beta.mkv"), "{items:?}");
    }

    #[test]
    fn partial_name_filters_case_insensitively() {
        let root = fixture_root();
        let prefix = root.path().join("g").to_string_lossy().into_owned();
        let items = suggest_paths(root.path(), &prefix, 10).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].ends_with("Gamma.mkv"));
    }

    #[test]
    fn trailing_separator_lists_that_directory() {
        let root = fixture_root();
        std::fs::write(root.path().join("alpha/inner.mkv"), b"x").unwrap();
        let prefix = format!("{}{}", root.path().join("alpha").display(), MAIN_SEPARATOR);
        let items = suggest_paths(root.path(), &prefix, 10).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].ends_with("inner.mkv"));
    }

    #[test]
    fn relative_prefix_resolves_under_root() {
        let root = fixture_root();
        let items = suggest_paths(root.path(), "be", 10).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].ends_with("beta.mkv"));
    }

    #[test]
    fn escaping_the_root_is_rejected() {
        let root = fixture_root();
        let err = suggest_paths(root.path(), "/etc/", 10).unwrap_err();
        assert_matches!(err, Error::Validation(_));

        let err = suggest_paths(root.path(), "../", 10).unwrap_err();
        assert_matches!(err, Error::Validation(_));
    }

    #[test]
    fn limit_caps_results() {
        let root = fixture_root();
        let items = suggest_paths(root.path(), "", 2).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn missing_directory_reports_not_found() {
        let root = fixture_root();
        let prefix = format!("{}{}", root.path().join("gone").display(), MAIN_SEPARATOR);
        let err = suggest_paths(root.path(), &prefix, 10).unwrap_err();
        assert_matches!(err, Error::NotFound { .. });
    }
}
