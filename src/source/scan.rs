//! Directory scanning: video detection, BDMV layouts, ISO discovery.
//!
//! All walks are depth-first in lexical order, so results are deterministic
//! for a given tree. An unreadable entry aborts the scan with its error
//! instead of being skipped silently.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extensions accepted as video files. Matching is on the extension only,
/// case-insensitive; file contents are never inspected.
const VIDEO_EXTENSIONS: &[&str] = &[
    "m2ts", "mts", "mkv", "mp4", "m4v", "mov", "avi", "wmv", "flv", "mpg", "mpeg", "m2v", "ts",
    "vob", "webm",
];

/// A video file found during candidate collection.
///
/// Candidates order by descending size, with ascending path as the
/// tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Check if a path has an accepted video file extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has an `.iso` extension.
pub fn is_iso_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("iso"))
        .unwrap_or(false)
}

/// Normalize a path to the `BDMV` directory of a Blu-ray tree, if the path
/// is one: the `BDMV` folder itself, its `STREAM` subfolder, or a folder
/// with a direct `BDMV` child.
pub fn bdmv_tree_root(path: &Path) -> Option<PathBuf> {
    if let Some(name) = path.file_name() {
        if name.eq_ignore_ascii_case("BDMV") || name.eq_ignore_ascii_case("STREAM") {
            return Some(path.to_path_buf());
        }
    }
    let bdmv = path.join("BDMV");
    if bdmv.is_dir() {
        return Some(bdmv);
    }
    None
}

/// Normalize a path to the disc root (the directory *containing* `BDMV`),
/// accepting the same three shapes as [`bdmv_tree_root`]. This is the form
/// bdinfo wants.
pub fn bdmv_disc_root(path: &Path) -> Option<PathBuf> {
    if let Some(name) = path.file_name() {
        if name.eq_ignore_ascii_case("BDMV") {
            return path.parent().map(Path::to_path_buf);
        }
        if name.eq_ignore_ascii_case("STREAM") {
            return path.parent().and_then(Path::parent).map(Path::to_path_buf);
        }
    }
    if path.join("BDMV").is_dir() {
        return Some(path.to_path_buf());
    }
    None
}

/// Find the first ISO file under `root` in walk order, if any.
pub fn find_iso_in_dir(root: &Path) -> Result<Option<PathBuf>> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if is_iso_file(entry.path()) {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

/// Find the largest `.m2ts` file under a BDMV tree.
///
/// Prefers the `STREAM` subdirectory when it exists; equal sizes keep the
/// first file found.
pub fn find_largest_m2ts(root: &Path) -> Result<PathBuf> {
    let stream = root.join("STREAM");
    let search_root = if stream.is_dir() { stream } else { root.to_path_buf() };

    let mut largest_path = None;
    let mut largest_size = 0u64;

    for entry in WalkDir::new(&search_root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let has_ext = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("m2ts"))
            .unwrap_or(false);
        if !has_ext {
            continue;
        }
        let size = entry.metadata()?.len();
        if size > largest_size {
            largest_size = size;
            largest_path = Some(entry.into_path());
        }
    }

    largest_path.ok_or(Error::NoStreams { root: search_root })
}

/// Find the best video in a directory: the largest allow-listed file in the
/// top level, falling back to a recursive search when the top level holds
/// none.
pub fn find_video_file(root: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(root)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut best_path = None;
    let mut best_size = 0u64;

    for entry in entries {
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if !is_video_file(&path) {
            continue;
        }
        let size = entry.metadata()?.len();
        if size > best_size {
            best_size = size;
            best_path = Some(path);
        }
    }

    match best_path {
        Some(path) => Ok(path),
        None => find_largest_video_file(root),
    }
}

/// Find the largest allow-listed video anywhere under `root`.
pub fn find_largest_video_file(root: &Path) -> Result<PathBuf> {
    let mut largest_path = None;
    let mut largest_size = 0u64;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !is_video_file(entry.path()) {
            continue;
        }
        let size = entry.metadata()?.len();
        if size > largest_size {
            largest_size = size;
            largest_path = Some(entry.into_path());
        }
    }

    largest_path.ok_or_else(|| Error::no_video(root))
}

/// Collect every allow-listed video under `root`, ranked by descending
/// size with ascending path as the tie-break, capped at `limit`.
pub fn find_video_candidates(root: &Path, limit: usize) -> Result<Vec<VideoCandidate>> {
    let limit = limit.max(1);

    let mut items = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !is_video_file(entry.path()) {
            continue;
        }
        let size_bytes = entry.metadata()?.len();
        items.push(VideoCandidate {
            path: entry.into_path(),
            size_bytes,
        });
    }

    if items.is_empty() {
        return Err(Error::no_video(root));
    }

    items.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
    });
    items.truncate(limit);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn video_extension_matching() {
        assert!(is_video_file(Path::new("movie.mkv")));
        assert!(is_video_file(Path::new("movie.m2ts")));
        assert!(is_video_file(Path::new("movie.MKV")));
        assert!(is_video_file(Path::new("/path/to/movie.vob")));
        assert!(is_video_file(Path::new("movie.1080p.mpg")));

        assert!(!is_video_file(Path::new("movie.srt")));
        assert!(!is_video_file(Path::new("movie.iso")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn iso_extension_matching() {
        assert!(is_iso_file(Path::new("disc.iso")));
        assert!(is_iso_file(Path::new("disc.ISO")));
        assert!(!is_iso_file(Path::new("disc.img")));
        assert!(!is_iso_file(Path::new("iso")));
    }

    #[test]
    fn bdmv_tree_root_shapes() {
        let tmp = TempDir::new().unwrap();
        let disc = tmp.path().join("disc");
        fs::create_dir_all(disc.join("BDMV/STREAM")).unwrap();

        // The BDMV folder itself and its STREAM subfolder map to themselves.
        assert_eq!(
            bdmv_tree_root(&disc.join("BDMV")),
            Some(disc.join("BDMV"))
        );
        assert_eq!(
            bdmv_tree_root(&disc.join("BDMV/STREAM")),
            Some(disc.join("BDMV/STREAM"))
        );
        // A folder containing BDMV maps into it.
        assert_eq!(bdmv_tree_root(&disc), Some(disc.join("BDMV")));
        // Anything else is not a BDMV tree.
        assert_eq!(bdmv_tree_root(tmp.path().join("other").as_path()), None);
    }

    #[test]
    fn bdmv_disc_root_shapes() {
        let tmp = TempDir::new().unwrap();
        let disc = tmp.path().join("disc");
        fs::create_dir_all(disc.join("BDMV/STREAM")).unwrap();

        assert_eq!(bdmv_disc_root(&disc.join("BDMV")), Some(disc.clone()));
        assert_eq!(
            bdmv_disc_root(&disc.join("BDMV/STREAM")),
            Some(disc.clone())
        );
        assert_eq!(bdmv_disc_root(&disc), Some(disc));
    }

    #[test]
    fn first_iso_in_walk_order() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "b/second.iso", 1);
        write_file(tmp.path(), "a/first.iso", 1);
        write_file(tmp.path(), "notes.txt", 1);

        let found = find_iso_in_dir(tmp.path()).unwrap();
        assert_eq!(found, Some(tmp.path().join("a/first.iso")));
    }

    #[test]
    fn no_iso_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "movie.mkv", 1);
        assert_eq!(find_iso_in_dir(tmp.path()).unwrap(), None);
    }

    #[test]
    fn largest_m2ts_prefers_stream_dir() {
        let tmp = TempDir::new().unwrap();
        let bdmv = tmp.path().join("BDMV");
        write_file(&bdmv, "STREAM/00001.m2ts", 10);
        write_file(&bdmv, "STREAM/00002.m2ts", 50);
        write_file(&bdmv, "STREAM/00003.m2ts", 30);
        // A bigger stray outside STREAM must not win while STREAM exists.
        write_file(&bdmv, "BACKUP/99999.m2ts", 100);

        let largest = find_largest_m2ts(&bdmv).unwrap();
        assert_eq!(largest, bdmv.join("STREAM/00002.m2ts"));
    }

    #[test]
    fn largest_m2ts_falls_back_to_whole_tree() {
        let tmp = TempDir::new().unwrap();
        let bdmv = tmp.path().join("BDMV");
        write_file(&bdmv, "BACKUP/00001.m2ts", 10);
        write_file(&bdmv, "BACKUP/00002.m2ts", 20);

        let largest = find_largest_m2ts(&bdmv).unwrap();
        assert_eq!(largest, bdmv.join("BACKUP/00002.m2ts"));
    }

    #[test]
    fn no_m2ts_reports_no_streams() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("STREAM")).unwrap();
        let err = find_largest_m2ts(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NoStreams { .. }));
    }

    #[test]
    fn top_level_video_beats_nested() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "small.mkv", 5);
        write_file(tmp.path(), "big.mkv", 50);
        // Nested files are ignored while the top level has any video.
        write_file(tmp.path(), "extras/huge.mkv", 500);

        let best = find_video_file(tmp.path()).unwrap();
        assert_eq!(best, tmp.path().join("big.mkv"));
    }

    #[test]
    fn nested_search_when_top_level_empty() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "readme.txt", 5);
        write_file(tmp.path(), "extras/episode1.mkv", 10);
        write_file(tmp.path(), "extras/episode2.mkv", 40);

        let best = find_video_file(tmp.path()).unwrap();
        assert_eq!(best, tmp.path().join("extras/episode2.mkv"));
    }

    #[test]
    fn empty_dir_has_no_video() {
        let tmp = TempDir::new().unwrap();
        let err = find_video_file(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NoVideo { .. }));
    }

    #[test]
    fn candidates_ranked_and_capped() {
        let tmp = TempDir::new().unwrap();
        for (name, size) in [
            ("e1.mkv", 10),
            ("e2.mkv", 70),
            ("e3.mkv", 30),
            ("sub/e4.mkv", 60),
            ("sub/e5.mkv", 20),
            ("sub/e6.mkv", 50),
            ("sub/e7.mkv", 40),
        ] {
            write_file(tmp.path(), name, size);
        }

        let candidates = find_video_candidates(tmp.path(), 5).unwrap();
        assert_eq!(candidates.len(), 5);
        let sizes: Vec<u64> = candidates.iter().map(|c| c.size_bytes).collect();
        assert_eq!(sizes, vec![70, 60, 50, 40, 30]);
    }

    #[test]
    fn candidates_tie_break_on_path() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "bbb.mkv", 10);
        write_file(tmp.path(), "aaa.mkv", 10);

        let candidates = find_video_candidates(tmp.path(), 5).unwrap();
        assert_eq!(candidates[0].path, tmp.path().join("aaa.mkv"));
        assert_eq!(candidates[1].path, tmp.path().join("bbb.mkv"));
    }

    #[test]
    fn candidates_limit_floor_is_one() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.mkv", 10);
        write_file(tmp.path(), "b.mkv", 20);

        let candidates = find_video_candidates(tmp.path(), 0).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, tmp.path().join("b.mkv"));
    }

    #[test]
    fn candidates_empty_dir_errors() {
        let tmp = TempDir::new().unwrap();
        let err = find_video_candidates(tmp.path(), 5).unwrap_err();
        assert!(matches!(err, Error::NoVideo { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_aborts_the_scan() {
        use std::os::unix::fs::PermissionsExt;

        // Permission bits do not bind root, so the walk would succeed there.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "top.mkv", 10);
        write_file(tmp.path(), "blocked/inner.mkv", 20);
        let blocked = tmp.path().join("blocked");
        fs::set_permissions(&blocked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = find_video_candidates(tmp.path(), 5);

        // Restore before asserting so the tempdir can be removed.
        fs::set_permissions(&blocked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Scan { .. }), "unexpected error: {err}");
    }
}
