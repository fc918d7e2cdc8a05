//! Source resolution: turning a user-supplied path into something a tool
//! can inspect.
//!
//! Inputs may be plain video files, Blu-ray folder trees (`BDMV/...`), ISO
//! disc images, or directories containing any of those. Resolution mounts
//! ISOs when needed; every resolved source carries a [`ReleaseGuard`] that
//! the caller must release on every exit path.

mod guard;
pub mod scan;

pub use guard::ReleaseGuard;
pub use scan::VideoCandidate;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mount::{mount_iso, MountHandle};
use crate::tools::ToolRegistry;

/// A resolved media source: the path a tool should be pointed at, plus the
/// cleanup its resolution acquired.
///
/// The path may live inside a mount owned by the guard; use it before
/// releasing.
#[derive(Debug)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub guard: ReleaseGuard,
}

impl ResolvedSource {
    /// A source that needs no cleanup.
    pub fn plain(path: PathBuf) -> Self {
        Self {
            path,
            guard: ReleaseGuard::none(),
        }
    }

    fn mounted(path: PathBuf, handle: MountHandle) -> Self {
        Self {
            path,
            guard: ReleaseGuard::mount(handle),
        }
    }
}

/// Resolve an input to a single playable stream (screenshots).
///
/// - plain video file: the file itself
/// - ISO: mounted, then the largest `.m2ts` of its BDMV tree
/// - directory: its BDMV tree if it has one; else the first contained ISO
///   in walk order, mounted; else the largest video in the top level; else
///   the largest video anywhere below
pub async fn resolve_playback_source(
    tools: &ToolRegistry,
    input: &Path,
) -> Result<ResolvedSource> {
    let meta = stat(input)?;

    if !meta.is_dir() {
        if scan::is_iso_file(input) {
            return m2ts_from_mounted_iso(tools, input).await;
        }
        return Ok(ResolvedSource::plain(input.to_path_buf()));
    }

    if let Some(root) = scan::bdmv_tree_root(input) {
        let m2ts = scan::find_largest_m2ts(&root)?;
        return Ok(ResolvedSource::plain(m2ts));
    }

    if let Some(iso) = scan::find_iso_in_dir(input)? {
        return m2ts_from_mounted_iso(tools, &iso).await;
    }

    let video = scan::find_video_file(input)?;
    Ok(ResolvedSource::plain(video))
}

/// Resolve an input to a ranked list of inspection candidates (mediainfo).
///
/// A plain file is its own single candidate; a directory yields every
/// allow-listed video below it, largest first, capped at `limit`. Never
/// mounts anything, so there is no guard to release.
pub fn resolve_candidate_sources(input: &Path, limit: usize) -> Result<Vec<VideoCandidate>> {
    let meta = stat(input)?;

    if !meta.is_dir() {
        return Ok(vec![VideoCandidate {
            path: input.to_path_buf(),
            size_bytes: meta.len(),
        }]);
    }

    scan::find_video_candidates(input, limit)
}

/// Resolve an input to a Blu-ray disc root (bdinfo).
///
/// ISOs are mounted and must expose a BDMV layout; directories are
/// normalized to the folder containing `BDMV`, falling back to the first
/// contained ISO. Plain non-ISO files are rejected.
pub async fn resolve_disc_root(tools: &ToolRegistry, input: &Path) -> Result<ResolvedSource> {
    let meta = stat(input)?;

    if !meta.is_dir() {
        if scan::is_iso_file(input) {
            return disc_root_from_mounted_iso(tools, input).await;
        }
        return Err(Error::Validation(
            "path must be a folder containing BDMV or ISO content".into(),
        ));
    }

    if let Some(root) = scan::bdmv_disc_root(input) {
        return Ok(ResolvedSource::plain(root));
    }

    if let Some(iso) = scan::find_iso_in_dir(input)? {
        return disc_root_from_mounted_iso(tools, &iso).await;
    }

    Err(Error::NoBdmv {
        path: input.to_path_buf(),
    })
}

/// Mount an ISO and locate the largest `.m2ts` of its BDMV tree. The mount
/// is released before returning any error past the mount.
async fn m2ts_from_mounted_iso(tools: &ToolRegistry, iso: &Path) -> Result<ResolvedSource> {
    let handle = mount_iso(tools, iso).await?;

    let located = scan::bdmv_tree_root(handle.path())
        .ok_or_else(|| Error::NoBdmv {
            path: iso.to_path_buf(),
        })
        .and_then(|root| scan::find_largest_m2ts(&root));

    match located {
        Ok(m2ts) => Ok(ResolvedSource::mounted(m2ts, handle)),
        Err(err) => {
            handle.release().await;
            Err(err)
        }
    }
}

/// Mount an ISO and return its mount point as a disc root, releasing the
/// mount if no BDMV layout is present.
async fn disc_root_from_mounted_iso(tools: &ToolRegistry, iso: &Path) -> Result<ResolvedSource> {
    let handle = mount_iso(tools, iso).await?;

    match scan::bdmv_disc_root(handle.path()) {
        Some(root) => Ok(ResolvedSource::mounted(root, handle)),
        None => {
            handle.release().await;
            Err(Error::NoBdmv {
                path: iso.to_path_buf(),
            })
        }
    }
}

/// Stat an input path, mapping a missing file to [`Error::NotFound`].
fn stat(path: &Path) -> Result<std::fs::Metadata> {
    std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::from(e)
        }
    })
}
