//! Loop-mounting of ISO images with guaranteed teardown.
//!
//! A mount lives in a fresh temp directory and is always torn down through
//! [`MountHandle::release`]: a normal `umount` under its own deadline, a
//! lazy detach as fallback, and unconditional removal of the temp directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::command::ToolCommand;
use crate::error::{Error, Result};
use crate::tools::ToolRegistry;

/// Deadline for the mount command.
const MOUNT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for each umount attempt during release.
const UMOUNT_TIMEOUT: Duration = Duration::from_secs(30);

/// A mounted ISO image: the mount point plus everything needed to tear it
/// down again.
#[derive(Debug)]
pub struct MountHandle {
    dir: TempDir,
    umount_bin: PathBuf,
}

impl MountHandle {
    /// The mount point.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Unmount and remove the mount point.
    ///
    /// Runs under fresh deadlines detached from whatever request triggered
    /// the mount: an expired request must still unmount. Failures are
    /// logged, never returned; the temp directory is removed regardless.
    pub async fn release(self) {
        let mount_dir = self.dir.path().to_string_lossy().to_string();

        let normal = ToolCommand::new(&self.umount_bin)
            .arg(&mount_dir)
            .timeout(UMOUNT_TIMEOUT)
            .execute()
            .await;

        if let Err(err) = normal {
            tracing::warn!(mount = %mount_dir, %err, "umount failed, trying lazy detach");
            let lazy = ToolCommand::new(&self.umount_bin)
                .arg("-l")
                .arg(&mount_dir)
                .timeout(UMOUNT_TIMEOUT)
                .execute()
                .await;
            if let Err(err) = lazy {
                tracing::warn!(mount = %mount_dir, %err, "lazy umount failed");
            }
        }

        if let Err(err) = self.dir.close() {
            tracing::warn!(mount = %mount_dir, %err, "failed to remove mount dir");
        }
    }

    /// Last-resort synchronous teardown for leaked handles.
    ///
    /// Used by the release guard's drop path only; normal code goes through
    /// [`MountHandle::release`].
    pub(crate) fn release_blocking(self) {
        let mount_dir = self.dir.path().to_string_lossy().to_string();

        let normal = std::process::Command::new(&self.umount_bin)
            .arg(&mount_dir)
            .output();

        let ok = matches!(&normal, Ok(out) if out.status.success());
        if !ok {
            let _ = std::process::Command::new(&self.umount_bin)
                .arg("-l")
                .arg(&mount_dir)
                .output();
        }

        if let Err(err) = self.dir.close() {
            tracing::warn!(mount = %mount_dir, %err, "failed to remove mount dir");
        }
    }
}

/// Mount an ISO image read-only over a loop device.
///
/// Creates a fresh temp directory as the mount point and runs
/// `mount -o loop,ro <iso> <dir>` under [`MOUNT_TIMEOUT`]. On failure the
/// temp directory is removed before the error returns; the error message
/// carries the mount tool's stderr when there is any.
pub async fn mount_iso(tools: &ToolRegistry, iso: &Path) -> Result<MountHandle> {
    let mount_bin = tools.require("mount")?.to_path_buf();
    let umount_bin = tools.require("umount")?.to_path_buf();

    let dir = tempfile::Builder::new()
        .prefix("discprobe-iso-")
        .tempdir()?;

    tracing::debug!(iso = %iso.display(), mount = %dir.path().display(), "mounting iso");

    let result = ToolCommand::new(&mount_bin)
        .arg("-o")
        .arg("loop,ro")
        .arg(iso)
        .arg(dir.path())
        .timeout(MOUNT_TIMEOUT)
        .execute()
        .await;

    match result {
        Ok(_) => Ok(MountHandle { dir, umount_bin }),
        Err(err) => {
            // TempDir drop removes the mount point before the error returns.
            drop(dir);
            Err(mount_failure(iso, err))
        }
    }
}

/// Wrap a command failure as a mount error, keeping the composed stderr
/// message when there is one.
fn mount_failure(iso: &Path, err: Error) -> Error {
    let message = match err {
        Error::Tool { message, .. } => message,
        other => other.to_string(),
    };
    Error::mount(iso, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;

    fn registry_with(mount: &str, umount: &str) -> Option<ToolRegistry> {
        let mount = which::which(mount).ok()?;
        let umount = which::which(umount).ok()?;
        let cfg = ToolsConfig {
            mount_path: Some(mount),
            umount_path: Some(umount),
            ..Default::default()
        };
        Some(ToolRegistry::discover(&cfg))
    }

    fn iso_mount_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Ok(entries) = std::fs::read_dir(std::env::temp_dir()) {
            for entry in entries.flatten() {
                if entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("discprobe-iso-")
                {
                    dirs.push(entry.path());
                }
            }
        }
        dirs
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_mount_removes_temp_dir() {
        // `false` stands in for a mount binary that always fails.
        let Some(registry) = registry_with("false", "true") else {
            return;
        };

        let before = iso_mount_dirs();
        let iso = tempfile::NamedTempFile::new().unwrap();
        let result = mount_iso(&registry, iso.path()).await;

        assert!(matches!(result, Err(Error::Mount { .. })));
        assert_eq!(iso_mount_dirs(), before, "mount dir left behind");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn release_removes_mount_dir() {
        // `true` stands in for mount/umount binaries that always succeed,
        // so no real mount happens and no root is needed.
        let Some(registry) = registry_with("true", "true") else {
            return;
        };

        let iso = tempfile::NamedTempFile::new().unwrap();
        let handle = mount_iso(&registry, iso.path()).await.unwrap();
        let mount_dir = handle.path().to_path_buf();
        assert!(mount_dir.is_dir());

        handle.release().await;
        assert!(!mount_dir.exists(), "mount dir survived release");
    }
}
