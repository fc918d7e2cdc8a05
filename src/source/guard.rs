//! Scoped release of resources acquired during source resolution.
//!
//! Resolution may leave behind an ISO mount or a staged upload directory.
//! Owners receive a [`ReleaseGuard`] and must call [`ReleaseGuard::release`]
//! on every exit path once the resolved path is no longer needed. Release is
//! exactly-once by construction; a guard that is dropped unreleased logs the
//! leak and cleans up best-effort.

use tempfile::TempDir;

use crate::mount::MountHandle;

/// The resource a guard owns.
#[derive(Debug)]
enum Cleanup {
    /// A staged directory (uploads); removed on release.
    TempDir(TempDir),
    /// A mounted ISO; unmounted and removed on release.
    Mount(MountHandle),
}

/// Owns whatever cleanup a resolved source requires.
#[derive(Debug)]
pub struct ReleaseGuard {
    cleanup: Option<Cleanup>,
}

impl ReleaseGuard {
    /// A guard with nothing to clean up.
    pub fn none() -> Self {
        Self { cleanup: None }
    }

    /// A guard that removes a staged directory on release.
    pub fn temp_dir(dir: TempDir) -> Self {
        Self {
            cleanup: Some(Cleanup::TempDir(dir)),
        }
    }

    /// A guard that unmounts an ISO on release.
    pub fn mount(handle: MountHandle) -> Self {
        Self {
            cleanup: Some(Cleanup::Mount(handle)),
        }
    }

    /// Whether releasing this guard actually does anything.
    pub fn is_noop(&self) -> bool {
        self.cleanup.is_none()
    }

    /// Release the owned resource.
    ///
    /// Unmount failures and removal failures are logged, never returned;
    /// release must not fail on partial state.
    pub async fn release(mut self) {
        match self.cleanup.take() {
            Some(Cleanup::Mount(handle)) => handle.release().await,
            Some(Cleanup::TempDir(dir)) => {
                if let Err(err) = dir.close() {
                    tracing::warn!(%err, "failed to remove staged dir");
                }
            }
            None => {}
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(cleanup) = self.cleanup.take() else {
            return;
        };

        match cleanup {
            Cleanup::Mount(handle) => {
                tracing::warn!("release guard dropped with live mount, unmounting best-effort");
                match tokio::runtime::Handle::try_current() {
                    Ok(rt) => {
                        rt.spawn(async move { handle.release().await });
                    }
                    Err(_) => handle.release_blocking(),
                }
            }
            // TempDir removes itself on drop.
            Cleanup::TempDir(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_guard_is_noop() {
        let guard = ReleaseGuard::none();
        assert!(guard.is_noop());
        guard.release().await;
    }

    #[tokio::test]
    async fn temp_dir_guard_removes_dir_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let guard = ReleaseGuard::temp_dir(dir);
        assert!(!guard.is_noop());
        assert!(path.is_dir());

        guard.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn dropped_temp_dir_guard_still_removes_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        drop(ReleaseGuard::temp_dir(dir));
        assert!(!path.exists());
    }
}
