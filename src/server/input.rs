//! Request input staging: a literal path field or an uploaded file.
//!
//! Every report endpoint accepts the same multipart form. A non-empty
//! `path` text field names something already on disk; otherwise a `file`
//! part is streamed into a fresh staging directory. The staged copy keeps
//! its (sanitized) original file name so extension checks and tool output
//! still see it.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::paths;
use crate::source::ReleaseGuard;

/// An input ready for resolution, plus staging cleanup for uploads.
pub struct StagedInput {
    path: PathBuf,
    guard: ReleaseGuard,
}

impl StagedInput {
    /// The path to hand to the source resolver.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove any staged upload.
    pub async fn release(self) {
        self.guard.release().await;
    }
}

/// Pull the input out of a multipart form.
///
/// A usable `path` field wins over an upload; with neither present the
/// request is invalid. The path is trimmed, unquoted, lexically cleaned
/// and must exist.
pub async fn staged_input(mut multipart: Multipart) -> Result<StagedInput> {
    let mut path_field: Option<String> = None;
    let mut upload: Option<(tempfile::TempDir, PathBuf)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid form data: {e}")))?
    {
        match field.name() {
            Some("path") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("invalid form data: {e}")))?;
                path_field = Some(text);
            }
            Some("file") if upload.is_none() => {
                let original = field.file_name().map(str::to_owned).unwrap_or_default();
                upload = Some(stage_upload(&mut field, &original).await?);
            }
            _ => {}
        }
    }

    if let Some(path) = path_field.as_deref().and_then(paths::clean_user_path) {
        // An explicit path wins; drop any staged upload.
        drop(upload);
        tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found(&path),
            _ => Error::from(e),
        })?;
        return Ok(StagedInput {
            path,
            guard: ReleaseGuard::none(),
        });
    }

    match upload {
        Some((dir, path)) => Ok(StagedInput {
            path,
            guard: ReleaseGuard::temp_dir(dir),
        }),
        None => Err(Error::Validation("missing file or path".into())),
    }
}

async fn stage_upload(field: &mut Field<'_>, original: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::Builder::new()
        .prefix("discprobe-upload-")
        .tempdir()?;
    let path = dir.path().join(sanitize_file_name(original));

    let mut file = File::create(&path).await?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| Error::Validation(format!("upload failed: {e}")))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!(staged = %path.display(), "staged uploaded file");
    Ok((dir, path))
}

/// Keep only the final component of a client-supplied file name.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.is_empty() {
        "upload".to_string()
    } else {
        base
    }
}
