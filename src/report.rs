//! The three inspection operations, shared by the API handlers and the CLI.
//!
//! Each operation takes a staged input path, resolves it through the source
//! contracts, runs the external tools under one shared budget, and releases
//! whatever the resolution acquired before returning.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::command::ToolCommand;
use crate::error::{Error, Result};
use crate::source::{self, ResolvedSource};
use crate::tools::ToolRegistry;
use crate::{archive, shots};

/// Run mediainfo against candidates derived from the input; the first
/// candidate that yields output wins.
///
/// The last failure is remembered so an all-miss run still reports
/// something useful.
pub async fn mediainfo_report(
    tools: &ToolRegistry,
    input: &Path,
    candidate_limit: usize,
    timeout: Duration,
) -> Result<String> {
    let bin = tools.require("mediainfo")?;
    let deadline = Instant::now() + timeout;

    let candidates = source::resolve_candidate_sources(input, candidate_limit)?;

    let mut last_err: Option<Error> = None;
    for candidate in &candidates {
        let budget = match remaining(deadline) {
            Some(left) => left,
            None => {
                last_err = Some(Error::timeout("mediainfo", timeout));
                break;
            }
        };

        let run = ToolCommand::new(bin)
            .arg(&candidate.path)
            .timeout(budget)
            .execute()
            .await;

        let output = match run {
            Ok(out) => compose_output(&out.stdout, &out.stderr),
            Err(e) => {
                tracing::debug!(candidate = %candidate.path.display(), error = %e, "mediainfo candidate failed");
                last_err = Some(e);
                continue;
            }
        };

        if output.is_empty() {
            last_err = Some(Error::tool(
                "mediainfo",
                format!("returned empty output for: {}", candidate.path.display()),
            ));
            continue;
        }

        return Ok(output);
    }

    Err(last_err.unwrap_or_else(|| Error::tool("mediainfo", "returned empty output")))
}

/// Run bdinfo against the disc root derived from the input.
///
/// The report may legitimately be empty; composition rules match
/// [`mediainfo_report`].
pub async fn bdinfo_report(
    tools: &ToolRegistry,
    input: &Path,
    timeout: Duration,
) -> Result<String> {
    let bin = tools.require("bdinfo")?;
    let deadline = Instant::now() + timeout;

    let ResolvedSource { path, guard } = source::resolve_disc_root(tools, input).await?;

    let outcome = match remaining(deadline) {
        Some(budget) => {
            ToolCommand::new(bin)
                .arg(&path)
                .timeout(budget)
                .execute()
                .await
        }
        None => Err(Error::timeout("bdinfo", timeout)),
    };
    guard.release().await;

    let out = outcome?;
    Ok(compose_output(&out.stdout, &out.stderr))
}

/// Resolve the input for playback and capture a screenshot set into
/// `out_dir`. Any mount acquired during resolution is released on every
/// path.
pub async fn capture_set(
    tools: &ToolRegistry,
    input: &Path,
    out_dir: &Path,
    timeout: Duration,
) -> Result<Vec<PathBuf>> {
    let ResolvedSource { path, guard } = source::resolve_playback_source(tools, input).await?;
    let outcome = shots::capture_screenshots(tools, &path, out_dir, timeout).await;
    guard.release().await;
    outcome
}

/// Capture a screenshot set into a scratch directory and zip it up.
pub async fn screenshot_archive(
    tools: &ToolRegistry,
    input: &Path,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let shot_dir = tempfile::Builder::new()
        .prefix("discprobe-shots-")
        .tempdir()?;

    let files = capture_set(tools, input, shot_dir.path(), timeout).await?;
    tracing::info!(input = %input.display(), count = files.len(), "captured screenshots");

    tokio::task::spawn_blocking(move || archive::zip_files(&files))
        .await
        .map_err(|e| Error::Internal(format!("archive task failed: {e}")))?
}

/// Trimmed stdout, with trimmed stderr appended after a blank line when
/// both are present.
fn compose_output(stdout: &str, stderr: &str) -> String {
    let mut output = stdout.trim().to_string();
    let err = stderr.trim();
    if !err.is_empty() {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str(err);
    }
    output
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        None
    } else {
        Some(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_composition() {
        assert_eq!(compose_output(" report \n", ""), "report");
        assert_eq!(compose_output("report", " warn \n"), "report\n\nwarn");
        assert_eq!(compose_output("", "warn"), "warn");
        assert_eq!(compose_output(" ", " "), "");
    }

    #[test]
    fn remaining_is_none_past_the_deadline() {
        assert!(remaining(Instant::now()).is_none());
        assert!(remaining(Instant::now() + Duration::from_secs(60)).is_some());
    }
}
