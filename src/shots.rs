//! Screenshot pipeline: duration probing, timestamp sampling, frame capture.
//!
//! Eight frames per source, spread over the runtime with a little jitter so
//! repeated runs of the same file do not produce identical sheets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::command::ToolCommand;
use crate::error::{Error, Result};
use crate::tools::ToolRegistry;

/// Number of frames captured per source.
pub const SHOT_COUNT: usize = 8;

/// Probe a media file's duration in seconds via ffprobe.
///
/// Empty, unparsable and non-positive durations are reported as ffprobe
/// failures; screenshots cannot proceed without a usable duration.
pub async fn probe_duration(tools: &ToolRegistry, path: &Path, timeout: Duration) -> Result<f64> {
    let ffprobe = tools.require("ffprobe")?;

    let output = ToolCommand::new(ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .timeout(timeout)
        .execute()
        .await?;

    let value = output.stdout.trim();
    if value.is_empty() {
        return Err(Error::tool("ffprobe", "returned empty duration"));
    }

    let duration: f64 = value
        .parse()
        .map_err(|e| Error::tool("ffprobe", format!("invalid duration {value:?}: {e}")))?;
    if duration <= 0.0 {
        return Err(Error::tool(
            "ffprobe",
            format!("duration must be positive, got {duration}"),
        ));
    }

    Ok(duration)
}

/// Pick [`SHOT_COUNT`] sample points across a duration.
///
/// The duration is split into nine equal intervals; each point sits at an
/// interior boundary, jittered by up to a quarter interval, and clamped to
/// leave a small margin before the end. Points are kept distinct at
/// millisecond resolution by nudging colliding values forward.
pub fn sample_timestamps(duration: f64) -> Vec<f64> {
    if duration <= 0.0 {
        return Vec::new();
    }

    let mut rng = rand::thread_rng();
    let mut stamps = Vec::with_capacity(SHOT_COUNT);
    let mut used = HashSet::with_capacity(SHOT_COUNT);

    let step = duration / (SHOT_COUNT as f64 + 1.0);
    let mut max_t = duration - 0.2;
    if max_t < 0.0 {
        max_t = duration;
    }

    for i in 0..SHOT_COUNT {
        let mut base = step * (i as f64 + 1.0);
        if duration < 1.0 {
            base = duration * ((i as f64 + 1.0) / (SHOT_COUNT as f64 + 1.0));
        }

        let mut jitter = step * 0.25;
        if jitter <= 0.0 {
            jitter = duration * 0.05;
        }

        let mut t = base + rng.gen_range(-1.0..1.0) * jitter;
        if t > max_t {
            t = max_t;
        }
        if t < 0.0 {
            t = 0.0;
        }

        let mut key = (t * 1000.0) as i64;
        let mut tries = 0;
        while tries < 10 && used.contains(&key) {
            t += 0.137;
            if t > max_t {
                t = max_t - 0.137;
            }
            if t < 0.0 {
                t = 0.0;
            }
            key = (t * 1000.0) as i64;
            tries += 1;
        }
        used.insert(key);
        stamps.push(t);
    }

    stamps
}

/// Capture a single frame at `seconds` into `out` via ffmpeg.
///
/// The seek sits before the input so ffmpeg jumps instead of decoding its
/// way there.
pub async fn capture_frame(
    tools: &ToolRegistry,
    input: &Path,
    seconds: f64,
    out: &Path,
    timeout: Duration,
) -> Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    ToolCommand::new(ffmpeg)
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-y")
        .arg("-ss")
        .arg(format!("{seconds:.3}"))
        .arg("-i")
        .arg(input)
        .arg("-frames:v")
        .arg("1")
        .arg("-q:v")
        .arg("2")
        .arg("-an")
        .arg(out)
        .timeout(timeout)
        .execute()
        .await?;

    Ok(())
}

/// Probe, sample and capture a full screenshot set into `out_dir`.
///
/// The whole run shares one budget: every tool invocation gets whatever is
/// left of it. Returns the written files, `shot_01.png` through
/// `shot_08.png`, in capture order.
pub async fn capture_screenshots(
    tools: &ToolRegistry,
    input: &Path,
    out_dir: &Path,
    budget: Duration,
) -> Result<Vec<PathBuf>> {
    let deadline = Instant::now() + budget;

    let duration = probe_duration(tools, input, remaining(deadline, "ffprobe", budget)?).await?;
    tracing::debug!(input = %input.display(), duration, "probed duration for screenshots");

    let stamps = sample_timestamps(duration);
    let mut files = Vec::with_capacity(stamps.len());
    for (i, ts) in stamps.iter().enumerate() {
        let out_path = out_dir.join(format!("shot_{:02}.png", i + 1));
        capture_frame(
            tools,
            input,
            *ts,
            &out_path,
            remaining(deadline, "ffmpeg", budget)?,
        )
        .await?;
        files.push(out_path);
    }

    Ok(files)
}

/// Time left until `deadline`, or the timeout error the next tool would
/// have produced.
fn remaining(deadline: Instant, tool: &str, budget: Duration) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::timeout(tool, budget));
    }
    Ok(left)
}
