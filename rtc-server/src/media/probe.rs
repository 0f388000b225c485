//! Clip duration probing
//!
//! The duration of a clip comes from an external media-probing tool. The
//! tool is treated as a black box behind [`DurationProbe`] so the locator can
//! be exercised without it.

use async_trait::async_trait;
use rtc_common::{Error, Result};
use std::path::Path;
use tokio::process::Command;

/// Reports the playback duration of a media file in seconds
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// Runs `ffprobe` and reads the container duration
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::ExternalTool(format!("Failed to run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool(format!(
                "{} exited with {:?} for {}: {}",
                self.binary,
                output.status.code(),
                path.display(),
                stderr.trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the probe's stdout into seconds
///
/// Anything that is not a finite, non-negative number is an ExternalTool error.
pub fn parse_probe_output(stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    let seconds: f64 = trimmed.parse().map_err(|_| {
        Error::ExternalTool(format!("Non-numeric duration output: '{}'", trimmed))
    })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::ExternalTool(format!(
            "Invalid duration output: '{}'",
            trimmed
        )));
    }
    Ok(seconds)
}
