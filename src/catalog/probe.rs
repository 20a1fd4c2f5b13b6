use crate::error::ProbeError;
use async_trait::async_trait;
use tokio::process::Command;

/// Resolves a video's real length from its media URL.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, media_url: &str) -> Result<f64, ProbeError>;
}

/// Shells out to `ffprobe`.
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self {
            program: "ffprobe".to_string(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn probe(&self, media_url: &str) -> Result<f64, ProbeError> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
                media_url,
            ])
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Used when probing is switched off in the config.
pub struct NoProbe;

#[async_trait]
impl DurationProbe for NoProbe {
    async fn probe(&self, _media_url: &str) -> Result<f64, ProbeError> {
        Err(ProbeError::Disabled)
    }
}

pub fn parse_ffprobe_duration(stdout: &str) -> Result<f64, ProbeError> {
    let info: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;

    // ffprobe prints the duration as a string
    let duration = match &info["format"]["duration"] {
        serde_json::Value::String(raw) => raw.trim().parse::<f64>().ok(),
        serde_json::Value::Number(num) => num.as_f64(),
        _ => None,
    };

    duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ProbeError::Parse(format!("no format.duration in {}", stdout.trim())))
}
