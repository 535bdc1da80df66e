use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use engine::render::{FrameSize, RenderCommand};

/// Lines of encoder stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to launch {bin}: {source}")]
    Launch {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{bin} exited with {status}: {stderr}")]
    EngineInvocation {
        bin: String,
        status: String,
        stderr: String,
    },
}

/// The external media tooling the daemon drives.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Frame size of the first video stream in `media_path`.
    async fn probe_frame_size(&self, media_path: &Path) -> Result<FrameSize>;

    /// Run a compiled render to completion. Partial output is left in place on failure.
    async fn render(&self, command: &RenderCommand) -> std::result::Result<(), RenderError>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct FFmpegWrapper {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FFmpegWrapper {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        FFmpegWrapper {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

#[async_trait]
impl MediaEngine for FFmpegWrapper {
    async fn probe_frame_size(&self, media_path: &Path) -> Result<FrameSize> {
        let output = Command::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=codec_type,width,height")
            .arg("-of")
            .arg("json")
            .arg(media_path)
            .output()
            .await
            .with_context(|| format!("Failed to execute {}. Make sure FFmpeg is installed.", self.ffprobe_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed on {}: {}", media_path.display(), stderr.trim());
        }

        parse_frame_size(&output.stdout)
            .with_context(|| format!("No usable video stream in {}", media_path.display()))
    }

    async fn render(&self, command: &RenderCommand) -> std::result::Result<(), RenderError> {
        info!(
            "Rendering {} with: {} {}",
            command.output_path.display(),
            self.ffmpeg_bin,
            command.ffmpeg_args.join(" ")
        );

        let output = Command::new(&self.ffmpeg_bin)
            .args(&command.ffmpeg_args)
            .output()
            .await
            .map_err(|source| RenderError::Launch {
                bin: self.ffmpeg_bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::EngineInvocation {
                bin: self.ffmpeg_bin.clone(),
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        debug!("ffmpeg finished for {}", command.output_path.display());
        Ok(())
    }
}

fn parse_frame_size(probe_json: &[u8]) -> Result<FrameSize> {
    let probe: ProbeOutput =
        serde_json::from_slice(probe_json).context("Failed to parse ffprobe JSON output")?;

    probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
        .find_map(|s| match (s.width, s.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(FrameSize { width, height })
            }
            _ => None,
        })
        .context("ffprobe reported no video dimensions")
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
