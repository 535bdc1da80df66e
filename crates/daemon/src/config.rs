use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Daemon configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    /// Root directory holding one sub-directory per asset.
    pub storage_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            host: "127.0.0.1".to_string(),
            port: 7777,
            storage_dir: PathBuf::from("storage"),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let defaults = DaemonConfig::default();
        DaemonConfig {
            host: std::env::var("BROLL_HOST").unwrap_or(defaults.host),
            port: std::env::var("BROLL_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            storage_dir: std::env::var("BROLL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
        }
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
