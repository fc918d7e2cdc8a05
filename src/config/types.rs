use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static web UI assets served at the root path
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Shared password for HTTP basic auth; auth is disabled when unset
    #[serde(default)]
    pub password: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Root directory for path suggestions; completions never leave it
    #[serde(default = "default_media_root")]
    pub root: PathBuf,

    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("/media")
}

fn default_max_suggestions() -> usize {
    200
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub mediainfo_path: Option<PathBuf>,

    #[serde(default)]
    pub bdinfo_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub mount_path: Option<PathBuf>,

    #[serde(default)]
    pub umount_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Overall tool budget per request; each invocation gets what remains
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum number of video candidates considered per directory
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Maximum accepted upload size in mebibytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_request_timeout() -> u64 {
    600
}

fn default_candidate_limit() -> usize {
    5
}

fn default_max_upload_mb() -> u64 {
    8192
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            candidate_limit: default_candidate_limit(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl LimitsConfig {
    /// Overall per-request tool budget as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Upload cap in bytes, for the request body limit layer.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize) * 1024 * 1024
    }
}
