use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use streamgate_av::HlsSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub streams: StreamsConfig,

    #[serde(default)]
    pub hls: HlsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8088
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamsConfig {
    /// Base directory; each stream writes into `<dir>/<id>/`
    #[serde(default = "default_stream_dir")]
    pub dir: PathBuf,

    /// URL prefix under which `dir` is served
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Streams without a heartbeat for longer than this are stopped (default: 30)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How often the sweep runs (default: 10)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Keep streams whose process exited on its own visible as `stopped`
    /// until the next sweep instead of removing them immediately
    #[serde(default)]
    pub retain_exited: bool,
}

fn default_stream_dir() -> PathBuf {
    PathBuf::from("./streams")
}
fn default_public_path() -> String {
    "/streams".to_string()
}
fn default_idle_timeout() -> u64 {
    30
}
fn default_sweep_interval() -> u64 {
    10
}

impl StreamsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            dir: default_stream_dir(),
            public_path: default_public_path(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            retain_exited: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HlsConfig {
    /// Target segment length in seconds (default: 2)
    #[serde(default = "default_segment_time")]
    pub segment_time: u32,

    /// Segments kept in the playlist (default: 5)
    #[serde(default = "default_list_size")]
    pub list_size: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_rtsp_transport")]
    pub rtsp_transport: String,

    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,
}

fn default_segment_time() -> u32 {
    2
}
fn default_list_size() -> u32 {
    5
}
fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_preset() -> String {
    "ultrafast".to_string()
}
fn default_rtsp_transport() -> String {
    "tcp".to_string()
}
fn default_playlist_name() -> String {
    "stream.m3u8".to_string()
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            segment_time: default_segment_time(),
            list_size: default_list_size(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            rtsp_transport: default_rtsp_transport(),
            playlist_name: default_playlist_name(),
        }
    }
}

impl From<&HlsConfig> for HlsSettings {
    fn from(config: &HlsConfig) -> Self {
        Self {
            rtsp_transport: config.rtsp_transport.clone(),
            video_codec: config.video_codec.clone(),
            preset: config.preset.clone(),
            playlist_name: config.playlist_name.clone(),
            delete_segments: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}
