//! Fixed ffmpeg parameters for RTSP to HLS conversion.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Transport and codec settings shared by every launched stream.
///
/// Segment duration and list size are not part of this struct; they are
/// supplied per launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsSettings {
    /// RTSP transport (default: tcp).
    pub rtsp_transport: String,
    /// Video encoder (default: libx264).
    pub video_codec: String,
    /// Encoder preset (default: ultrafast).
    pub preset: String,
    /// Playlist file name inside the stream directory (default: stream.m3u8).
    pub playlist_name: String,
    /// Let ffmpeg delete segments that fall off the playlist (default: true).
    pub delete_segments: bool,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            rtsp_transport: "tcp".to_string(),
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            playlist_name: "stream.m3u8".to_string(),
            delete_segments: true,
        }
    }
}

impl HlsSettings {
    /// Build the ffmpeg argument list for one stream.
    ///
    /// # Arguments
    /// * `source` - Upstream locator, passed through untouched.
    /// * `playlist` - Output playlist path.
    /// * `segment_duration` - Target segment length in seconds.
    /// * `list_size` - Number of segments kept in the playlist.
    pub fn ffmpeg_args(
        &self,
        source: &str,
        playlist: &Path,
        segment_duration: u32,
        list_size: u32,
    ) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
        ];

        // Only RTSP inputs understand -rtsp_transport
        if source.starts_with("rtsp://") || source.starts_with("rtsps://") {
            args.extend(["-rtsp_transport".to_string(), self.rtsp_transport.clone()]);
        }

        args.extend(["-i".to_string(), source.to_string()]);

        args.extend([
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ]);

        args.extend([
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            segment_duration.to_string(),
            "-hls_list_size".to_string(),
            list_size.to_string(),
        ]);

        if self.delete_segments {
            args.extend(["-hls_flags".to_string(), "delete_segments".to_string()]);
        }

        args.extend(["-y".to_string(), playlist.to_string_lossy().to_string()]);

        args
    }
}
