//! Starting conversion processes.
//!
//! A [`ProcessLauncher`] turns a [`LaunchRequest`] into a running process and
//! the public descriptor of its playlist. [`FfmpegLauncher`] is the production
//! implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use streamgate_common::{LaunchError, StreamId};
use tokio::process::Command;
use tracing::{debug, info};

use crate::process::{ChildHandle, ProcessHandle};
use crate::settings::HlsSettings;

/// Everything needed to start one stream's conversion.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub id: &'a StreamId,
    pub source: &'a str,
    pub output_dir: &'a Path,
    pub segment_duration: u32,
    pub list_size: u32,
}

/// A successfully started conversion.
#[derive(Debug)]
pub struct Launched {
    /// Locator at which the produced playlist is reachable.
    pub descriptor: String,
    /// Handle to the running process.
    pub handle: Arc<dyn ProcessHandle>,
}

/// Starts external conversion processes.
///
/// `launch` must not block on the process: it returns as soon as the process
/// is spawned. Implementations are called with the registry lock held.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, request: &LaunchRequest<'_>) -> Result<Launched, LaunchError>;
}

/// Launches `ffmpeg` writing an HLS playlist into the stream directory.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    program: PathBuf,
    settings: HlsSettings,
    public_base: String,
}

impl FfmpegLauncher {
    /// Create a launcher.
    ///
    /// # Arguments
    /// * `program` - Path to the ffmpeg executable.
    /// * `settings` - Fixed transport and codec parameters.
    /// * `public_base` - URL prefix under which stream directories are served,
    ///   e.g. `/streams`.
    pub fn new(program: impl Into<PathBuf>, settings: HlsSettings, public_base: &str) -> Self {
        Self {
            program: program.into(),
            settings,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public locator of a stream's playlist.
    pub fn descriptor(&self, id: &StreamId) -> String {
        format!("{}/{}/{}", self.public_base, id, self.settings.playlist_name)
    }

    pub fn settings(&self) -> &HlsSettings {
        &self.settings
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

impl ProcessLauncher for FfmpegLauncher {
    fn launch(&self, request: &LaunchRequest<'_>) -> Result<Launched, LaunchError> {
        prepare_output_dir(request.output_dir)?;

        let playlist = request.output_dir.join(&self.settings.playlist_name);
        let args = self.settings.ffmpeg_args(
            request.source,
            &playlist,
            request.segment_duration,
            request.list_size,
        );
        debug!(stream_id = %request.id, "ffmpeg args: {:?}", args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::spawn(self.program_name(), e))?;

        let handle = ChildHandle::supervise(request.id, child);
        info!(
            stream_id = %request.id,
            pid = ?handle.pid(),
            output = %playlist.display(),
            "Started ffmpeg"
        );

        Ok(Launched {
            descriptor: self.descriptor(request.id),
            handle: Arc::new(handle),
        })
    }
}

/// Create the directory if needed and make sure files can be written in it.
pub fn prepare_output_dir(dir: &Path) -> Result<(), LaunchError> {
    std::fs::create_dir_all(dir).map_err(|e| LaunchError::directory(dir, e))?;
    tempfile::tempfile_in(dir).map_err(|e| LaunchError::directory(dir, e))?;
    Ok(())
}
