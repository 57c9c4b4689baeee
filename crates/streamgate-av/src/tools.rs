//! External tool detection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use streamgate_av::check_tool;
/// use std::path::Path;
///
/// let info = check_tool(Path::new("ffmpeg"), "-version");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: &Path, version_arg: &str) -> ToolInfo {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string());

    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = if program.is_absolute() {
                Some(program.to_path_buf())
            } else {
                which::which(program).ok()
            };

            ToolInfo {
                name,
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool streamgate shells out to.
pub fn check_tools(ffmpeg_path: Option<&Path>) -> Vec<ToolInfo> {
    vec![check_tool(&resolve_ffmpeg(ffmpeg_path), "-version")]
}

/// Locate ffmpeg.
///
/// A configured path is used when it exists; otherwise `PATH` is searched.
/// When nothing is found the bare name is returned, so a later spawn reports
/// the failure.
pub fn resolve_ffmpeg(custom: Option<&Path>) -> PathBuf {
    if let Some(path) = custom {
        if path.exists() {
            return path.to_path_buf();
        }
        tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
    }

    which::which("ffmpeg").unwrap_or_else(|_| PathBuf::from("ffmpeg"))
}
