//! # streamgate-av
//!
//! Process launching and supervision for streamgate.
//!
//! This crate provides:
//!
//! - **Launching** ([`ProcessLauncher`], [`FfmpegLauncher`]) -- create a
//!   stream's output directory and spawn ffmpeg writing HLS into it.
//! - **Supervision** ([`ProcessHandle`], [`ChildHandle`]) -- kill a process
//!   and await its exit from any task.
//! - **Settings** ([`HlsSettings`]) -- fixed transport and codec parameters.
//! - **Tool discovery** ([`check_tools`], [`resolve_ffmpeg`]).

pub mod launcher;
pub mod process;
pub mod settings;
pub mod tools;

// ---- Re-exports for convenience ----

pub use launcher::{prepare_output_dir, FfmpegLauncher, LaunchRequest, Launched, ProcessLauncher};
pub use process::{ChildHandle, ExitOutcome, ProcessHandle};
pub use settings::HlsSettings;
pub use tools::{check_tool, check_tools, resolve_ffmpeg, ToolInfo};

pub use streamgate_common::{KillError, LaunchError};
