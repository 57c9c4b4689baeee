//! Stream lifecycle management.
//!
//! The [`StreamRegistry`] owns every running conversion: it starts ffmpeg
//! through a [`streamgate_av::ProcessLauncher`], refreshes liveness on
//! heartbeats, absorbs process exits, and evicts idle streams when the sweep
//! task calls [`StreamRegistry::sweep`].
//!
//! # Lifecycle
//!
//! ```text
//! (none) --start--> Active --stop / sweep / process exit--> (removed)
//! ```
//!
//! With `retain_exited`, a process exit leaves the record `Stopped` until the
//! next sweep or an explicit stop.

mod record;
mod registry;
mod sweeper;

pub use record::{StreamInfo, StreamState, StreamStatus};
pub use registry::{RegistryOptions, StreamRegistry, SweepReport};
pub use sweeper::start_sweep_task;
