//! The stream registry.
//!
//! Tracks one record per stream id, guarantees at most one running conversion
//! per id, and reclaims streams that crash or stop receiving heartbeats.
//!
//! All state lives behind a single `RwLock`. Caller operations, the periodic
//! sweep, and the per-stream exit observers all take it; the lock is never held
//! across an `.await`.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamgate_av::{
    ExitOutcome, KillError, LaunchError, LaunchRequest, ProcessHandle, ProcessLauncher,
};
use streamgate_common::{Error, Result, StreamId};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::record::{StreamInfo, StreamRecord, StreamState, StreamStatus};
use crate::config::Config;

/// Registry tuning.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Base directory holding one output directory per stream.
    pub stream_dir: PathBuf,
    /// Active streams idle for longer than this are evicted by the sweep.
    pub idle_timeout: Duration,
    /// HLS segment length in seconds, passed to every launch.
    pub segment_duration: u32,
    /// HLS playlist length, passed to every launch.
    pub list_size: u32,
    /// Keep records of processes that exited on their own in `Stopped` state
    /// until the next sweep instead of removing them right away.
    pub retain_exited: bool,
}

impl RegistryOptions {
    pub fn new(stream_dir: impl Into<PathBuf>) -> Self {
        Self {
            stream_dir: stream_dir.into(),
            idle_timeout: Duration::from_secs(30),
            segment_duration: 2,
            list_size: 5,
            retain_exited: false,
        }
    }
}

impl From<&Config> for RegistryOptions {
    fn from(config: &Config) -> Self {
        Self {
            stream_dir: config.streams.dir.clone(),
            idle_timeout: config.streams.idle_timeout(),
            segment_duration: config.hls.segment_time,
            list_size: config.hls.list_size,
            retain_exited: config.streams.retain_exited,
        }
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records present when the sweep started.
    pub examined: usize,
    /// Records removed by this sweep.
    pub evicted: usize,
}

/// Thread-safe registry of active streams.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct StreamRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    streams: RwLock<HashMap<StreamId, StreamRecord>>,
    launcher: Arc<dyn ProcessLauncher>,
    options: RegistryOptions,
    next_generation: AtomicU64,
}

impl StreamRegistry {
    /// Create an empty registry.
    pub fn new(launcher: Arc<dyn ProcessLauncher>, options: RegistryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                streams: RwLock::new(HashMap::new()),
                launcher,
                options,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.inner.options
    }

    /// Directory a stream writes its artifacts into.
    pub fn output_dir(&self, id: &StreamId) -> PathBuf {
        self.inner.options.stream_dir.join(id.as_str())
    }

    /// Start converting a stream, or return the running one.
    ///
    /// If the id already has an active record, its liveness clock is refreshed
    /// and its descriptor returned; no process is spawned. Otherwise the
    /// launcher is invoked and a new record inserted. Launch and insert happen
    /// under the write lock, so concurrent starts for one id spawn exactly one
    /// process.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// * [`Error::InvalidId`] if `id` cannot name a stream.
    /// * [`Error::Launch`] if the directory or process could not be created.
    ///   The registry is left unchanged.
    pub fn start(&self, id: &str, source: &str) -> Result<String> {
        let id = StreamId::parse(id)?;
        let mut streams = self.inner.streams.write();

        if let Some(record) = streams.get_mut(&id) {
            if record.is_active() {
                record.touch();
                debug!(stream_id = %id, "Stream already active, reusing");
                return Ok(record.descriptor.clone());
            }
        }

        let output_dir = self.output_dir(&id);
        let request = LaunchRequest {
            id: &id,
            source,
            output_dir: &output_dir,
            segment_duration: self.inner.options.segment_duration,
            list_size: self.inner.options.list_size,
        };

        let launched = match self.inner.launcher.launch(&request) {
            Ok(launched) => launched,
            Err(e) => {
                warn!(stream_id = %id, error = %e, "Failed to start stream");
                // Don't leave an empty directory behind for an id nobody owns
                if matches!(e, LaunchError::SpawnFailed { .. }) && !streams.contains_key(&id) {
                    if let Err(cleanup) = remove_artifacts(&output_dir) {
                        debug!(stream_id = %id, error = %cleanup, "Failed to remove output directory");
                    }
                }
                return Err(e.into());
            }
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let record = StreamRecord::new(
            id.clone(),
            source.to_string(),
            Arc::clone(&launched.handle),
            generation,
            launched.descriptor.clone(),
        );
        streams.insert(id.clone(), record);
        self.watch_exit(id.clone(), generation, launched.handle);

        info!(
            stream_id = %id,
            generation = generation,
            descriptor = %launched.descriptor,
            "Started stream"
        );

        Ok(launched.descriptor)
    }

    /// Stop a stream, delete its artifacts, and forget it.
    ///
    /// Returns once the kill has been issued; it does not wait for the process
    /// to exit.
    ///
    /// # Errors
    /// * [`Error::NotFound`] if the id is unknown. Stopping twice fails.
    /// * [`Error::Cleanup`] if the output directory could not be deleted. The
    ///   record is removed regardless.
    pub fn stop(&self, id: &str) -> Result<()> {
        let mut streams = self.inner.streams.write();
        let record = streams.remove(id).ok_or_else(|| Error::not_found(id))?;

        if record.is_active() {
            kill(&record);
        }

        let result = remove_artifacts(&self.output_dir(&record.id));

        info!(
            stream_id = %record.id,
            duration_secs = (Utc::now() - record.started_at).num_seconds(),
            "Stopped stream"
        );

        result.map_err(|e| Error::cleanup(&record.id, e))
    }

    /// Current status of a stream.
    pub fn status(&self, id: &str) -> StreamStatus {
        self.inner
            .streams
            .read()
            .get(id)
            .map_or(StreamStatus::NotFound, |record| record.state.into())
    }

    /// Refresh a stream's liveness clock.
    ///
    /// # Errors
    /// * [`Error::NotFound`] if the id is unknown.
    /// * [`Error::Inactive`] if the stream's process has exited.
    pub fn heartbeat(&self, id: &str) -> Result<()> {
        let mut streams = self.inner.streams.write();
        let record = streams.get_mut(id).ok_or_else(|| Error::not_found(id))?;

        if !record.is_active() {
            return Err(Error::inactive(id));
        }

        let idle = record.idle_for(Instant::now());
        record.touch();
        debug!(
            stream_id = %id,
            idle_secs = idle.as_secs(),
            "Stream heartbeat"
        );
        Ok(())
    }

    /// Number of streams currently active.
    pub fn active_count(&self) -> usize {
        self.inner
            .streams
            .read()
            .values()
            .filter(|record| record.is_active())
            .count()
    }

    /// Snapshot of every known stream, ordered by id.
    pub fn list(&self) -> Vec<StreamInfo> {
        let now = Instant::now();
        let mut streams: Vec<StreamInfo> = self
            .inner
            .streams
            .read()
            .values()
            .map(|record| record.info(now))
            .collect();
        streams.sort_by(|a, b| a.id.cmp(&b.id));
        streams
    }

    /// Evict idle and dead streams.
    ///
    /// Active streams idle for longer than the configured timeout are killed;
    /// stopped records are dropped. Both get their artifacts deleted. Failures
    /// are logged and never abort the scan.
    pub fn sweep(&self) -> SweepReport {
        let mut streams = self.inner.streams.write();
        let now = Instant::now();
        let idle_timeout = self.inner.options.idle_timeout;

        let examined = streams.len();
        let expired: Vec<StreamId> = streams
            .values()
            .filter(|record| !record.is_active() || record.idle_for(now) > idle_timeout)
            .map(|record| record.id.clone())
            .collect();

        for id in &expired {
            let Some(record) = streams.remove(id) else {
                continue;
            };

            info!(
                stream_id = %id,
                idle_secs = record.idle_for(now).as_secs(),
                state = ?record.state,
                "Evicting stream"
            );

            if record.is_active() {
                kill(&record);
            }
            if let Err(e) = remove_artifacts(&self.output_dir(id)) {
                warn!(stream_id = %id, error = %e, "Failed to remove stream artifacts");
            }
        }

        let report = SweepReport {
            examined,
            evicted: expired.len(),
        };
        if report.evicted > 0 {
            debug!(
                examined = report.examined,
                evicted = report.evicted,
                "Swept streams"
            );
        }
        report
    }

    /// Stop every stream. Used on shutdown.
    pub fn stop_all(&self) -> usize {
        let mut streams = self.inner.streams.write();
        let count = streams.len();

        for (id, record) in streams.drain() {
            if record.is_active() {
                kill(&record);
            }
            if let Err(e) = remove_artifacts(&self.inner.options.stream_dir.join(id.as_str())) {
                warn!(stream_id = %id, error = %e, "Failed to remove stream artifacts");
            }
        }

        if count > 0 {
            info!(count = count, "Stopped all streams");
        }
        count
    }

    fn watch_exit(&self, id: StreamId, generation: u64, handle: Arc<dyn ProcessHandle>) {
        let registry = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let outcome = handle.wait().await;
            if let Some(inner) = registry.upgrade() {
                StreamRegistry { inner }.process_exited(&id, generation, &outcome);
            }
        });
    }

    /// Absorb the exit of a stream's process.
    ///
    /// A no-op unless the record still exists, is active, and belongs to the
    /// same launch.
    fn process_exited(&self, id: &StreamId, generation: u64, outcome: &ExitOutcome) {
        let mut streams = self.inner.streams.write();

        let Some(record) = streams.get_mut(id) else {
            debug!(stream_id = %id, outcome = %outcome, "Exit observed for removed stream");
            return;
        };
        if record.generation != generation || !record.is_active() {
            debug!(stream_id = %id, outcome = %outcome, "Exit observed for replaced stream");
            return;
        }

        if outcome.is_requested() {
            debug!(stream_id = %id, outcome = %outcome, "Stream process ended");
        } else {
            warn!(stream_id = %id, outcome = %outcome, "Stream process exited unexpectedly");
        }

        if self.inner.options.retain_exited {
            record.state = StreamState::Stopped;
            return;
        }

        streams.remove(id);
        if let Err(e) = remove_artifacts(&self.output_dir(id)) {
            warn!(stream_id = %id, error = %e, "Failed to remove stream artifacts");
        }
    }
}

fn kill(record: &StreamRecord) {
    match record.handle.kill() {
        Ok(()) => debug!(stream_id = %record.id, pid = ?record.handle.pid(), "Kill issued"),
        Err(KillError::AlreadyExited) => {
            debug!(stream_id = %record.id, "Process already exited");
        }
    }
}

/// Delete a stream's output directory. A missing directory is not an error.
fn remove_artifacts(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
