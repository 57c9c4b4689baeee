//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a [`StreamRegistry`] over a
//! [`FakeLauncher`] and a temporary stream directory. Fake processes never
//! run anything; tests end them explicitly with [`FakeHandle::exit`].

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::watch;

use streamgate::config::Config;
use streamgate::server::{create_router, AppContext};
use streamgate::streaming::{RegistryOptions, StreamRegistry};
use streamgate_av::{
    prepare_output_dir, ExitOutcome, KillError, LaunchError, LaunchRequest, Launched,
    ProcessHandle, ProcessLauncher,
};

/// Scripted stand-in for a conversion process.
#[derive(Debug)]
pub struct FakeHandle {
    pid: u32,
    exit: watch::Sender<Option<ExitOutcome>>,
}

impl FakeHandle {
    fn new(pid: u32) -> Self {
        Self {
            pid,
            exit: watch::channel(None).0,
        }
    }

    /// End the process with `outcome`. Returns false if it had already ended.
    pub fn exit(&self, outcome: ExitOutcome) -> bool {
        self.exit.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        })
    }

    pub fn is_killed(&self) -> bool {
        matches!(*self.exit.borrow(), Some(ExitOutcome::Killed))
    }
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn kill(&self) -> Result<(), KillError> {
        if self.exit(ExitOutcome::Killed) {
            Ok(())
        } else {
            Err(KillError::AlreadyExited)
        }
    }

    async fn wait(&self) -> ExitOutcome {
        let mut rx = self.exit.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(e) => Some(ExitOutcome::WaitFailed(e.to_string())),
        };
        outcome.unwrap_or(ExitOutcome::Killed)
    }
}

/// Launcher that records launches and hands out [`FakeHandle`]s.
///
/// Creates the output directory and an empty playlist the way ffmpeg would.
#[derive(Default)]
pub struct FakeLauncher {
    launches: AtomicUsize,
    next_pid: AtomicU32,
    fail_spawn: AtomicBool,
    handles: Mutex<Vec<(String, Arc<FakeHandle>)>>,
}

impl FakeLauncher {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Most recent handle launched for `id`.
    pub fn handle(&self, id: &str) -> Option<Arc<FakeHandle>> {
        self.handles
            .lock()
            .iter()
            .rev()
            .find(|(launched, _)| launched == id)
            .map(|(_, handle)| Arc::clone(handle))
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, request: &LaunchRequest<'_>) -> Result<Launched, LaunchError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        prepare_output_dir(request.output_dir)?;

        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(LaunchError::spawn(
                "ffmpeg",
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            ));
        }

        std::fs::write(request.output_dir.join("stream.m3u8"), "#EXTM3U\n")
            .map_err(|e| LaunchError::directory(request.output_dir, e))?;

        let pid = 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
        let handle = Arc::new(FakeHandle::new(pid));
        self.handles
            .lock()
            .push((request.id.to_string(), Arc::clone(&handle)));

        Ok(Launched {
            descriptor: format!("/streams/{}/stream.m3u8", request.id),
            handle,
        })
    }
}

/// Registry, launcher and config over a temporary stream directory.
pub struct TestHarness {
    pub dir: TempDir,
    pub config: Config,
    pub launcher: Arc<FakeLauncher>,
    pub registry: StreamRegistry,
}

impl TestHarness {
    /// Create a harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness, letting the caller adjust the configuration first.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.streams.dir = dir.path().join("streams");
        adjust(&mut config);

        let launcher = Arc::new(FakeLauncher::default());
        let registry = StreamRegistry::new(launcher.clone(), RegistryOptions::from(&config));

        Self {
            dir,
            config,
            launcher,
            registry,
        }
    }

    pub fn stream_dir(&self, id: &str) -> PathBuf {
        self.config.streams.dir.join(id)
    }

    pub fn router(&self) -> Router {
        create_router(AppContext::new(self.config.clone(), self.registry.clone()))
    }
}

/// Poll `condition` until it holds, yielding to background tasks in between.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
