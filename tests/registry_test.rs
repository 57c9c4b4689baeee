//! Stream registry lifecycle tests.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{eventually, TestHarness};
use streamgate::streaming::{start_sweep_task, StreamState, StreamStatus, SweepReport};
use streamgate_av::{ExitOutcome, LaunchError};
use streamgate_common::Error;

#[tokio::test]
async fn start_heartbeat_stop_lifecycle() {
    let h = TestHarness::new();

    let path = h.registry.start("cam1", "rtsp://10.0.0.5/live").unwrap();
    assert_eq!(path, "/streams/cam1/stream.m3u8");
    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);
    assert!(h.stream_dir("cam1").join("stream.m3u8").is_file());

    h.registry.heartbeat("cam1").unwrap();

    h.registry.stop("cam1").unwrap();
    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
    assert!(!h.stream_dir("cam1").exists());
    assert!(h.launcher.handle("cam1").unwrap().is_killed());

    assert_matches!(h.registry.stop("cam1"), Err(Error::NotFound(_)));
    assert_matches!(h.registry.heartbeat("cam1"), Err(Error::NotFound(_)));
}

#[tokio::test]
async fn unknown_stream_reports_not_found() {
    let h = TestHarness::new();

    assert_eq!(h.registry.status("nope"), StreamStatus::NotFound);
    assert_matches!(h.registry.heartbeat("nope"), Err(Error::NotFound(_)));
    assert_matches!(h.registry.stop("nope"), Err(Error::NotFound(_)));
    assert_eq!(h.registry.active_count(), 0);
}

#[tokio::test]
async fn second_start_reuses_running_stream() {
    let h = TestHarness::new();

    let first = h.registry.start("cam1", "rtsp://a/live").unwrap();
    let second = h.registry.start("cam1", "rtsp://other/live").unwrap();

    assert_eq!(first, second);
    assert_eq!(h.launcher.launches(), 1);
    assert_eq!(h.registry.active_count(), 1);

    // The original source is kept
    let streams = h.registry.list();
    assert_eq!(streams[0].source, "rtsp://a/live");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_launch_once() {
    let h = TestHarness::new();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = h.registry.clone();
            tokio::spawn(async move { registry.start("cam1", "rtsp://a/live") })
        })
        .collect();

    for task in tasks {
        let path = task.await.unwrap().unwrap();
        assert_eq!(path, "/streams/cam1/stream.m3u8");
    }

    assert_eq!(h.launcher.launches(), 1);
    assert_eq!(h.registry.active_count(), 1);
}

#[tokio::test]
async fn distinct_streams_are_independent() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.registry.start("cam2", "rtsp://b/live").unwrap();
    assert_eq!(h.registry.active_count(), 2);

    h.registry.stop("cam1").unwrap();
    assert_eq!(h.registry.status("cam2"), StreamStatus::Active);
    assert!(h.stream_dir("cam2").is_dir());
    assert!(!h.launcher.handle("cam2").unwrap().is_killed());
}

#[tokio::test]
async fn crashed_stream_is_removed() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    let handle = h.launcher.handle("cam1").unwrap();
    assert!(handle.exit(ExitOutcome::Exited { code: Some(1) }));

    assert!(eventually(|| h.registry.status("cam1") == StreamStatus::NotFound).await);
    assert!(!h.stream_dir("cam1").exists());
    assert_eq!(h.registry.active_count(), 0);

    // A later start launches a fresh process
    h.registry.start("cam1", "rtsp://a/live").unwrap();
    assert_eq!(h.launcher.launches(), 2);
    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);
}

#[tokio::test]
async fn retained_crash_is_stopped_until_swept() {
    let h = TestHarness::with_config(|c| c.streams.retain_exited = true);

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.launcher
        .handle("cam1")
        .unwrap()
        .exit(ExitOutcome::Exited { code: None });

    assert!(eventually(|| h.registry.status("cam1") == StreamStatus::Stopped).await);
    assert_matches!(h.registry.heartbeat("cam1"), Err(Error::Inactive(_)));
    assert_eq!(h.registry.active_count(), 0);
    assert_eq!(h.registry.list()[0].state, StreamState::Stopped);

    let report = h.registry.sweep();
    assert_eq!(report, SweepReport { examined: 1, evicted: 1 });
    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
    assert!(!h.stream_dir("cam1").exists());
}

#[tokio::test]
async fn start_replaces_stopped_record() {
    let h = TestHarness::with_config(|c| c.streams.retain_exited = true);

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.launcher
        .handle("cam1")
        .unwrap()
        .exit(ExitOutcome::Exited { code: Some(1) });
    assert!(eventually(|| h.registry.status("cam1") == StreamStatus::Stopped).await);

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    assert_eq!(h.launcher.launches(), 2);
    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);
    h.registry.heartbeat("cam1").unwrap();
}

#[tokio::test]
async fn stop_of_stopped_record_succeeds() {
    let h = TestHarness::with_config(|c| c.streams.retain_exited = true);

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.launcher
        .handle("cam1")
        .unwrap()
        .exit(ExitOutcome::Exited { code: Some(0) });
    assert!(eventually(|| h.registry.status("cam1") == StreamStatus::Stopped).await);

    h.registry.stop("cam1").unwrap();
    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
}

#[tokio::test]
async fn exit_of_replaced_launch_is_ignored() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    let old = h.launcher.handle("cam1").unwrap();

    // No await between stop and restart, so the old observer runs afterwards
    h.registry.stop("cam1").unwrap();
    h.registry.start("cam1", "rtsp://a/live").unwrap();
    assert!(old.is_killed());

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);
    assert!(h.stream_dir("cam1").is_dir());
    assert_eq!(h.launcher.launches(), 2);
}

#[tokio::test(start_paused = true)]
async fn sweep_evicts_only_idle_streams() {
    let h = TestHarness::new();

    h.registry.start("fresh", "rtsp://a/live").unwrap();
    h.registry.start("stale", "rtsp://b/live").unwrap();

    tokio::time::advance(Duration::from_secs(20)).await;
    h.registry.heartbeat("fresh").unwrap();
    tokio::time::advance(Duration::from_secs(15)).await;

    let report = h.registry.sweep();
    assert_eq!(report, SweepReport { examined: 2, evicted: 1 });

    assert_eq!(h.registry.status("fresh"), StreamStatus::Active);
    assert_eq!(h.registry.status("stale"), StreamStatus::NotFound);
    assert!(h.launcher.handle("stale").unwrap().is_killed());
    assert!(!h.stream_dir("stale").exists());
    assert!(h.stream_dir("fresh").is_dir());
}

#[tokio::test(start_paused = true)]
async fn start_of_running_stream_counts_as_heartbeat() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    tokio::time::advance(Duration::from_secs(25)).await;
    h.registry.start("cam1", "rtsp://a/live").unwrap();
    tokio::time::advance(Duration::from_secs(25)).await;

    assert_eq!(h.registry.sweep().evicted, 0);
    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn sweep_task_runs_on_interval() {
    let h = TestHarness::new();
    h.registry.start("cam1", "rtsp://a/live").unwrap();

    let task = start_sweep_task(h.registry.clone(), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(h.registry.status("cam1"), StreamStatus::Active);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
    assert!(h.launcher.handle("cam1").unwrap().is_killed());

    task.abort();
}

#[tokio::test]
async fn sweep_on_empty_registry() {
    let h = TestHarness::new();
    assert_eq!(h.registry.sweep(), SweepReport::default());
}

#[tokio::test]
async fn spawn_failure_leaves_registry_unchanged() {
    let h = TestHarness::new();
    h.launcher.set_fail_spawn(true);

    let err = h.registry.start("cam1", "rtsp://a/live").unwrap_err();
    assert_matches!(err, Error::Launch(LaunchError::SpawnFailed { .. }));
    assert_eq!(err.http_status(), 502);

    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
    assert_eq!(h.registry.active_count(), 0);
    assert!(!h.stream_dir("cam1").exists());
}

#[tokio::test]
async fn unusable_stream_directory_is_reported() {
    let h = TestHarness::new();
    // A regular file where the base directory should be
    std::fs::write(&h.config.streams.dir, b"").unwrap();

    let err = h.registry.start("cam1", "rtsp://a/live").unwrap_err();
    assert_matches!(err, Error::Launch(LaunchError::DirectoryUnavailable { .. }));
    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
}

#[tokio::test]
async fn invalid_ids_are_rejected() {
    let h = TestHarness::new();

    for id in ["", "../escape", "a/b", ".hidden"] {
        assert_matches!(
            h.registry.start(id, "rtsp://a/live"),
            Err(Error::InvalidId(_)),
            "id {:?} should be rejected",
            id
        );
    }
    assert_eq!(h.launcher.launches(), 0);
}

#[tokio::test]
async fn list_is_sorted_by_id() {
    let h = TestHarness::new();

    for id in ["cam3", "cam1", "cam2"] {
        h.registry.start(id, "rtsp://a/live").unwrap();
    }

    let ids: Vec<String> = h
        .registry
        .list()
        .into_iter()
        .map(|info| info.id.to_string())
        .collect();
    assert_eq!(ids, ["cam1", "cam2", "cam3"]);
    assert!(h.registry.list().iter().all(|info| info.pid.is_some()));
}

#[tokio::test]
async fn stop_all_kills_everything() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.registry.start("cam2", "rtsp://b/live").unwrap();

    assert_eq!(h.registry.stop_all(), 2);
    assert!(h.launcher.handle("cam1").unwrap().is_killed());
    assert!(h.launcher.handle("cam2").unwrap().is_killed());
    assert!(!h.stream_dir("cam1").exists());
    assert!(h.registry.list().is_empty());
}

#[tokio::test]
async fn stop_after_unobserved_exit_succeeds() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    let handle = h.launcher.handle("cam1").unwrap();

    // No await between exit and stop, so the exit observer has not run yet
    assert!(handle.exit(ExitOutcome::Exited { code: Some(1) }));
    h.registry.stop("cam1").unwrap();

    assert_eq!(h.registry.status("cam1"), StreamStatus::NotFound);
    assert!(!h.stream_dir("cam1").exists());
    assert!(!handle.is_killed());
}

#[tokio::test(start_paused = true)]
async fn sweep_continues_past_exited_process() {
    let h = TestHarness::new();

    h.registry.start("cam1", "rtsp://a/live").unwrap();
    h.registry.start("cam2", "rtsp://b/live").unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;

    // cam1's kill will report it already exited; the observer has not run yet
    h.launcher
        .handle("cam1")
        .unwrap()
        .exit(ExitOutcome::Exited { code: Some(1) });

    let report = h.registry.sweep();
    assert_eq!(report, SweepReport { examined: 2, evicted: 2 });
    assert!(h.launcher.handle("cam2").unwrap().is_killed());
    assert!(!h.stream_dir("cam1").exists());
    assert!(!h.stream_dir("cam2").exists());
    assert_eq!(h.registry.active_count(), 0);
}
