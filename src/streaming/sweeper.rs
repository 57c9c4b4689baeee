//! Periodic eviction of idle and dead streams.

use std::time::Duration;

use super::StreamRegistry;

/// Start a background task that sweeps the registry on a fixed interval.
///
/// # Arguments
/// * `registry` - The registry to sweep.
/// * `interval` - Time between sweeps (default configuration: 10 seconds).
///
/// # Returns
/// A join handle for the background task.
pub fn start_sweep_task(registry: StreamRegistry, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = registry.sweep();
            tracing::trace!(
                examined = report.examined,
                evicted = report.evicted,
                "Sweep tick"
            );
        }
    })
}
