use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::warn;

use crate::app::adb::reconnect::ReconnectionTracker;
use crate::app::adb::registry::DeviceRegistry;
use crate::app::error::AppError;
use crate::app::models::Device;

pub struct DeviceMonitorHandle {
    stop_flag: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl DeviceMonitorHandle {
    pub fn stop(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let _ = self.join.join();
    }
}

/// Start the discovery poll loop. Each cycle runs `discover`, replaces the
/// registry snapshot, feeds the reconnection tracker, and republishes the
/// merged snapshot. Discovery failures are logged and skipped; a single
/// hiccup must not stop monitoring. The owner is responsible for keeping at
/// most one handle alive (start replaces any previous loop).
pub fn start_device_monitor(
    registry: Arc<DeviceRegistry>,
    reconnection: Arc<ReconnectionTracker>,
    interval: Duration,
    trace_id: String,
    discover: impl Fn() -> Result<Vec<Device>, AppError> + Send + 'static,
    emitter: Arc<dyn Fn(Vec<Device>) + Send + Sync>,
) -> DeviceMonitorHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_thread = Arc::clone(&stop_flag);

    let join = thread::spawn(move || {
        while !stop_thread.load(Ordering::Relaxed) {
            match discover() {
                Ok(devices) => {
                    registry.replace(devices);
                    // Publish the post-merge view so consumers and the
                    // reconnection tracker see what listDevices would return.
                    let snapshot = registry.snapshot();
                    reconnection.observe_snapshot(&snapshot);
                    emitter(snapshot);
                }
                Err(err) => {
                    warn!(
                        trace_id = %trace_id,
                        error = %err,
                        "device discovery failed; keeping previous snapshot"
                    );
                }
            }
            sleep_with_stop(interval, &stop_thread);
        }
    });

    DeviceMonitorHandle { stop_flag, join }
}

/// Sleep in short slices so a stop request does not wait out the full
/// interval.
pub(crate) fn sleep_with_stop(interval: Duration, stop_flag: &AtomicBool) {
    let slice = Duration::from_millis(50);
    let mut remaining = interval;
    while remaining > Duration::ZERO && !stop_flag.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
