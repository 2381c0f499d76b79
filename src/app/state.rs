use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::app::adb::monitor::DeviceMonitorHandle;
use crate::app::adb::reconnect::ReconnectionTracker;
use crate::app::adb::registry::DeviceRegistry;
use crate::app::adb::sync::{ProgressReporterHandle, SyncProgressState};

pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub sync_progress: Arc<SyncProgressState>,
    pub reconnection: Arc<ReconnectionTracker>,
    pub monitor: Mutex<Option<DeviceMonitorHandle>>,
    pub progress_reporter: Mutex<Option<ProgressReporterHandle>>,
    /// Coarse guard keeping the sync engine and the poller mutually
    /// exclusive in time, and rejecting a second concurrent sync.
    pub sync_active: AtomicBool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(DeviceRegistry::new()),
            sync_progress: Arc::new(SyncProgressState::new()),
            reconnection: Arc::new(ReconnectionTracker::new()),
            monitor: Mutex::new(None),
            progress_reporter: Mutex::new(None),
            sync_active: AtomicBool::new(false),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
