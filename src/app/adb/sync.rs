use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use regex::Regex;
use tracing::info;

use crate::app::adb::browse::list_photo_files;
use crate::app::adb::monitor::sleep_with_stop;
use crate::app::adb::paths::join_device_path;
use crate::app::adb::runner::run_command_with_timeout;
use crate::app::error::AppError;
use crate::app::models::SyncProgress;

/// Shared latest-value progress snapshot, written by the sync engine and
/// read by the reporter loop and the `get_sync_progress` command.
pub struct SyncProgressState {
    inner: Mutex<SyncProgress>,
}

impl SyncProgressState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SyncProgress::default()),
        }
    }

    pub fn reset(&self) {
        self.update(0, 0, "");
    }

    pub fn update(&self, current: usize, total: usize, current_file: &str) {
        let mut guard = self.inner.lock().expect("sync progress lock poisoned");
        guard.current = current;
        guard.total = total;
        guard.current_file = current_file.to_string();
    }

    pub fn snapshot(&self) -> SyncProgress {
        self.inner
            .lock()
            .expect("sync progress lock poisoned")
            .clone()
    }
}

impl Default for SyncProgressState {
    fn default() -> Self {
        Self::new()
    }
}

fn disconnect_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)device offline|device .*not found|no devices|disconnected|connect failed|closed|failed to pull",
        )
        .expect("disconnect pattern is valid")
    })
}

/// Classify tool error text as a device-disconnection. Locale/version
/// fragile by nature; adb offers no structured signal for this, so phrase
/// matching is the only option.
pub fn is_disconnect_message(text: &str) -> bool {
    disconnect_pattern().is_match(text)
}

/// Pull every photo under `source_path` on the device into
/// `destination_path`, skipping files that already exist locally. Returns
/// the number of files actually transferred; skips do not count. On failure
/// the progress snapshot keeps the partial count for the caller to report.
pub fn sync_photos(
    program: &str,
    serial: &str,
    source_path: &str,
    destination_path: &str,
    command_timeout: Duration,
    pull_timeout: Duration,
    progress: &SyncProgressState,
    trace_id: &str,
) -> Result<u32, AppError> {
    progress.reset();

    let files = list_photo_files(program, serial, source_path, command_timeout, trace_id)?;
    info!(trace_id = %trace_id, serial = %serial, count = files.len(), "photo enumeration complete");

    sync_photo_files(files, destination_path, progress, trace_id, |file_name, local_dir| {
        pull_photo(
            program,
            serial,
            source_path,
            file_name,
            local_dir,
            pull_timeout,
            trace_id,
        )
    })
}

/// Transfer loop, parameterized over the pull operation so the skip and
/// partial-count semantics are testable without a device.
fn sync_photo_files(
    files: Vec<String>,
    destination_path: &str,
    progress: &SyncProgressState,
    trace_id: &str,
    mut pull: impl FnMut(&str, &Path) -> Result<(), AppError>,
) -> Result<u32, AppError> {
    if files.is_empty() {
        return Err(AppError::no_photos(
            "No photos found in this folder. Pick a folder that contains images.",
            trace_id,
        ));
    }

    let destination = Path::new(destination_path);
    fs::create_dir_all(destination).map_err(|err| {
        AppError::system(
            format!("Failed to create destination directory: {err}"),
            trace_id,
        )
    })?;

    // Pulls land in a hidden staging directory and are renamed into place on
    // success; an interrupted transfer can never leave a half-written file
    // that the skip check would later mistake for a finished one.
    let staging = tempfile::Builder::new()
        .prefix(".photoferry-staging-")
        .tempdir_in(destination)
        .map_err(|err| {
            AppError::system(format!("Failed to create staging directory: {err}"), trace_id)
        })?;

    let total = files.len();
    progress.update(0, total, "");

    let mut processed = 0usize;
    let mut synced: u32 = 0;

    for file_name in &files {
        processed += 1;
        let final_path = destination.join(file_name);

        if final_path.exists() {
            progress.update(processed, total, &format!("Skipped: {file_name}"));
            continue;
        }

        progress.update(processed, total, &format!("Syncing: {file_name}"));
        if let Err(err) = pull(file_name, staging.path()) {
            progress.update(synced as usize, total, "");
            return Err(err);
        }

        let staged_path = staging.path().join(file_name);
        if let Err(err) = fs::rename(&staged_path, &final_path) {
            progress.update(synced as usize, total, "");
            return Err(AppError::system(
                format!("Failed to move {file_name} into destination: {err}"),
                trace_id,
            ));
        }

        synced += 1;
        progress.update(processed, total, &format!("Completed: {file_name}"));
    }

    info!(trace_id = %trace_id, synced, processed, "photo sync complete");
    Ok(synced)
}

fn pull_photo(
    program: &str,
    serial: &str,
    source_path: &str,
    file_name: &str,
    local_dir: &Path,
    timeout: Duration,
    trace_id: &str,
) -> Result<(), AppError> {
    let remote_path = join_device_path(source_path, file_name);
    let args = vec![
        "-s".to_string(),
        serial.to_string(),
        "pull".to_string(),
        remote_path,
        local_dir.to_string_lossy().to_string(),
    ];

    let output = run_command_with_timeout(program, &args, timeout, trace_id)?;
    if output.exit_code.unwrap_or_default() != 0 {
        let detail = output.stderr.trim();
        if is_disconnect_message(detail) {
            return Err(AppError::device_disconnected(
                format!("Device disconnected while pulling {file_name}: {detail}"),
                trace_id,
            ));
        }
        return Err(AppError::transfer_failed(file_name, detail, trace_id));
    }
    Ok(())
}

pub struct ProgressReporterHandle {
    stop_flag: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl ProgressReporterHandle {
    pub fn stop(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let _ = self.join.join();
    }
}

/// Republish the progress snapshot on a short cadence while a sync runs.
/// Cancellation takes effect at the next iteration boundary.
pub fn start_progress_reporter(
    progress: Arc<SyncProgressState>,
    interval: Duration,
    emitter: Arc<dyn Fn(SyncProgress) + Send + Sync>,
) -> ProgressReporterHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_thread = Arc::clone(&stop_flag);

    let join = thread::spawn(move || {
        while !stop_thread.load(Ordering::Relaxed) {
            emitter(progress.snapshot());
            sleep_with_stop(interval, &stop_thread);
        }
    });

    ProgressReporterHandle { stop_flag, join }
}
