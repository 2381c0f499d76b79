use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tauri::{AppHandle, Emitter, State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::browse;
use crate::app::adb::discovery::{discover_devices, fetch_device_details};
use crate::app::adb::locator::{
    prepare_tool_program, resolve_tool_program, validate_tool_program,
};
use crate::app::adb::monitor::{start_device_monitor, DeviceMonitorHandle};
use crate::app::adb::paths::validate_device_path;
use crate::app::adb::reconnect::ReconnectionTracker;
use crate::app::adb::registry::DeviceRegistry;
use crate::app::adb::runner::run_tool;
use crate::app::adb::sync::{start_progress_reporter, sync_photos, ProgressReporterHandle};
use crate::app::config::{load_config, normalize_config_for_save, save_config, AppConfig};
use crate::app::error::AppError;
use crate::app::models::{
    CommandResponse, Device, FolderItem, MonitoringStatus, ReconnectionState, SyncProgress,
    SyncRequest, ToolInfo,
};
use crate::app::state::AppState;

#[cfg(test)]
mod tests;

pub const DEVICE_SNAPSHOT_EVENT: &str = "device-monitor-snapshot";
pub const SYNC_PROGRESS_EVENT: &str = "photo-sync-progress";

#[derive(Clone, serde::Serialize)]
pub struct DeviceSnapshotEvent {
    pub trace_id: String,
    pub devices: Vec<Device>,
}

#[derive(Clone, serde::Serialize)]
pub struct SyncProgressEvent {
    pub trace_id: String,
    pub progress: SyncProgress,
}

type SnapshotEmitter = Arc<dyn Fn(Vec<Device>) + Send + Sync>;

fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required"), trace_id));
    }
    Ok(())
}

fn command_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.tool.command_timeout_secs)
}

fn get_tool_program(config: &AppConfig, trace_id: &str) -> Result<String, AppError> {
    prepare_tool_program(&config.tool.command_path, trace_id)
}

// ---------------------------------------------------------------------------
// Monitoring

fn start_monitoring_inner(
    slot: &Mutex<Option<DeviceMonitorHandle>>,
    registry: Arc<DeviceRegistry>,
    reconnection: Arc<ReconnectionTracker>,
    interval: Duration,
    trace_id: &str,
    discover: impl Fn() -> Result<Vec<Device>, AppError> + Send + 'static,
    emitter: SnapshotEmitter,
) -> Result<(), AppError> {
    let mut guard = slot
        .lock()
        .map_err(|_| AppError::system("Monitor state locked", trace_id))?;
    // At most one loop: cancel any previous instance before starting.
    if let Some(previous) = guard.take() {
        previous.stop();
    }
    *guard = Some(start_device_monitor(
        registry,
        reconnection,
        interval,
        trace_id.to_string(),
        discover,
        emitter,
    ));
    Ok(())
}

fn stop_monitoring_inner(
    slot: &Mutex<Option<DeviceMonitorHandle>>,
    trace_id: &str,
) -> Result<(), AppError> {
    let handle = slot
        .lock()
        .map_err(|_| AppError::system("Monitor state locked", trace_id))?
        .take();
    // Stopping an idle monitor is a no-op.
    if let Some(handle) = handle {
        handle.stop();
    }
    Ok(())
}

fn snapshot_emitter(app: AppHandle, trace_id: String) -> SnapshotEmitter {
    Arc::new(move |devices| {
        let payload = DeviceSnapshotEvent {
            trace_id: trace_id.clone(),
            devices,
        };
        if let Err(err) = app.emit(DEVICE_SNAPSHOT_EVENT, payload) {
            warn!(trace_id = %trace_id, error = %err, "failed to emit device snapshot");
        }
    })
}

fn begin_monitoring(app: &AppHandle, state: &AppState, trace_id: &str) -> Result<(), AppError> {
    let config = load_config(trace_id)?;
    let program = get_tool_program(&config, trace_id)?;
    let timeout = command_timeout(&config);
    let interval = Duration::from_millis(config.monitor.poll_interval_ms);

    let discover_trace = trace_id.to_string();
    let discover = move || discover_devices(&program, timeout, &discover_trace);

    start_monitoring_inner(
        &state.monitor,
        Arc::clone(&state.registry),
        Arc::clone(&state.reconnection),
        interval,
        trace_id,
        discover,
        snapshot_emitter(app.clone(), trace_id.to_string()),
    )
}

// ---------------------------------------------------------------------------
// Photo sync session

/// Session bracket around the sync engine: suspend polling, run the progress
/// reporter for the duration of the sync, and on a disconnection-classified
/// failure arm the reconnection tracker with the partial count. The caller
/// restarts monitoring afterwards in every case.
fn execute_sync_session(
    state: &AppState,
    request: &SyncRequest,
    trace_id: &str,
    sync_fn: impl FnOnce() -> Result<u32, AppError>,
    start_reporter: impl FnOnce() -> ProgressReporterHandle,
) -> Result<u32, AppError> {
    stop_monitoring_inner(&state.monitor, trace_id)?;

    {
        let mut guard = state
            .progress_reporter
            .lock()
            .map_err(|_| AppError::system("Progress reporter state locked", trace_id))?;
        if let Some(previous) = guard.take() {
            previous.stop();
        }
        *guard = Some(start_reporter());
    }

    let result = sync_fn();

    if let Ok(mut guard) = state.progress_reporter.lock() {
        if let Some(reporter) = guard.take() {
            reporter.stop();
        }
    }

    match result {
        Ok(count) => {
            info!(trace_id = %trace_id, serial = %request.serial, count, "photo sync finished");
            Ok(count)
        }
        Err(err) => {
            if err.is_disconnection() {
                let partial = state.sync_progress.snapshot().current as u32;
                warn!(
                    trace_id = %trace_id,
                    serial = %request.serial,
                    partial,
                    "device disconnected during sync; arming reconnection"
                );
                state.reconnection.arm(request.clone(), partial);
            }
            Err(err)
        }
    }
}

fn run_sync_session(
    app: &AppHandle,
    state: &AppState,
    request: SyncRequest,
    trace_id: &str,
) -> Result<u32, AppError> {
    let config = load_config(trace_id)?;
    let program = get_tool_program(&config, trace_id)?;

    if state.sync_active.swap(true, Ordering::SeqCst) {
        return Err(AppError::validation(
            "A photo sync is already running",
            trace_id,
        ));
    }

    let progress = Arc::clone(&state.sync_progress);
    let progress_interval = Duration::from_millis(config.sync.progress_interval_ms);
    let event_app = app.clone();
    let event_trace = trace_id.to_string();
    let reporter_progress = Arc::clone(&state.sync_progress);

    let result = execute_sync_session(
        state,
        &request,
        trace_id,
        || {
            sync_photos(
                &program,
                &request.serial,
                &request.source_path,
                &request.destination_path,
                command_timeout(&config),
                Duration::from_secs(config.sync.pull_timeout_secs),
                &progress,
                trace_id,
            )
        },
        move || {
            start_progress_reporter(
                reporter_progress,
                progress_interval,
                Arc::new(move |snapshot| {
                    let payload = SyncProgressEvent {
                        trace_id: event_trace.clone(),
                        progress: snapshot,
                    };
                    if let Err(err) = event_app.emit(SYNC_PROGRESS_EVENT, payload) {
                        warn!(trace_id = %event_trace, error = %err, "failed to emit sync progress");
                    }
                }),
            )
        },
    );

    // Polling resumes whether the sync succeeded, failed, or armed the
    // reconnection tracker; the restarted poller is what observes the
    // device's return.
    if let Err(err) = begin_monitoring(app, state, trace_id) {
        warn!(trace_id = %trace_id, error = %err, "failed to restart monitoring after sync");
    }
    state.sync_active.store(false, Ordering::SeqCst);

    result
}

// ---------------------------------------------------------------------------
// Commands

#[tauri::command(async)]
pub fn get_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn save_app_config(
    config: AppConfig,
    trace_id: Option<String>,
) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(config);
    save_config(&config, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn reset_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(AppConfig::default());
    save_config(&config, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: config,
    })
}

#[tauri::command(async)]
pub fn check_tool(
    command_path: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ToolInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let program = resolve_tool_program(
        command_path
            .as_deref()
            .unwrap_or(&config.tool.command_path),
    );

    if let Err(message) = validate_tool_program(&program) {
        return Ok(CommandResponse {
            trace_id,
            data: ToolInfo {
                available: false,
                version_output: String::new(),
                command_path: program,
                error: Some(message),
            },
        });
    }

    let data = match run_tool(
        &program,
        &["version"],
        None,
        command_timeout(&config),
        &trace_id,
    ) {
        Ok(output) => ToolInfo {
            available: true,
            version_output: output,
            command_path: program,
            error: None,
        },
        Err(err) => ToolInfo {
            available: false,
            version_output: String::new(),
            command_path: program,
            error: Some(err.error),
        },
    };

    Ok(CommandResponse { trace_id, data })
}

/// Read the cached device list; never touches the external tool.
#[tauri::command(async)]
pub fn list_devices(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<Device>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.registry.snapshot(),
    })
}

/// On-demand detail enrichment for one device; blocks on the tool.
#[tauri::command(async)]
pub fn get_device_details(
    serial: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Device>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;

    let config = load_config(&trace_id)?;
    let program = get_tool_program(&config, &trace_id)?;
    let device = fetch_device_details(&program, &serial, command_timeout(&config), &trace_id);
    state.registry.update_device(&device);

    Ok(CommandResponse {
        trace_id,
        data: device,
    })
}

#[tauri::command(async)]
pub fn start_monitoring(
    app: AppHandle,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "start_monitoring");
    begin_monitoring(&app, &state, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: true,
    })
}

#[tauri::command(async)]
pub fn stop_monitoring(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "stop_monitoring");
    stop_monitoring_inner(&state.monitor, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: true,
    })
}

#[tauri::command(async)]
pub fn monitoring_status(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<MonitoringStatus>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let running = state
        .monitor
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false);
    Ok(CommandResponse {
        trace_id,
        data: MonitoringStatus {
            running,
            last_refresh_at: state.registry.last_refresh_at(),
        },
    })
}

#[tauri::command(async)]
pub fn list_folder_contents(
    serial: String,
    path: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<FolderItem>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    validate_device_path(&path).map_err(|message| AppError::validation(message, &trace_id))?;

    let config = load_config(&trace_id)?;
    let program = get_tool_program(&config, &trace_id)?;
    let items = browse::list_folder_contents(
        &program,
        &serial,
        &path,
        command_timeout(&config),
        &trace_id,
    )?;

    Ok(CommandResponse {
        trace_id,
        data: items,
    })
}

#[tauri::command(async)]
pub fn start_photo_sync(
    serial: String,
    source_path: String,
    destination_path: String,
    app: AppHandle,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<u32>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    ensure_non_empty(&destination_path, "destination_path", &trace_id)?;
    validate_device_path(&source_path)
        .map_err(|message| AppError::validation(message, &trace_id))?;

    info!(
        trace_id = %trace_id,
        serial = %serial,
        source = %source_path,
        "start_photo_sync"
    );

    let request = SyncRequest {
        serial,
        source_path,
        destination_path,
    };
    let count = run_sync_session(&app, &state, request, &trace_id)?;

    Ok(CommandResponse {
        trace_id,
        data: count,
    })
}

#[tauri::command(async)]
pub fn get_sync_progress(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<SyncProgress>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.sync_progress.snapshot(),
    })
}

#[tauri::command(async)]
pub fn get_reconnection_state(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ReconnectionState>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.reconnection.snapshot(),
    })
}

/// Re-run the interrupted sync with its original paths. Only valid once the
/// device's absence and return have both been observed.
#[tauri::command(async)]
pub fn resume_photo_sync(
    app: AppHandle,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<u32>, AppError> {
    let trace_id = resolve_trace_id(trace_id);

    let Some(request) = state.reconnection.take_resume_request() else {
        return Err(AppError::validation(
            "Device has not reconnected yet",
            &trace_id,
        ));
    };

    info!(
        trace_id = %trace_id,
        serial = %request.serial,
        "resume_photo_sync"
    );
    let count = run_sync_session(&app, &state, request, &trace_id)?;

    Ok(CommandResponse {
        trace_id,
        data: count,
    })
}

#[tauri::command(async)]
pub fn cancel_reconnection(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "cancel_reconnection");
    state.reconnection.cancel();
    Ok(CommandResponse {
        trace_id,
        data: true,
    })
}
