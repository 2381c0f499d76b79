use super::*;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering as AtomicOrdering;

use crate::app::adb::sync::SyncProgressState;
use crate::app::error::codes;

fn sample_request() -> SyncRequest {
    SyncRequest {
        serial: "ABC123".to_string(),
        source_path: "/sdcard/DCIM/Camera".to_string(),
        destination_path: "/tmp/photoferry-test".to_string(),
    }
}

fn noop_reporter(progress: Arc<SyncProgressState>) -> ProgressReporterHandle {
    start_progress_reporter(progress, Duration::from_millis(10), Arc::new(|_snapshot| {}))
}

#[test]
fn resolve_trace_id_keeps_caller_value() {
    assert_eq!(
        resolve_trace_id(Some("trace-keep".to_string())),
        "trace-keep"
    );
    assert!(!resolve_trace_id(Some("  ".to_string())).trim().is_empty());
    assert!(!resolve_trace_id(None).is_empty());
}

#[test]
fn ensure_non_empty_rejects_blank_values() {
    let err = ensure_non_empty(" ", "serial", "trace-1").expect_err("expected error");
    assert_eq!(err.code, codes::VALIDATION);
    assert_eq!(err.trace_id, "trace-1");
    assert!(ensure_non_empty("ABC123", "serial", "trace-1").is_ok());
}

#[test]
fn stop_monitoring_is_idempotent() {
    let state = AppState::new();

    // Never started: both calls are no-ops.
    stop_monitoring_inner(&state.monitor, "trace-2").expect("first stop");
    stop_monitoring_inner(&state.monitor, "trace-2").expect("second stop");
    assert!(state.monitor.lock().expect("slot").is_none());
}

#[test]
fn start_monitoring_replaces_the_previous_loop() {
    let state = AppState::new();

    let first_calls = Arc::new(AtomicUsize::new(0));
    let first_counter = Arc::clone(&first_calls);
    start_monitoring_inner(
        &state.monitor,
        Arc::clone(&state.registry),
        Arc::clone(&state.reconnection),
        Duration::from_millis(20),
        "trace-3",
        move || {
            first_counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Vec::new())
        },
        Arc::new(|_devices| {}),
    )
    .expect("start first");

    std::thread::sleep(Duration::from_millis(60));

    let second_calls = Arc::new(AtomicUsize::new(0));
    let second_counter = Arc::clone(&second_calls);
    start_monitoring_inner(
        &state.monitor,
        Arc::clone(&state.registry),
        Arc::clone(&state.reconnection),
        Duration::from_millis(20),
        "trace-3",
        move || {
            second_counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Vec::new())
        },
        Arc::new(|_devices| {}),
    )
    .expect("start second");

    // The first loop is cancelled by the replacement; its counter freezes.
    let frozen = first_calls.load(AtomicOrdering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(first_calls.load(AtomicOrdering::SeqCst), frozen);
    assert!(second_calls.load(AtomicOrdering::SeqCst) >= 2);

    stop_monitoring_inner(&state.monitor, "trace-3").expect("stop");
}

#[test]
fn sync_session_returns_count_and_tears_down_reporter() {
    let state = AppState::new();
    let request = sample_request();

    let count = execute_sync_session(
        &state,
        &request,
        "trace-4",
        || {
            state.sync_progress.update(2, 2, "Completed: B.jpg");
            Ok(1)
        },
        || noop_reporter(Arc::clone(&state.sync_progress)),
    )
    .expect("sync session");

    assert_eq!(count, 1);
    assert!(state.progress_reporter.lock().expect("slot").is_none());
    assert!(state.monitor.lock().expect("slot").is_none());
    assert!(!state.reconnection.is_active());
}

#[test]
fn disconnection_arms_reconnection_with_partial_count() {
    let state = AppState::new();
    let request = sample_request();

    let err = execute_sync_session(
        &state,
        &request,
        "trace-5",
        || {
            state.sync_progress.update(1, 3, "");
            Err(AppError::device_disconnected(
                "adb: error: device offline",
                "trace-5",
            ))
        },
        || noop_reporter(Arc::clone(&state.sync_progress)),
    )
    .expect_err("expected disconnection");

    assert_eq!(err.code, codes::DEVICE_DISCONNECTED);
    let reconnection = state.reconnection.snapshot();
    assert!(reconnection.needs_reconnection);
    assert!(reconnection.is_reconnecting);
    assert_eq!(reconnection.partial_sync_count, Some(1));
    assert_eq!(
        reconnection.disconnected_device_id.as_deref(),
        Some("ABC123")
    );
    assert!(state.progress_reporter.lock().expect("slot").is_none());
}

#[test]
fn generic_failure_does_not_arm_reconnection() {
    let state = AppState::new();
    let request = sample_request();

    let err = execute_sync_session(
        &state,
        &request,
        "trace-6",
        || {
            Err(AppError::transfer_failed(
                "A.jpg",
                "read-only filesystem",
                "trace-6",
            ))
        },
        || noop_reporter(Arc::clone(&state.sync_progress)),
    )
    .expect_err("expected transfer failure");

    assert_eq!(err.code, codes::TRANSFER_FAILED);
    assert!(!state.reconnection.is_active());
}

#[test]
fn sync_session_stops_an_active_monitor_first() {
    let state = AppState::new();
    let request = sample_request();

    let poll_calls = Arc::new(AtomicUsize::new(0));
    let poll_counter = Arc::clone(&poll_calls);
    start_monitoring_inner(
        &state.monitor,
        Arc::clone(&state.registry),
        Arc::clone(&state.reconnection),
        Duration::from_millis(20),
        "trace-7",
        move || {
            poll_counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Vec::new())
        },
        Arc::new(|_devices| {}),
    )
    .expect("start monitor");

    execute_sync_session(
        &state,
        &request,
        "trace-7",
        || {
            // The poller must be quiescent while the engine owns the device.
            assert!(state.monitor.lock().expect("slot").is_none());
            let frozen = poll_calls.load(AtomicOrdering::SeqCst);
            std::thread::sleep(Duration::from_millis(80));
            assert_eq!(poll_calls.load(AtomicOrdering::SeqCst), frozen);
            Ok(0)
        },
        || noop_reporter(Arc::clone(&state.sync_progress)),
    )
    .expect("sync session");
}

#[test]
fn resume_gating_requires_full_absence_presence_cycle() {
    let state = AppState::new();
    state.reconnection.arm(sample_request(), 2);

    // Device still present on every observation: no resume request yet.
    state
        .reconnection
        .observe_snapshot(&[Device::new("ABC123", "device")]);
    assert!(state.reconnection.take_resume_request().is_none());

    state.reconnection.observe_snapshot(&[]);
    state
        .reconnection
        .observe_snapshot(&[Device::new("ABC123", "device")]);

    let request = state
        .reconnection
        .take_resume_request()
        .expect("resume request");
    assert_eq!(request, sample_request());
    assert_eq!(state.reconnection.snapshot(), ReconnectionState::default());
}
