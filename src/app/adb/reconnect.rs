use std::sync::Mutex;

use crate::app::models::{Device, ReconnectionState, SyncRequest};

struct TrackerInner {
    state: ReconnectionState,
    pending_request: Option<SyncRequest>,
}

/// Tracks one reconnection episode: a disconnection-classified sync failure
/// arms the tracker, subsequent poll snapshots drive it through
/// confirmed-gone and back to ready-to-resume. A device that never leaves
/// the list must not produce resume-readiness; absence has to be observed
/// before a reappearance counts.
pub struct ReconnectionTracker {
    inner: Mutex<TrackerInner>,
}

impl ReconnectionTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                state: ReconnectionState::default(),
                pending_request: None,
            }),
        }
    }

    /// Begin an episode for the interrupted sync. A partial count of zero is
    /// reported as absent rather than "0 synced".
    pub fn arm(&self, request: SyncRequest, partial_count: u32) {
        let mut guard = self.inner.lock().expect("reconnection lock poisoned");
        guard.state = ReconnectionState {
            needs_reconnection: true,
            is_reconnecting: true,
            device_confirmed_gone: false,
            device_reconnected: false,
            partial_sync_count: (partial_count > 0).then_some(partial_count),
            disconnected_device_id: Some(request.serial.clone()),
        };
        guard.pending_request = Some(request);
    }

    /// Feed a fresh poll snapshot into the episode, if one is active.
    pub fn observe_snapshot(&self, devices: &[Device]) {
        let mut guard = self.inner.lock().expect("reconnection lock poisoned");
        if !guard.state.is_reconnecting {
            return;
        }
        let Some(id) = guard.state.disconnected_device_id.clone() else {
            return;
        };

        let present = devices
            .iter()
            .any(|device| device.id == id && device.state.is_connected());

        if !present {
            guard.state.device_confirmed_gone = true;
        } else if guard.state.device_confirmed_gone {
            guard.state.device_reconnected = true;
            guard.state.is_reconnecting = false;
        }
    }

    pub fn snapshot(&self) -> ReconnectionState {
        self.inner
            .lock()
            .expect("reconnection lock poisoned")
            .state
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .lock()
            .expect("reconnection lock poisoned")
            .state
            .needs_reconnection
    }

    /// Consume the stored request once the device is back. Clears the
    /// episode; the resumed sync runs its own lifecycle from scratch.
    pub fn take_resume_request(&self) -> Option<SyncRequest> {
        let mut guard = self.inner.lock().expect("reconnection lock poisoned");
        if !guard.state.device_reconnected {
            return None;
        }
        let request = guard.pending_request.take();
        guard.state = ReconnectionState::default();
        request
    }

    /// Abandon the episode without resuming. Safe to call in any state.
    pub fn cancel(&self) {
        let mut guard = self.inner.lock().expect("reconnection lock poisoned");
        guard.state = ReconnectionState::default();
        guard.pending_request = None;
    }
}

impl Default for ReconnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SyncRequest {
        SyncRequest {
            serial: "ABC123".to_string(),
            source_path: "/sdcard/DCIM/Camera".to_string(),
            destination_path: "/home/user/Pictures/phone".to_string(),
        }
    }

    fn connected(id: &str) -> Device {
        Device::new(id, "device")
    }

    #[test]
    fn arming_records_episode_fields() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 3);

        let state = tracker.snapshot();
        assert!(state.needs_reconnection);
        assert!(state.is_reconnecting);
        assert!(!state.device_confirmed_gone);
        assert!(!state.device_reconnected);
        assert_eq!(state.partial_sync_count, Some(3));
        assert_eq!(state.disconnected_device_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn zero_partial_count_is_reported_as_absent() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 0);
        assert_eq!(tracker.snapshot().partial_sync_count, None);
    }

    #[test]
    fn full_cycle_reaches_ready_to_resume() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 1);

        // Device vanishes from the list.
        tracker.observe_snapshot(&[connected("OTHER")]);
        assert!(tracker.snapshot().device_confirmed_gone);
        assert!(!tracker.snapshot().device_reconnected);

        // And comes back.
        tracker.observe_snapshot(&[connected("OTHER"), connected("ABC123")]);
        let state = tracker.snapshot();
        assert!(state.device_reconnected);
        assert!(!state.is_reconnecting);
        assert!(state.needs_reconnection);
    }

    #[test]
    fn device_that_never_disappears_is_not_a_reconnect() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 1);

        // The device still looks present on every poll (e.g. a transient
        // hiccup) — resume-readiness must not trigger.
        for _ in 0..5 {
            tracker.observe_snapshot(&[connected("ABC123")]);
        }
        let state = tracker.snapshot();
        assert!(!state.device_confirmed_gone);
        assert!(!state.device_reconnected);
        assert!(state.is_reconnecting);
    }

    #[test]
    fn offline_reappearance_does_not_count_as_presence() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 1);

        tracker.observe_snapshot(&[]);
        assert!(tracker.snapshot().device_confirmed_gone);

        // Listed again but not in the connected state: still gone.
        tracker.observe_snapshot(&[Device::new("ABC123", "offline")]);
        assert!(!tracker.snapshot().device_reconnected);

        tracker.observe_snapshot(&[connected("ABC123")]);
        assert!(tracker.snapshot().device_reconnected);
    }

    #[test]
    fn take_resume_request_is_gated_and_single_shot() {
        let tracker = ReconnectionTracker::new();
        tracker.arm(request(), 2);

        // Not ready yet.
        assert!(tracker.take_resume_request().is_none());

        tracker.observe_snapshot(&[]);
        tracker.observe_snapshot(&[connected("ABC123")]);

        let taken = tracker.take_resume_request().expect("resume request");
        assert_eq!(taken, request());
        assert_eq!(tracker.snapshot(), ReconnectionState::default());

        // A second take finds nothing.
        assert!(tracker.take_resume_request().is_none());
    }

    #[test]
    fn cancel_returns_to_normal_from_any_state() {
        let tracker = ReconnectionTracker::new();

        // From awaiting-confirmation.
        tracker.arm(request(), 1);
        tracker.cancel();
        assert_eq!(tracker.snapshot(), ReconnectionState::default());

        // From confirmed-gone.
        tracker.arm(request(), 1);
        tracker.observe_snapshot(&[]);
        tracker.cancel();
        assert_eq!(tracker.snapshot(), ReconnectionState::default());

        // From ready-to-resume.
        tracker.arm(request(), 1);
        tracker.observe_snapshot(&[]);
        tracker.observe_snapshot(&[connected("ABC123")]);
        tracker.cancel();
        assert_eq!(tracker.snapshot(), ReconnectionState::default());
        assert!(tracker.take_resume_request().is_none());

        // Cancelling when already Normal is a no-op.
        tracker.cancel();
        assert_eq!(tracker.snapshot(), ReconnectionState::default());
    }

    #[test]
    fn observe_without_active_episode_is_ignored() {
        let tracker = ReconnectionTracker::new();
        tracker.observe_snapshot(&[connected("ABC123")]);
        assert_eq!(tracker.snapshot(), ReconnectionState::default());
    }
}
