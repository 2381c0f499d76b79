use std::sync::Mutex;

use chrono::Utc;

use crate::app::models::Device;

struct RegistryInner {
    devices: Vec<Device>,
    last_refresh_at: Option<String>,
}

/// Most recently observed device list. Writers replace the whole snapshot;
/// readers always see a complete old or complete new list, never a mix. The
/// lock is scoped to read/replace only and is never held across a tool call.
pub struct DeviceRegistry {
    inner: Mutex<RegistryInner>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                devices: Vec::new(),
                last_refresh_at: None,
            }),
        }
    }

    /// Replace the cached snapshot with a fresh discovery result, carrying
    /// previously fetched detail fields forward by id.
    pub fn replace(&self, fresh: Vec<Device>) {
        let mut guard = self.inner.lock().expect("device registry lock poisoned");
        guard.devices = merge_snapshots(&guard.devices, fresh);
        guard.last_refresh_at = Some(Utc::now().to_rfc3339());
    }

    pub fn snapshot(&self) -> Vec<Device> {
        let guard = self.inner.lock().expect("device registry lock poisoned");
        guard.devices.clone()
    }

    pub fn last_refresh_at(&self) -> Option<String> {
        let guard = self.inner.lock().expect("device registry lock poisoned");
        guard.last_refresh_at.clone()
    }

    /// Patch a single device in place after an on-demand detail fetch, keyed
    /// by id. A device that vanished between fetch and patch is ignored.
    pub fn update_device(&self, updated: &Device) {
        let mut guard = self.inner.lock().expect("device registry lock poisoned");
        if let Some(slot) = guard
            .devices
            .iter_mut()
            .find(|device| device.id == updated.id)
        {
            *slot = updated.clone();
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Detail fields cost five tool calls per device; a fresh snapshot that
/// lacks them inherits the previous poll's values for a still-connected id.
fn merge_snapshots(previous: &[Device], fresh: Vec<Device>) -> Vec<Device> {
    fresh
        .into_iter()
        .map(|mut device| {
            if device.state.is_connected() && !device.has_details() {
                if let Some(known) = previous.iter().find(|prev| prev.id == device.id) {
                    device.model = known.model.clone();
                    device.manufacturer = known.manufacturer.clone();
                    device.os_version = known.os_version.clone();
                    device.api_level = known.api_level.clone();
                    device.battery_level = known.battery_level.clone();
                }
            }
            device
        })
        .collect()
}
