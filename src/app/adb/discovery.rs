use std::time::Duration;

use tracing::debug;

use crate::app::adb::parse::{parse_battery_level, parse_devices_output};
use crate::app::adb::runner::run_tool;
use crate::app::error::AppError;
use crate::app::models::Device;

/// List attached devices and enrich every connected one with its detail
/// properties. Discovery itself can fail (tool missing, non-zero exit);
/// enrichment cannot — failing properties are simply left unset.
pub fn discover_devices(
    program: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<Vec<Device>, AppError> {
    let output = run_tool(program, &["devices"], None, timeout, trace_id)?;
    let devices = parse_devices_output(&output)
        .into_iter()
        .map(|device| {
            if device.state.is_connected() {
                fetch_device_details(program, &device.id, timeout, trace_id)
            } else {
                device
            }
        })
        .collect();
    Ok(devices)
}

/// Read the five detail properties for one connected device. Each property
/// is attempted independently so that a single flaky read never hides an
/// otherwise-reachable device.
pub fn fetch_device_details(
    program: &str,
    serial: &str,
    timeout: Duration,
    trace_id: &str,
) -> Device {
    let mut device = Device::new(serial, "device");

    // Vendors that publish a marketing name put the useful label there;
    // fall back to the plain model property.
    device.model = read_property(program, serial, "ro.product.marketname", timeout, trace_id)
        .or_else(|| read_property(program, serial, "ro.product.model", timeout, trace_id));
    device.manufacturer =
        read_property(program, serial, "ro.product.manufacturer", timeout, trace_id);
    device.os_version =
        read_property(program, serial, "ro.build.version.release", timeout, trace_id);
    device.api_level = read_property(program, serial, "ro.build.version.sdk", timeout, trace_id);

    device.battery_level = match run_tool(
        program,
        &["shell", "dumpsys", "battery"],
        Some(serial),
        timeout,
        trace_id,
    ) {
        Ok(output) => parse_battery_level(&output),
        Err(err) => {
            debug!(trace_id = %trace_id, serial = %serial, error = %err, "battery read failed");
            None
        }
    };

    device
}

fn read_property(
    program: &str,
    serial: &str,
    key: &str,
    timeout: Duration,
    trace_id: &str,
) -> Option<String> {
    match run_tool(
        program,
        &["shell", "getprop", key],
        Some(serial),
        timeout,
        trace_id,
    ) {
        Ok(value) => Some(value).filter(|value| !value.is_empty()),
        Err(err) => {
            debug!(trace_id = %trace_id, serial = %serial, property = %key, error = %err, "property read failed");
            None
        }
    }
}
