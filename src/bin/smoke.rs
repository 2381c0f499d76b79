use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use photoferry_lib::app::adb::browse::list_folder_contents;
use photoferry_lib::app::adb::discovery::discover_devices;
use photoferry_lib::app::adb::locator::prepare_tool_program;
use photoferry_lib::app::adb::runner::run_tool;
use photoferry_lib::app::adb::sync::{sync_photos, SyncProgressState};
use photoferry_lib::app::config::load_config;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Args {
    serial: Option<String>,
    out_dir: Option<PathBuf>,
    json: bool,
    browse_path: String,
    sync_source: Option<String>,
    sync_dest: Option<String>,
}

#[derive(Serialize)]
struct SmokeSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    serial: Option<String>,
    tool_program: Option<String>,
    out_dir: String,
    artifacts: HashMap<String, String>,
    checks: Vec<SmokeCheck>,
}

#[derive(Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: &'static str, // pass|fail|skip
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut serial = std::env::var("ANDROID_SERIAL")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let mut out_dir: Option<PathBuf> = None;
    let mut json = false;
    let mut browse_path = "/sdcard/DCIM".to_string();
    let mut sync_source: Option<String> = None;
    let mut sync_dest: Option<String> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--serial" => {
                serial = it
                    .next()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                if serial.is_none() {
                    return Err("--serial requires a value".to_string());
                }
            }
            "--out" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--json" => {
                json = true;
            }
            "--browse" => {
                browse_path = it
                    .next()
                    .ok_or_else(|| "--browse requires a device path".to_string())?;
            }
            "--sync-source" => {
                sync_source = Some(
                    it.next()
                        .ok_or_else(|| "--sync-source requires a device path".to_string())?,
                );
            }
            "--sync-dest" => {
                sync_dest = Some(
                    it.next()
                        .ok_or_else(|| "--sync-dest requires a local path".to_string())?,
                );
            }
            "-h" | "--help" => {
                return Err(
                    "Usage: cargo run --bin smoke -- [--serial SERIAL] [--out DIR] [--json] [--browse DEVICE_PATH] [--sync-source DEVICE_PATH --sync-dest LOCAL_DIR]\n"
                        .to_string(),
                );
            }
            other => return Err(format!("Unknown arg: {other}")),
        }
    }

    if sync_source.is_some() != sync_dest.is_some() {
        return Err("--sync-source and --sync-dest must be given together".to_string());
    }

    Ok(Args {
        serial,
        out_dir,
        json,
        browse_path,
        sync_source,
        sync_dest,
    })
}

fn run_check<F>(checks: &mut Vec<SmokeCheck>, name: &'static str, f: F) -> bool
where
    F: FnOnce() -> Result<(), String>,
{
    let start = Instant::now();
    match f() {
        Ok(()) => {
            checks.push(SmokeCheck {
                name,
                status: "pass",
                duration_ms: start.elapsed().as_millis(),
                error: None,
            });
            true
        }
        Err(err) => {
            checks.push(SmokeCheck {
                name,
                status: "fail",
                duration_ms: start.elapsed().as_millis(),
                error: Some(err),
            });
            false
        }
    }
}

fn skip(checks: &mut Vec<SmokeCheck>, name: &'static str) {
    checks.push(SmokeCheck {
        name,
        status: "skip",
        duration_ms: 0,
        error: None,
    });
}

fn main() {
    let args = match parse_args() {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let out_dir = args.out_dir.clone().unwrap_or_else(|| {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "photoferry_smoke_{}",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        path
    });
    if let Err(err) = fs::create_dir_all(&out_dir) {
        eprintln!("Failed to create out dir {}: {err}", out_dir.display());
        std::process::exit(1);
    }

    let mut artifacts: HashMap<String, String> = HashMap::new();
    let mut checks: Vec<SmokeCheck> = Vec::new();
    let mut status = "pass";

    // Resolve the tool program the same way the app does (config-aware).
    let config = match load_config(&trace_id) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    let timeout = Duration::from_secs(config.tool.command_timeout_secs);

    let program = match prepare_tool_program(&config.tool.command_path, &trace_id) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Device tool unavailable: {err}");
            std::process::exit(1);
        }
    };

    if !run_check(&mut checks, "tool_version", || {
        let output = run_tool(&program, &["version"], None, timeout, &trace_id)
            .map_err(|err| err.to_string())?;
        let path = out_dir.join("tool_version.txt");
        fs::write(&path, &output).map_err(|err| format!("Failed to write version: {err}"))?;
        artifacts.insert("tool_version".to_string(), path.display().to_string());
        Ok(())
    }) {
        status = "fail";
    }

    // Discovery with detail enrichment against whatever is attached.
    let mut discovered_serial: Option<String> = None;
    if !run_check(&mut checks, "discover_devices", || {
        let devices =
            discover_devices(&program, timeout, &trace_id).map_err(|err| err.to_string())?;
        let path = out_dir.join("devices.json");
        let body = serde_json::to_string_pretty(&devices)
            .map_err(|err| format!("Failed to serialize devices: {err}"))?;
        fs::write(&path, body).map_err(|err| format!("Failed to write devices: {err}"))?;
        artifacts.insert("devices".to_string(), path.display().to_string());
        discovered_serial = devices
            .iter()
            .find(|device| device.state.is_connected())
            .map(|device| device.id.clone());
        Ok(())
    }) {
        status = "fail";
    }

    let serial = args.serial.clone().or(discovered_serial);

    match serial.clone() {
        Some(serial) => {
            if !run_check(&mut checks, "list_folder_contents", || {
                let items =
                    list_folder_contents(&program, &serial, &args.browse_path, timeout, &trace_id)
                        .map_err(|err| err.to_string())?;
                let path = out_dir.join("folder_contents.json");
                let body = serde_json::to_string_pretty(&items)
                    .map_err(|err| format!("Failed to serialize folder contents: {err}"))?;
                fs::write(&path, body)
                    .map_err(|err| format!("Failed to write folder contents: {err}"))?;
                artifacts.insert("folder_contents".to_string(), path.display().to_string());
                Ok(())
            }) {
                status = "fail";
            }

            match (args.sync_source.clone(), args.sync_dest.clone()) {
                (Some(source), Some(dest)) => {
                    if !run_check(&mut checks, "photo_sync", || {
                        let progress = SyncProgressState::new();
                        let synced = sync_photos(
                            &program,
                            &serial,
                            &source,
                            &dest,
                            timeout,
                            Duration::from_secs(config.sync.pull_timeout_secs),
                            &progress,
                            &trace_id,
                        )
                        .map_err(|err| err.to_string())?;
                        let snapshot = progress.snapshot();
                        let path = out_dir.join("sync_result.json");
                        let body = serde_json::json!({
                            "synced": synced,
                            "processed": snapshot.current,
                            "total": snapshot.total,
                        });
                        fs::write(&path, serde_json::to_string_pretty(&body).unwrap_or_default())
                            .map_err(|err| format!("Failed to write sync result: {err}"))?;
                        artifacts.insert("sync_result".to_string(), path.display().to_string());
                        Ok(())
                    }) {
                        status = "fail";
                    }
                }
                _ => skip(&mut checks, "photo_sync"),
            }
        }
        None => {
            skip(&mut checks, "list_folder_contents");
            skip(&mut checks, "photo_sync");
        }
    }

    let summary = SmokeSummary {
        tool: "photoferry_backend_smoke",
        status,
        trace_id,
        serial,
        tool_program: Some(program),
        out_dir: out_dir.display().to_string(),
        artifacts,
        checks,
    };

    let output = if args.json {
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    } else {
        format!(
            "status: {}\ntrace_id: {}\nout: {}\n",
            summary.status, summary.trace_id, summary.out_dir
        )
    };

    println!("{output}");
    if summary.status != "pass" {
        std::process::exit(1);
    }
}
