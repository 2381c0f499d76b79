use std::path::Path;
use std::sync::OnceLock;

use crate::app::error::AppError;

/// Prepared program path, resolved once per process lifetime.
static PREPARED_PROGRAM: OnceLock<String> = OnceLock::new();

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

pub fn resolve_tool_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        "adb".to_string()
    } else {
        normalized
    }
}

pub fn validate_tool_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("Device tool command is empty".to_string());
    }
    if program == "adb" {
        // Bare command name resolves through PATH at spawn time.
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("Device tool path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("Device tool executable not found at the configured path".to_string());
    }
    Ok(())
}

#[cfg(unix)]
fn ensure_executable(program: &str) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;

    if program == "adb" {
        return Ok(());
    }
    let metadata = std::fs::metadata(program)
        .map_err(|err| format!("Failed to stat device tool: {err}"))?;
    let mut permissions = metadata.permissions();
    if permissions.mode() & 0o111 == 0 {
        permissions.set_mode(0o755);
        std::fs::set_permissions(program, permissions)
            .map_err(|err| format!("Failed to mark device tool executable: {err}"))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_program: &str) -> Result<(), String> {
    Ok(())
}

/// Resolve, validate, and cache the device tool path. Subsequent calls return
/// the cached value without touching the filesystem again.
pub fn prepare_tool_program(config_command_path: &str, trace_id: &str) -> Result<String, AppError> {
    if let Some(cached) = PREPARED_PROGRAM.get() {
        return Ok(cached.clone());
    }
    let program = resolve_tool_program(config_command_path);
    validate_tool_program(&program).map_err(|message| AppError::tool_not_found(message, trace_id))?;
    ensure_executable(&program).map_err(|message| AppError::tool_not_found(message, trace_id))?;
    Ok(PREPARED_PROGRAM.get_or_init(|| program).clone())
}
