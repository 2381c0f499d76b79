use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    // Drain stdout/stderr in parallel; otherwise, a chatty child process can block once the pipe
    // buffer fills, and we will incorrectly hit the timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = std::thread::spawn(move || drain_pipe(stdout));
    let stderr_handle = std::thread::spawn(move || drain_pipe(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(AppError::system("Command timed out".to_string(), trace_id));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: decode_output(stdout_bytes, "stdout", trace_id)?,
        stderr: decode_output(stderr_bytes, "stderr", trace_id)?,
        exit_code,
    })
}

/// Run the device tool and return its trimmed stdout. When `serial` is given
/// the invocation is addressed to that device via `-s <serial>`. A non-zero
/// exit surfaces the captured stderr in the failure payload.
pub fn run_tool(
    program: &str,
    args: &[&str],
    serial: Option<&str>,
    timeout: Duration,
    trace_id: &str,
) -> Result<String, AppError> {
    let mut full_args = Vec::with_capacity(args.len() + 2);
    if let Some(serial) = serial {
        full_args.push("-s".to_string());
        full_args.push(serial.to_string());
    }
    full_args.extend(args.iter().map(|arg| arg.to_string()));

    let output = run_command_with_timeout(program, &full_args, timeout, trace_id)?;
    if output.exit_code.unwrap_or_default() != 0 {
        return Err(AppError::command_failed(
            format!(
                "{program} {} failed: {}",
                args.first().copied().unwrap_or(""),
                output.stderr.trim()
            ),
            trace_id,
        ));
    }
    Ok(output.stdout.trim().to_string())
}

fn drain_pipe(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 4096];
    loop {
        match reader.read(&mut temp) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&temp[..count]),
            Err(_) => break,
        }
    }
    buffer
}

fn decode_output(bytes: Vec<u8>, stream: &str, trace_id: &str) -> Result<String, AppError> {
    String::from_utf8(bytes).map_err(|_| {
        AppError::output_decode(
            format!("Command {stream} was not valid UTF-8"),
            trace_id,
        )
    })
}
