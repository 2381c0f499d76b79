use serde::Serialize;
use std::fmt;

pub mod codes {
    pub const VALIDATION: &str = "ERR_VALIDATION";
    pub const SYSTEM: &str = "ERR_SYSTEM";
    pub const TOOL_NOT_FOUND: &str = "ERR_TOOL_NOT_FOUND";
    pub const OUTPUT_DECODE: &str = "ERR_OUTPUT_DECODE";
    pub const COMMAND_FAILED: &str = "ERR_COMMAND_FAILED";
    pub const NO_PHOTOS: &str = "ERR_NO_PHOTOS";
    pub const DEVICE_DISCONNECTED: &str = "ERR_DEVICE_DISCONNECTED";
    pub const TRANSFER_FAILED: &str = "ERR_TRANSFER_FAILED";
}

#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::SYSTEM, message, trace_id)
    }

    pub fn tool_not_found(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::TOOL_NOT_FOUND, message, trace_id)
    }

    pub fn output_decode(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::OUTPUT_DECODE, message, trace_id)
    }

    pub fn command_failed(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::COMMAND_FAILED, message, trace_id)
    }

    pub fn no_photos(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::NO_PHOTOS, message, trace_id)
    }

    pub fn device_disconnected(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(codes::DEVICE_DISCONNECTED, message, trace_id)
    }

    pub fn transfer_failed(
        file_name: &str,
        detail: impl fmt::Display,
        trace_id: impl Into<String>,
    ) -> Self {
        Self::new(
            codes::TRANSFER_FAILED,
            format!("Failed to pull {file_name}: {detail}"),
            trace_id,
        )
    }

    pub fn is_disconnection(&self) -> bool {
        self.code == codes::DEVICE_DISCONNECTED
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}
