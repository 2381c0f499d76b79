use serde::{Deserialize, Serialize};

/// Raw connection state reported by the second column of `adb devices`.
/// Unrecognized tokens collapse to `Unknown` rather than failing the row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Offline,
    Unauthorized,
    Unknown,
}

impl ConnectionState {
    pub fn from_token(token: &str) -> Self {
        match token {
            "device" => ConnectionState::Connected,
            "offline" => ConnectionState::Offline,
            "unauthorized" => ConnectionState::Unauthorized,
            _ => ConnectionState::Unknown,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub state: ConnectionState,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub os_version: Option<String>,
    pub api_level: Option<String>,
    pub battery_level: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, state_token: &str) -> Self {
        Self {
            id: id.into(),
            state: ConnectionState::from_token(state_token),
            model: None,
            manufacturer: None,
            os_version: None,
            api_level: None,
            battery_level: None,
        }
    }

    /// Prefer model, then manufacturer, then the raw serial.
    pub fn display_name(&self) -> &str {
        if let Some(model) = self.model.as_deref().filter(|value| !value.is_empty()) {
            return model;
        }
        if let Some(manufacturer) = self
            .manufacturer
            .as_deref()
            .filter(|value| !value.is_empty())
        {
            return manufacturer;
        }
        &self.id
    }

    pub fn has_details(&self) -> bool {
        self.model.is_some()
            || self.manufacturer.is_some()
            || self.os_version.is_some()
            || self.api_level.is_some()
            || self.battery_level.is_some()
    }
}

/// One entry of a device folder listing. `photo_count` is a best-effort hint
/// and may be 0 for a non-empty folder (nested enumeration is skipped).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FolderItem {
    Folder { name: String, photo_count: usize },
    Photo { name: String },
}

impl FolderItem {
    pub fn name(&self) -> &str {
        match self {
            FolderItem::Folder { name, .. } | FolderItem::Photo { name } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FolderItem::Folder { .. })
    }
}

/// Latest-value sync progress snapshot. `total == 0` means enumeration has
/// not completed yet, not "zero photos found".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectionState {
    pub needs_reconnection: bool,
    pub is_reconnecting: bool,
    pub device_confirmed_gone: bool,
    pub device_reconnected: bool,
    pub partial_sync_count: Option<u32>,
    pub disconnected_device_id: Option<String>,
}

/// The sync invocation an interrupted transfer would resume with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRequest {
    pub serial: String,
    pub source_path: String,
    pub destination_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitoringStatus {
    pub running: bool,
    pub last_refresh_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_state_tokens() {
        assert_eq!(
            ConnectionState::from_token("device"),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionState::from_token("offline"),
            ConnectionState::Offline
        );
        assert_eq!(
            ConnectionState::from_token("unauthorized"),
            ConnectionState::Unauthorized
        );
        assert_eq!(
            ConnectionState::from_token("sideload"),
            ConnectionState::Unknown
        );
    }

    #[test]
    fn display_name_prefers_model_then_manufacturer() {
        let mut device = Device::new("ABC123", "device");
        assert_eq!(device.display_name(), "ABC123");

        device.manufacturer = Some("Google".to_string());
        assert_eq!(device.display_name(), "Google");

        device.model = Some("Pixel 7".to_string());
        assert_eq!(device.display_name(), "Pixel 7");
    }

    #[test]
    fn display_name_skips_empty_strings() {
        let mut device = Device::new("ABC123", "device");
        device.model = Some(String::new());
        device.manufacturer = Some(String::new());
        assert_eq!(device.display_name(), "ABC123");
    }

    #[test]
    fn folder_item_serializes_with_type_tag() {
        let folder = FolderItem::Folder {
            name: "Camera".to_string(),
            photo_count: 3,
        };
        let json = serde_json::to_value(&folder).expect("serialize");
        assert_eq!(json["type"], "folder");
        assert_eq!(json["photo_count"], 3);

        let photo = FolderItem::Photo {
            name: "IMG_0001.jpg".to_string(),
        };
        let json = serde_json::to_value(&photo).expect("serialize");
        assert_eq!(json["type"], "photo");
        assert_eq!(json["name"], "IMG_0001.jpg");
    }
}
