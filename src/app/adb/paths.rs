pub fn validate_device_path(path: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device path is required".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err("device path must be absolute, starting with '/'".to_string());
    }
    if trimmed.contains('\0') {
        return Err("device path contains invalid characters".to_string());
    }
    if trimmed == "/" {
        return Err("device path must not be root".to_string());
    }
    for segment in trimmed.split('/') {
        if segment == ".." {
            return Err("device path must not contain '..' segments".to_string());
        }
    }
    Ok(())
}

/// Join a file name onto a device directory without doubling separators.
pub fn join_device_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_device_path_requires_absolute() {
        assert!(validate_device_path("").is_err());
        assert!(validate_device_path("sdcard/DCIM").is_err());
        assert!(validate_device_path("/").is_err());
        assert!(validate_device_path("/sdcard/DCIM/Camera").is_ok());
    }

    #[test]
    fn validate_device_path_blocks_dotdot() {
        assert!(validate_device_path("/sdcard/../etc/passwd").is_err());
        assert!(validate_device_path("/sdcard/..").is_err());
        assert!(validate_device_path("/sdcard/a/../b").is_err());
    }

    #[test]
    fn join_device_path_handles_trailing_slash() {
        assert_eq!(
            join_device_path("/sdcard/DCIM/Camera/", "IMG_0001.jpg"),
            "/sdcard/DCIM/Camera/IMG_0001.jpg"
        );
        assert_eq!(
            join_device_path("/sdcard/DCIM/Camera", "IMG_0001.jpg"),
            "/sdcard/DCIM/Camera/IMG_0001.jpg"
        );
    }
}
