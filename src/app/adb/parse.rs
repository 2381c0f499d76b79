use crate::app::models::Device;

/// Parse `adb devices` output into bare device records. The header row and
/// any line with fewer than two whitespace-separated tokens are dropped.
pub fn parse_devices_output(output: &str) -> Vec<Device> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            Some(Device::new(tokens[0], tokens[1]))
        })
        .collect()
}

/// Pull the battery percentage out of `dumpsys battery` output.
pub fn parse_battery_level(output: &str) -> Option<String> {
    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(value) = trimmed.strip_prefix("level:") {
            if let Ok(level) = value.trim().parse::<u8>() {
                return Some(format!("{level}%"));
            }
        }
    }
    None
}

/// Extract entry names from `find <path> -maxdepth 1 ...` output: one
/// absolute path per line, the queried path itself excluded.
pub fn parse_find_names(base_path: &str, output: &str) -> Vec<String> {
    let base = base_path.trim_end_matches('/');
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| line.trim_end_matches('/') != base && *line != base_path)
        .filter_map(|line| {
            line.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(|name| name.to_string())
        })
        .collect()
}

/// Single-quote a device path for use inside `shell` arguments, so spaces
/// and glob characters reach `find` intact.
pub fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::ConnectionState;

    #[test]
    fn parses_devices_output() {
        let output = "List of devices attached\nABC123\tdevice\nDEF456\toffline\n";
        let parsed = parse_devices_output(output);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, "ABC123");
        assert_eq!(parsed[0].state, ConnectionState::Connected);
        assert_eq!(parsed[1].id, "DEF456");
        assert_eq!(parsed[1].state, ConnectionState::Offline);
    }

    #[test]
    fn drops_short_rows_and_daemon_noise() {
        let output = "* daemon started successfully\nList of devices attached\nlonely-token\nABC123 device\n";
        let parsed = parse_devices_output(output);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "ABC123");
    }

    #[test]
    fn unknown_state_token_maps_to_unknown() {
        let parsed = parse_devices_output("ABC123 sideload\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].state, ConnectionState::Unknown);
    }

    #[test]
    fn parses_battery_level() {
        let output = "AC powered: false\nlevel: 87\nstatus: 2\n";
        assert_eq!(parse_battery_level(output).as_deref(), Some("87%"));
    }

    #[test]
    fn battery_level_requires_numeric_value() {
        assert_eq!(parse_battery_level("level: high\n"), None);
        assert_eq!(parse_battery_level("voltage: 4200\n"), None);
    }

    #[test]
    fn parses_find_names_excluding_base() {
        let output = "/sdcard/DCIM\n/sdcard/DCIM/Camera\n/sdcard/DCIM/Screenshots\n";
        let names = parse_find_names("/sdcard/DCIM", output);
        assert_eq!(names, vec!["Camera", "Screenshots"]);
    }

    #[test]
    fn parses_find_names_with_trailing_slash_base() {
        let output = "/sdcard/DCIM/Camera\n/sdcard/DCIM/Camera/IMG_0001.jpg\n";
        let names = parse_find_names("/sdcard/DCIM/Camera/", output);
        assert_eq!(names, vec!["IMG_0001.jpg"]);
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/sdcard/My Photos"), "'/sdcard/My Photos'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
