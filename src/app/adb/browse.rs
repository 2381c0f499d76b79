use std::collections::BTreeSet;
use std::time::Duration;

use crate::app::adb::parse::{parse_find_names, shell_quote};
use crate::app::adb::runner::run_tool;
use crate::app::error::AppError;
use crate::app::models::FolderItem;

/// Extensions accepted by the photo sync, matched case-insensitively.
pub const PHOTO_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "heic", "dng", "raw"];

/// Enumerate photo file names directly under `source_path` on the device,
/// deduplicated and sorted by name.
pub fn list_photo_files(
    program: &str,
    serial: &str,
    source_path: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<Vec<String>, AppError> {
    let quoted_path = shell_quote(source_path);
    let mut names = BTreeSet::new();
    for ext in PHOTO_EXTENSIONS {
        let pattern = shell_quote(&format!("*.{ext}"));
        let output = run_tool(
            program,
            &[
                "shell",
                "find",
                &quoted_path,
                "-maxdepth",
                "1",
                "-type",
                "f",
                "-iname",
                &pattern,
            ],
            Some(serial),
            timeout,
            trace_id,
        )?;
        names.extend(parse_find_names(source_path, &output));
    }
    Ok(names.into_iter().collect())
}

/// List the immediate children of a device directory: sub-folders first,
/// then the photos at this level, both sorted by name. Folder photo counts
/// are a hint only; counting nested contents would cost one tool call per
/// folder, so they are reported as 0.
pub fn list_folder_contents(
    program: &str,
    serial: &str,
    path: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<Vec<FolderItem>, AppError> {
    let quoted_path = shell_quote(path);
    let output = run_tool(
        program,
        &[
            "shell",
            "find",
            &quoted_path,
            "-maxdepth",
            "1",
            "-type",
            "d",
        ],
        Some(serial),
        timeout,
        trace_id,
    )?;

    let mut folder_names = parse_find_names(path, &output);
    folder_names.sort();

    let mut items: Vec<FolderItem> = folder_names
        .into_iter()
        .map(|name| FolderItem::Folder {
            name,
            photo_count: 0,
        })
        .collect();

    items.extend(
        list_photo_files(program, serial, path, timeout, trace_id)?
            .into_iter()
            .map(|name| FolderItem::Photo { name }),
    );

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_tool(script_body: &str) -> (tempfile::TempDir, String) {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp");
        let path = tmp.path().join("fake-adb");
        std::fs::write(&path, format!("#!/bin/sh\n{script_body}")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        let program = path.to_string_lossy().to_string();
        (tmp, program)
    }

    // Device-addressed find calls arrive as:
    //   -s <serial> shell find '<path>' -maxdepth 1 -type d
    //   -s <serial> shell find '<path>' -maxdepth 1 -type f -iname '*.<ext>'
    #[cfg(unix)]
    const BROWSE_SCRIPT: &str = r#"
shift 2
if [ "$7" = "d" ]; then
  printf '/sdcard/DCIM\n/sdcard/DCIM/Screenshots\n/sdcard/DCIM/Camera\n'
  exit 0
fi
case "$9" in
  "'*.jpg'") printf '/sdcard/DCIM/b.jpg\n/sdcard/DCIM/a.JPG\n' ;;
  "'*.png'") printf '/sdcard/DCIM/c.png\n' ;;
esac
exit 0
"#;

    #[cfg(unix)]
    #[test]
    fn lists_photo_files_sorted_and_deduped() {
        let (_tmp, program) = fake_tool(BROWSE_SCRIPT);
        let names = list_photo_files(
            &program,
            "ABC123",
            "/sdcard/DCIM",
            Duration::from_secs(5),
            "trace-photos",
        )
        .expect("list photos");
        assert_eq!(names, vec!["a.JPG", "b.jpg", "c.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn lists_folders_before_photos() {
        let (_tmp, program) = fake_tool(BROWSE_SCRIPT);
        let items = list_folder_contents(
            &program,
            "ABC123",
            "/sdcard/DCIM",
            Duration::from_secs(5),
            "trace-browse",
        )
        .expect("list contents");

        let names: Vec<&str> = items.iter().map(|item| item.name()).collect();
        assert_eq!(names, vec!["Camera", "Screenshots", "a.JPG", "b.jpg", "c.png"]);
        assert!(items[0].is_folder());
        assert!(items[1].is_folder());
        assert!(!items[2].is_folder());
    }

    #[cfg(unix)]
    #[test]
    fn propagates_enumeration_failure() {
        let (_tmp, program) = fake_tool("echo 'device offline' >&2\nexit 1\n");
        let err = list_folder_contents(
            &program,
            "ABC123",
            "/sdcard/DCIM",
            Duration::from_secs(5),
            "trace-browse-err",
        )
        .expect_err("expected failure");
        assert_eq!(err.code, crate::app::error::codes::COMMAND_FAILED);
    }
}
