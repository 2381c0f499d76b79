pub mod app;

use app::commands::{
    cancel_reconnection, check_tool, get_config, get_device_details, get_reconnection_state,
    get_sync_progress, list_devices, list_folder_contents, monitoring_status, reset_config,
    resume_photo_sync, save_app_config, start_monitoring, start_photo_sync, stop_monitoring,
};
use app::logging::init_logging;
use app::state::AppState;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![
            get_config,
            save_app_config,
            reset_config,
            check_tool,
            list_devices,
            get_device_details,
            start_monitoring,
            stop_monitoring,
            monitoring_status,
            list_folder_contents,
            start_photo_sync,
            get_sync_progress,
            get_reconnection_state,
            resume_photo_sync,
            cancel_reconnection
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
