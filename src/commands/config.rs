use super::ocr::SessionState;
use crate::models::config::AppConfig;
use crate::services::config::ConfigManager;
use std::sync::Mutex;
use tauri::State;

/// State wrapper for configuration manager
pub type ConfigManagerState = Mutex<ConfigManager>;

/// Save the configuration and apply it to the running session
#[tauri::command]
pub fn save_config(
    state: State<ConfigManagerState>,
    session: State<SessionState>,
    config: AppConfig,
) -> Result<(), String> {
    let manager = state
        .lock()
        .map_err(|e| format!("Failed to lock config manager: {}", e))?;

    manager.save(&config).map_err(|e| e.to_string())?;
    session.reconfigure(&config).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn load_config(state: State<ConfigManagerState>) -> Result<AppConfig, String> {
    let manager = state
        .lock()
        .map_err(|e| format!("Failed to lock config manager: {}", e))?;

    manager.load().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_config_path(state: State<ConfigManagerState>) -> Result<String, String> {
    let manager = state
        .lock()
        .map_err(|e| format!("Failed to lock config manager: {}", e))?;

    Ok(manager.config_file_path().to_string_lossy().into_owned())
}
