use super::ocr::SessionState;
use crate::services::export::ExportFormat;
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

/// Save the current text in `format`; returns the written path, or `None`
/// when there is no text to export
#[tauri::command]
pub fn export_text(state: State<SessionState>, format: ExportFormat) -> Result<Option<String>, String> {
    let path = state.export(format).map_err(|e| e.to_string())?;
    Ok(path.map(|p| p.to_string_lossy().into_owned()))
}

/// Open an exported file in the system's default app
#[tauri::command]
pub fn open_export(app: AppHandle, path: String) -> Result<(), String> {
    app.opener()
        .open_path(path, None::<&str>)
        .map_err(|e| format!("Failed to open export: {}", e))
}
