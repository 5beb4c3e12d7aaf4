use crate::models::language::{LanguageCode, LanguageOption};
use crate::models::view_state::ViewSnapshot;
use crate::services::image_intake::decode_upload;
use crate::services::session::{EngineStatus, Session};
use serde::Deserialize;
use std::sync::Arc;
use tauri::State;

/// State wrapper for the OCR session (Arc so the event sink and URI
/// scheme handler can share it)
pub type SessionState = Arc<Session>;

/// Image picked in the file input, base64 encoded by the webview
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub file_name: String,
    pub data: String,
}

/// Register the picked image. `None` means the picker was dismissed.
#[tauri::command]
pub fn select_image(state: State<SessionState>, file: Option<ImageUpload>) -> Result<ViewSnapshot, String> {
    let file = file
        .map(|upload| decode_upload(upload.file_name, &upload.data))
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(state.select_image(file))
}

#[tauri::command]
pub fn set_language(state: State<SessionState>, language: LanguageCode) -> ViewSnapshot {
    state.select_language(language)
}

#[tauri::command]
pub async fn list_languages(state: State<'_, SessionState>) -> Result<Vec<LanguageOption>, String> {
    Ok(state.list_languages().await)
}

/// Run OCR on the current image; resolves once recognition has finished
#[tauri::command]
pub async fn extract_text(state: State<'_, SessionState>) -> Result<ViewSnapshot, String> {
    Ok(state.extract().await)
}

#[tauri::command]
pub fn cancel_extraction(state: State<SessionState>) -> ViewSnapshot {
    state.cancel()
}

#[tauri::command]
pub fn dismiss_error(state: State<SessionState>) -> ViewSnapshot {
    state.dismiss_error()
}

#[tauri::command]
pub fn get_view_state(state: State<SessionState>) -> ViewSnapshot {
    state.snapshot()
}

/// Whether the configured engine can be reached, with its languages
#[tauri::command]
pub async fn check_ocr_engine(state: State<'_, SessionState>) -> Result<EngineStatus, String> {
    Ok(state.engine_status().await)
}
