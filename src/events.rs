use crate::models::ocr_result::ProgressUpdate;
use crate::models::view_state::ViewSnapshot;
use crate::services::session::EventSink;
use tauri::{AppHandle, Emitter};

pub const STATE_EVENT: &str = "ocr:state";
pub const PROGRESS_EVENT: &str = "ocr:progress";

/// Forwards session events to the webview
pub struct TauriEventSink {
    app: AppHandle,
}

impl TauriEventSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEventSink {
    fn view_changed(&self, snapshot: &ViewSnapshot) {
        if let Err(e) = self.app.emit(STATE_EVENT, snapshot) {
            tracing::warn!(error = %e, "failed to emit view state");
        }
    }

    fn progress(&self, update: &ProgressUpdate) {
        if let Err(e) = self.app.emit(PROGRESS_EVENT, update) {
            tracing::warn!(error = %e, request = update.request, "failed to emit progress");
        }
    }
}
