#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod events;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::commands::config::{get_config_path, load_config, save_config, ConfigManagerState};
    use crate::commands::export::{export_text, open_export};
    use crate::commands::ocr::{
        cancel_extraction, check_ocr_engine, dismiss_error, extract_text, get_view_state, list_languages,
        select_image, set_language, SessionState,
    };
    use crate::events::TauriEventSink;
    use crate::logging;
    use crate::models::config::AppConfig;
    use crate::services::config::ConfigManager;
    use crate::services::image_intake::IMAGE_SCHEME;
    use crate::services::session::{EventSink, Session};
    use std::borrow::Cow;
    use std::sync::{Arc, Mutex};
    use tauri::http::{header::CONTENT_TYPE, Response, StatusCode};
    use tauri::Manager;

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        let config_manager = ConfigManager::new().expect("Failed to initialize config manager");
        let config = config_manager.load_or_default();
        logging::init(&config.logging);

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            config = %config_manager.config_file_path().display(),
            "starting OCR converter"
        );

        tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .manage::<ConfigManagerState>(Mutex::new(config_manager))
            .setup(move |app| {
                let events: Arc<dyn EventSink> = Arc::new(TauriEventSink::new(app.handle().clone()));
                let session = Session::from_config(&config, Arc::clone(&events)).or_else(|e| {
                    tracing::warn!(error = %e, "saved config unusable, falling back to defaults");
                    Session::from_config(&AppConfig::default(), events)
                })?;
                let state: SessionState = Arc::new(session);
                app.manage(state);
                Ok(())
            })
            .register_uri_scheme_protocol(IMAGE_SCHEME, |ctx, request| {
                let uri = request.uri().to_string();
                match ctx.app_handle().try_state::<SessionState>() {
                    Some(session) => image_response(&session, &uri),
                    None => empty_response(StatusCode::SERVICE_UNAVAILABLE),
                }
            })
            .invoke_handler(tauri::generate_handler![
                select_image,
                set_language,
                list_languages,
                extract_text,
                cancel_extraction,
                dismiss_error,
                get_view_state,
                check_ocr_engine,
                export_text,
                open_export,
                save_config,
                load_config,
                get_config_path
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }

    /// Serve the bytes behind a live image handle to the webview
    fn image_response(session: &Session, uri: &str) -> Response<Cow<'static, [u8]>> {
        let Some(image) = session.resolve_image(uri) else {
            tracing::debug!(uri, "image handle not found");
            return empty_response(StatusCode::NOT_FOUND);
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, image.mime_type.as_str())
            .body(Cow::Owned(image.bytes().to_vec()))
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to build image response");
                empty_response(StatusCode::INTERNAL_SERVER_ERROR)
            })
    }

    fn empty_response(status: StatusCode) -> Response<Cow<'static, [u8]>> {
        let mut response = Response::new(Cow::Owned(Vec::new()));
        *response.status_mut() = status;
        response
    }
}
