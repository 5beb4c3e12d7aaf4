//! Session: owns the view state and carries out the effects its
//! transitions request (spawning recognition, cancelling, releasing
//! image handles, writing exports).

use crate::models::config::{AppConfig, PdfLayout};
use crate::models::image::{ImageData, SelectedFile};
use crate::models::language::{LanguageCode, LanguageOption};
use crate::models::ocr_result::{ProgressUpdate, RecognizedText, RequestId};
use crate::models::view_state::ViewSnapshot;
use crate::services::export::{build_artifact, DownloadDir, ExportError, ExportFormat};
use crate::services::image_intake::ImageIntake;
use crate::services::ocr::{build_engine, OcrEngine, OcrError};
use crate::services::recognition::{CancelToken, RecognitionError, RecognitionTask};
use crate::services::view_controller::{Action, Effect, ViewState};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Receives everything the UI has to hear about
pub trait EventSink: Send + Sync {
    fn view_changed(&self, snapshot: &ViewSnapshot);
    fn progress(&self, update: &ProgressUpdate);
}

/// Sink that drops every event
pub struct NullSink;

impl EventSink for NullSink {
    fn view_changed(&self, _snapshot: &ViewSnapshot) {}
    fn progress(&self, _update: &ProgressUpdate) {}
}

/// Engine health as reported to the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub engine: &'static str,
    pub available: bool,
    pub languages: Vec<LanguageOption>,
}

/// Settings that can be swapped when the config is saved
struct Settings {
    engine: Arc<dyn OcrEngine>,
    timeout: Option<Duration>,
    downloads: DownloadDir,
    pdf: PdfLayout,
}

pub struct Session {
    state: Mutex<ViewState>,
    intake: ImageIntake,
    settings: RwLock<Settings>,
    cancels: Mutex<HashMap<RequestId, CancelToken>>,
    events: Arc<dyn EventSink>,
}

impl Session {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        downloads: DownloadDir,
        default_language: LanguageCode,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            state: Mutex::new(ViewState::new(default_language)),
            intake: ImageIntake::new(),
            settings: RwLock::new(Settings {
                engine,
                timeout: None,
                downloads,
                pdf: PdfLayout::default(),
            }),
            cancels: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Build a session wired to the engine and folders `config` describes
    pub fn from_config(config: &AppConfig, events: Arc<dyn EventSink>) -> Result<Self, SessionError> {
        let settings = Settings::from_config(config)?;
        Ok(Self {
            state: Mutex::new(ViewState::new(config.ocr.default_language)),
            intake: ImageIntake::new(),
            settings: RwLock::new(settings),
            cancels: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        self.settings.write().timeout = timeout;
        self
    }

    /// Apply a saved config. The current image, text and language stay.
    pub fn reconfigure(&self, config: &AppConfig) -> Result<(), SessionError> {
        let settings = Settings::from_config(config)?;
        tracing::info!(engine = settings.engine.name(), "session reconfigured");
        *self.settings.write() = settings;
        Ok(())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.lock().snapshot()
    }

    pub fn select_image(&self, file: Option<SelectedFile>) -> ViewSnapshot {
        let handle = self.intake.select_image(file);
        self.dispatch(Action::SelectImage(handle));
        self.snapshot()
    }

    pub fn select_language(&self, language: LanguageCode) -> ViewSnapshot {
        self.dispatch(Action::SelectLanguage(language));
        self.snapshot()
    }

    /// Recognize the current image with the current language and wait for
    /// the outcome. Without an image, or with a request already running,
    /// this returns the unchanged snapshot.
    pub async fn extract(&self) -> ViewSnapshot {
        let request = self.dispatch(Action::Extract).into_iter().find_map(|effect| match effect {
            Effect::StartRecognition(request) => Some(request),
            _ => None,
        });
        let Some(request) = request else {
            return self.snapshot();
        };

        let id = request.id;
        let (engine, timeout) = {
            let settings = self.settings.read();
            (Arc::clone(&settings.engine), settings.timeout)
        };

        let task = RecognitionTask::spawn(engine, request, timeout);
        let guard = InFlight::new(self, id);

        let outcome = task
            .run(|progress| {
                self.state.lock().apply(Action::Progress {
                    request: id,
                    progress: progress.clone(),
                });
                self.events.progress(&ProgressUpdate { request: id, progress });
            })
            .await;

        guard.finish(outcome);
        self.snapshot()
    }

    /// Ask the running recognition to stop; its completion clears loading
    pub fn cancel(&self) -> ViewSnapshot {
        self.dispatch(Action::Cancel);
        self.snapshot()
    }

    pub fn dismiss_error(&self) -> ViewSnapshot {
        self.dispatch(Action::DismissError);
        self.snapshot()
    }

    /// Save the current text as `format`. `Ok(None)` when there is no text.
    pub fn export(&self, format: ExportFormat) -> Result<Option<PathBuf>, ExportError> {
        let pending = self.dispatch(Action::Export(format)).into_iter().find_map(|effect| match effect {
            Effect::Export { format, text } => Some((format, text)),
            _ => None,
        });
        let Some((format, text)) = pending else {
            tracing::debug!(?format, "nothing to export");
            return Ok(None);
        };

        let (downloads, pdf) = {
            let settings = self.settings.read();
            (settings.downloads.clone(), settings.pdf.clone())
        };

        let artifact = build_artifact(format, &text, &pdf)?;
        downloads.save(&artifact).map(Some)
    }

    /// Bytes behind an `ocrimg` URL while its handle is live
    pub fn resolve_image(&self, url: &str) -> Option<Arc<ImageData>> {
        self.intake.resolve_url(url)
    }

    pub fn live_images(&self) -> usize {
        self.intake.live_handles()
    }

    /// Selector entries, marked with installation state where the engine knows it
    pub async fn list_languages(&self) -> Vec<LanguageOption> {
        let engine = Arc::clone(&self.settings.read().engine);
        let installed = engine.installed_languages().await;
        language_options(installed.as_deref())
    }

    pub async fn engine_status(&self) -> EngineStatus {
        let engine = Arc::clone(&self.settings.read().engine);
        let available = engine.is_available().await;
        let installed = if available {
            engine.installed_languages().await
        } else {
            None
        };

        EngineStatus {
            engine: engine.name(),
            available,
            languages: language_options(installed.as_deref()),
        }
    }

    /// Run one action through the reducer, perform the bookkeeping effects
    /// and hand back the ones the caller has to drive.
    fn dispatch(&self, action: Action) -> Vec<Effect> {
        let (effects, snapshot) = {
            let mut state = self.state.lock();
            let effects = state.apply(action);
            // Registered before the lock drops, so a cancel racing the
            // spawn always finds the token
            for effect in &effects {
                if let Effect::StartRecognition(request) = effect {
                    self.cancels.lock().insert(request.id, request.cancel.clone());
                }
            }
            (effects, state.snapshot())
        };

        let mut pending = Vec::new();
        for effect in effects {
            match effect {
                Effect::Release(handle) => handle.release(),
                Effect::CancelRecognition(request) => {
                    if let Some(token) = self.cancels.lock().get(&request) {
                        tracing::info!(request, "cancelling recognition");
                        token.cancel();
                    }
                }
                other => pending.push(other),
            }
        }

        self.events.view_changed(&snapshot);
        pending
    }
}

impl Settings {
    fn from_config(config: &AppConfig) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let engine = build_engine(&config.ocr)?;
        let downloads = DownloadDir::resolve(config.export.directory.as_deref(), config.export.overwrite)?;
        let timeout = (config.ocr.timeout_secs > 0).then(|| Duration::from_secs(config.ocr.timeout_secs));

        Ok(Self {
            engine,
            timeout,
            downloads,
            pdf: config.export.pdf.clone(),
        })
    }
}

fn language_options(installed: Option<&[String]>) -> Vec<LanguageOption> {
    LanguageCode::ALL
        .into_iter()
        .map(|code| {
            let present = installed.map(|list| list.iter().any(|name| name == code.as_str()));
            LanguageOption::new(code, present)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Engine(#[from] OcrError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Clears the loading flag of one request however the awaiting future ends.
/// Dropped without `finish` (the caller went away) it reports a cancellation.
struct InFlight<'a> {
    session: &'a Session,
    request: RequestId,
    outcome: Option<Result<RecognizedText, RecognitionError>>,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a Session, request: RequestId) -> Self {
        Self {
            session,
            request,
            outcome: None,
        }
    }

    fn finish(mut self, outcome: Result<RecognizedText, RecognitionError>) {
        self.outcome = Some(outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                if let Some(token) = self.session.cancels.lock().get(&self.request) {
                    token.cancel();
                }
                Err(RecognitionError::Cancelled)
            }
        };

        self.session.cancels.lock().remove(&self.request);
        self.session.dispatch(Action::RecognitionFinished {
            request: self.request,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ocr_result::ProgressStatus;
    use crate::models::view_state::ViewPhase;
    use crate::services::ocr::ProgressSink;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Engine that waits for `gate` (when set) before answering
    struct GatedEngine {
        reply: Result<String, String>,
        gate: Option<Arc<Notify>>,
        installed: Option<Vec<String>>,
    }

    impl GatedEngine {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                gate: None,
                installed: None,
            }
        }
    }

    #[async_trait]
    impl OcrEngine for GatedEngine {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn installed_languages(&self) -> Option<Vec<String>> {
            self.installed.clone()
        }

        async fn recognize(
            &self,
            _image: &ImageData,
            _language: LanguageCode,
            progress: &ProgressSink,
        ) -> Result<String, OcrError> {
            progress.report(ProgressStatus::Recognizing, 0.5);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone().map_err(OcrError::Process)
        }
    }

    /// Records every event it receives
    #[derive(Default)]
    struct RecordingSink {
        views: Mutex<Vec<ViewSnapshot>>,
        progress: Mutex<Vec<ProgressUpdate>>,
    }

    impl EventSink for RecordingSink {
        fn view_changed(&self, snapshot: &ViewSnapshot) {
            self.views.lock().push(snapshot.clone());
        }

        fn progress(&self, update: &ProgressUpdate) {
            self.progress.lock().push(update.clone());
        }
    }

    fn session(engine: GatedEngine, events: Arc<dyn EventSink>) -> (Session, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let downloads = DownloadDir::new(temp.path(), false);
        (Session::new(Arc::new(engine), downloads, LanguageCode::Eng, events), temp)
    }

    fn photo() -> Option<SelectedFile> {
        Some(SelectedFile::new("photo.png", vec![1, 2, 3]))
    }

    #[tokio::test]
    async fn test_extract_emits_progress_and_state() {
        let sink = Arc::new(RecordingSink::default());
        let (session, _temp) = session(GatedEngine::replying("Bonjour"), sink.clone());

        session.select_image(photo());
        let snapshot = session.extract().await;

        assert_eq!(snapshot.text, "Bonjour");
        assert_eq!(snapshot.phase, ViewPhase::TextReady);

        let views = sink.views.lock();
        assert!(views.iter().any(|v| v.loading));
        assert!(!views.last().unwrap().loading);
        assert_eq!(sink.progress.lock()[0].progress.status, ProgressStatus::Recognizing);
    }

    #[tokio::test]
    async fn test_extract_without_image_returns_idle() {
        let (session, _temp) = session(GatedEngine::replying("x"), Arc::new(NullSink));

        let snapshot = session.extract().await;

        assert_eq!(snapshot.phase, ViewPhase::Idle);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_cancel_mid_flight() {
        let engine = GatedEngine {
            gate: Some(Arc::new(Notify::new())),
            ..GatedEngine::replying("never")
        };
        let (session, _temp) = session(engine, Arc::new(NullSink));
        let session = Arc::new(session);
        session.select_image(photo());

        let running = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.extract().await })
        };
        while !session.snapshot().loading {
            tokio::task::yield_now().await;
        }

        session.cancel();
        let snapshot = running.await.unwrap();

        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.phase, ViewPhase::ImageLoaded);
    }

    #[tokio::test]
    async fn test_dropped_extract_clears_loading() {
        let engine = GatedEngine {
            gate: Some(Arc::new(Notify::new())),
            ..GatedEngine::replying("never")
        };
        let (session, _temp) = session(engine, Arc::new(NullSink));
        session.select_image(photo());

        let result = tokio::time::timeout(Duration::from_millis(50), session.extract()).await;

        assert!(result.is_err());
        assert!(!session.snapshot().loading);
        assert!(session.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_export_requires_text() {
        let (session, temp) = session(GatedEngine::replying(""), Arc::new(NullSink));
        session.select_image(photo());
        session.extract().await;

        assert!(session.export(ExportFormat::Text).unwrap().is_none());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_new_image_releases_old_handle() {
        let (session, _temp) = session(GatedEngine::replying("x"), Arc::new(NullSink));

        session.select_image(photo());
        let first_url = session.snapshot().image.unwrap().url;
        session.select_image(Some(SelectedFile::new("other.png", vec![4])));

        assert_eq!(session.live_images(), 1);
        assert!(session.resolve_image(&first_url).is_none());
        let current = session.snapshot().image.unwrap();
        assert_eq!(session.resolve_image(&current.url).unwrap().file_name, "other.png");
    }

    #[tokio::test]
    async fn test_language_options_mark_installed() {
        let engine = GatedEngine {
            installed: Some(vec!["eng".to_string(), "fra".to_string(), "osd".to_string()]),
            ..GatedEngine::replying("")
        };
        let (session, _temp) = session(engine, Arc::new(NullSink));

        let options = session.list_languages().await;

        assert_eq!(options.len(), 5);
        let installed: Vec<_> = options.iter().filter(|o| o.installed == Some(true)).map(|o| o.code).collect();
        assert_eq!(installed, vec![LanguageCode::Eng, LanguageCode::Fra]);
    }

    #[tokio::test]
    async fn test_engine_status() {
        let (session, _temp) = session(GatedEngine::replying(""), Arc::new(NullSink));

        let status = session.engine_status().await;

        assert_eq!(status.engine, "gated");
        assert!(status.available);
        assert!(status.languages.iter().all(|o| o.installed.is_none()));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = AppConfig::default();
        config.export.pdf.font_size = 0.0;

        let result = Session::from_config(&config, Arc::new(NullSink));
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }
}
