//! View controller: the interaction state and its single transition
//! function. `ViewState::apply` never performs side effects itself; it
//! returns the effects the session has to carry out.

use crate::models::language::LanguageCode;
use crate::models::ocr_result::{RecognitionProgress, RecognizedText, RequestId};
use crate::models::view_state::{ViewPhase, ViewSnapshot};
use crate::services::export::ExportFormat;
use crate::services::image_intake::ImageHandle;
use crate::services::recognition::{CancelToken, RecognitionError, RecognitionRequest};

/// User actions and recognition completions
#[derive(Debug)]
pub enum Action {
    SelectImage(Option<ImageHandle>),
    SelectLanguage(LanguageCode),
    Extract,
    Progress {
        request: RequestId,
        progress: RecognitionProgress,
    },
    RecognitionFinished {
        request: RequestId,
        outcome: Result<RecognizedText, RecognitionError>,
    },
    Cancel,
    Export(ExportFormat),
    DismissError,
}

/// Side effects requested by a transition
#[derive(Debug)]
pub enum Effect {
    /// A superseded image handle to release
    Release(ImageHandle),
    StartRecognition(RecognitionRequest),
    CancelRecognition(RequestId),
    Export { format: ExportFormat, text: String },
}

#[derive(Debug, Default)]
pub struct ViewState {
    image: Option<ImageHandle>,
    language: LanguageCode,
    text: String,
    /// Language the current text was recognized with
    text_language: Option<LanguageCode>,
    in_flight: Option<RequestId>,
    progress: Option<RecognitionProgress>,
    error: Option<String>,
    last_request: RequestId,
}

impl ViewState {
    pub fn new(language: LanguageCode) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::SelectImage(None) => Vec::new(),
            Action::SelectImage(Some(handle)) => self.replace_image(handle),
            Action::SelectLanguage(language) => {
                self.language = language;
                Vec::new()
            }
            Action::Extract => self.start_recognition(),
            Action::Progress { request, progress } => {
                if self.in_flight == Some(request) {
                    self.progress = Some(progress);
                }
                Vec::new()
            }
            Action::RecognitionFinished { request, outcome } => {
                self.finish_recognition(request, outcome);
                Vec::new()
            }
            Action::Cancel => self
                .in_flight
                .map(Effect::CancelRecognition)
                .into_iter()
                .collect(),
            Action::Export(format) => {
                if self.text.is_empty() {
                    return Vec::new();
                }
                vec![Effect::Export {
                    format,
                    text: self.text.clone(),
                }]
            }
            Action::DismissError => {
                self.error = None;
                Vec::new()
            }
        }
    }

    fn replace_image(&mut self, handle: ImageHandle) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let Some(request) = self.in_flight.take() {
            effects.push(Effect::CancelRecognition(request));
        }
        if let Some(previous) = self.image.replace(handle) {
            effects.push(Effect::Release(previous));
        }

        // Text from the previous image no longer describes what is shown
        self.text.clear();
        self.text_language = None;
        self.progress = None;
        self.error = None;

        effects
    }

    fn start_recognition(&mut self) -> Vec<Effect> {
        let Some(image) = &self.image else {
            return Vec::new();
        };
        if self.in_flight.is_some() {
            return Vec::new();
        }

        self.last_request += 1;
        let request = RecognitionRequest {
            id: self.last_request,
            image: image.data(),
            language: self.language,
            cancel: CancelToken::new(),
        };

        self.in_flight = Some(request.id);
        self.progress = None;
        self.error = None;

        vec![Effect::StartRecognition(request)]
    }

    fn finish_recognition(&mut self, request: RequestId, outcome: Result<RecognizedText, RecognitionError>) {
        if self.in_flight != Some(request) {
            tracing::debug!(request, "ignoring stale recognition result");
            return;
        }

        self.in_flight = None;
        self.progress = None;

        match outcome {
            Ok(recognized) => {
                self.text = recognized.text;
                self.text_language = Some(recognized.language);
                self.error = None;
            }
            Err(RecognitionError::Cancelled) => {}
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn phase(&self) -> ViewPhase {
        if self.is_loading() {
            ViewPhase::Recognizing
        } else if self.error.is_some() {
            ViewPhase::Error
        } else if !self.text.is_empty() {
            ViewPhase::TextReady
        } else if self.image.is_some() {
            ViewPhase::ImageLoaded
        } else {
            ViewPhase::Idle
        }
    }

    pub fn available_exports(&self) -> Vec<ExportFormat> {
        if self.text.is_empty() {
            Vec::new()
        } else {
            ExportFormat::ALL.to_vec()
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            phase: self.phase(),
            image: self.image.as_ref().map(ImageHandle::summary),
            language: self.language,
            text: self.text.clone(),
            text_direction: self.text_language.unwrap_or(self.language).direction(),
            loading: self.is_loading(),
            progress: self.progress.clone(),
            error: self.error.clone(),
            exports: self.available_exports(),
        }
    }
}
