use super::image::ImageSummary;
use super::language::{LanguageCode, TextDirection};
use super::ocr_result::RecognitionProgress;
use crate::services::export::ExportFormat;
use serde::Serialize;

/// Where the user is in the upload -> recognize -> export flow
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ViewPhase {
    Idle,
    ImageLoaded,
    Recognizing,
    TextReady,
    Error,
}

/// Serializable projection of the view state sent to the UI
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub phase: ViewPhase,
    pub image: Option<ImageSummary>,
    pub language: LanguageCode,
    pub text: String,
    pub text_direction: TextDirection,
    pub loading: bool,
    pub progress: Option<RecognitionProgress>,
    pub error: Option<String>,
    /// Export buttons to show; empty whenever there is no text
    pub exports: Vec<ExportFormat>,
}

impl ViewSnapshot {
    /// The extract button only exists once an image is loaded
    pub fn can_extract(&self) -> bool {
        self.image.is_some() && !self.loading
    }
}
