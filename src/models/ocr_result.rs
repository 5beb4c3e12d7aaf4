use super::language::LanguageCode;
use serde::{Deserialize, Serialize};

/// Identity of one recognition request
pub type RequestId = u64;

/// Full output of one successful recognition call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedText {
    pub text: String,
    pub language: LanguageCode,
    pub engine: String,
    pub elapsed_ms: u64,
}

/// Progress phase reported by an engine (informational only)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Initializing,
    LoadingLanguage,
    Recognizing,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionProgress {
    pub status: ProgressStatus,
    /// 0.0 ..= 1.0
    pub progress: f32,
}

impl RecognitionProgress {
    pub fn new(status: ProgressStatus, progress: f32) -> Self {
        Self {
            status,
            progress: progress.clamp(0.0, 1.0),
        }
    }
}

/// Progress event as emitted to the UI, tagged with its request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub request: RequestId,
    #[serde(flatten)]
    pub progress: RecognitionProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(RecognitionProgress::new(ProgressStatus::Recognizing, 1.7).progress, 1.0);
        assert_eq!(RecognitionProgress::new(ProgressStatus::Initializing, -0.2).progress, 0.0);
    }

    #[test]
    fn test_progress_update_serialization() {
        let update = ProgressUpdate {
            request: 3,
            progress: RecognitionProgress::new(ProgressStatus::LoadingLanguage, 0.25),
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["request"], 3);
        assert_eq!(json["status"], "loading_language");
        assert_eq!(json["progress"], 0.25);
    }
}
