use crate::models::image::ImageData;
use crate::models::language::LanguageCode;
use crate::models::ocr_result::{ProgressStatus, RecognitionProgress};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    Unavailable(String),

    #[error("OCR process failed: {0}")]
    Process(String),

    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Invalid OCR response: {0}")]
    Response(String),
}

/// Where an engine reports progress. Reporting never fails: events are
/// dropped once nobody listens.
#[derive(Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<RecognitionProgress>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<RecognitionProgress>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, status: ProgressStatus, progress: f32) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(RecognitionProgress::new(status, progress));
        }
    }
}

/// OCR engine abstraction: (image, language) -> text
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool;

    /// Installed language models, when the engine can tell
    async fn installed_languages(&self) -> Option<Vec<String>> {
        None
    }

    async fn recognize(
        &self,
        image: &ImageData,
        language: LanguageCode,
        progress: &ProgressSink,
    ) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_sink_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);

        sink.report(ProgressStatus::Recognizing, 0.5);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, ProgressStatus::Recognizing);
        assert_eq!(event.progress, 0.5);
    }

    #[test]
    fn test_progress_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        ProgressSink::new(tx).report(ProgressStatus::Done, 1.0);
        ProgressSink::discard().report(ProgressStatus::Done, 1.0);
    }
}
