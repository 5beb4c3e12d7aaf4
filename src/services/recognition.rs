//! Recognition invoker: runs one OCR call as a cancellable task that
//! streams progress and resolves to the recognized text.

use crate::models::image::ImageData;
use crate::models::language::LanguageCode;
use crate::models::ocr_result::{RecognitionProgress, RecognizedText, RequestId};
use crate::services::ocr::{OcrEngine, OcrError, ProgressSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Engine(#[from] OcrError),

    #[error("Recognition cancelled")]
    Cancelled,

    #[error("Recognition timed out after {} s", .0.as_secs())]
    TimedOut(Duration),

    #[error("Recognition task crashed: {0}")]
    Crashed(String),
}

/// Cancellation signal shared between the task and whoever may abort it
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Sender lives in self, so wait_for can't fail
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// What to recognize. The token exists before the task does, so a cancel
/// issued before `spawn` still stops the call.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub id: RequestId,
    pub image: Arc<ImageData>,
    pub language: LanguageCode,
    pub cancel: CancelToken,
}

/// One in-flight recognition
pub struct RecognitionTask {
    id: RequestId,
    progress: mpsc::UnboundedReceiver<RecognitionProgress>,
    handle: JoinHandle<Result<RecognizedText, RecognitionError>>,
}

impl RecognitionTask {
    /// Start recognizing on the tokio runtime. `timeout` of `None` waits
    /// for the engine indefinitely.
    pub fn spawn(
        engine: Arc<dyn OcrEngine>,
        request: RecognitionRequest,
        timeout: Option<Duration>,
    ) -> Self {
        let (tx, progress) = mpsc::unbounded_channel();
        let id = request.id;

        let token = request.cancel.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let sink = ProgressSink::new(tx);
            let call = engine.recognize(&request.image, request.language, &sink);

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(RecognitionError::Cancelled),
                result = bounded(call, timeout) => result,
            };

            outcome.map(|text| RecognizedText {
                text,
                language: request.language,
                engine: engine.name().to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            })
        });

        tracing::info!(request = id, "recognition started");

        Self { id, progress, handle }
    }

    /// Drive the task to completion, handing each progress event to
    /// `on_progress` as it arrives.
    pub async fn run<F>(mut self, mut on_progress: F) -> Result<RecognizedText, RecognitionError>
    where
        F: FnMut(RecognitionProgress),
    {
        let joined = loop {
            // Queued progress drains before the result is taken
            tokio::select! {
                biased;
                Some(event) = self.progress.recv() => on_progress(event),
                joined = &mut self.handle => break joined,
            }
        };

        let outcome = joined.unwrap_or_else(|e| Err(RecognitionError::Crashed(e.to_string())));

        match &outcome {
            Ok(text) => tracing::info!(
                request = self.id,
                engine = %text.engine,
                elapsed_ms = text.elapsed_ms,
                chars = text.text.chars().count(),
                "recognition finished"
            ),
            Err(RecognitionError::Cancelled) => tracing::info!(request = self.id, "recognition cancelled"),
            Err(e) => tracing::error!(request = self.id, error = %e, "recognition failed"),
        }

        outcome
    }
}

async fn bounded<F>(call: F, timeout: Option<Duration>) -> Result<String, RecognitionError>
where
    F: std::future::Future<Output = Result<String, OcrError>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(RecognitionError::from),
            Err(_) => Err(RecognitionError::TimedOut(limit)),
        },
        None => call.await.map_err(RecognitionError::from),
    }
}
