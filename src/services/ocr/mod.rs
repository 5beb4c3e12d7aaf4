pub mod engine;
pub mod http_ocr;
pub mod tesseract;

use crate::models::config::{OcrConfig, OcrEngineKind};
use std::sync::Arc;

// Re-export main types
pub use engine::{OcrEngine, OcrError, ProgressSink};
pub use http_ocr::HttpOcrEngine;
pub use tesseract::TesseractEngine;

/// Build the engine selected in config
pub fn build_engine(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
    let engine: Arc<dyn OcrEngine> = match config.engine {
        OcrEngineKind::Tesseract => Arc::new(TesseractEngine::new(&config.tesseract)),
        OcrEngineKind::Http => Arc::new(HttpOcrEngine::new(&config.http)?),
    };
    tracing::info!(engine = engine.name(), "OCR engine configured");
    Ok(engine)
}
