use crate::models::language::LanguageCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OCR engine choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Local `tesseract` executable
    #[default]
    Tesseract,
    /// Remote OCR server speaking the `/ocr` JSON protocol
    Http,
}

/// Tesseract CLI options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TesseractConfig {
    pub binary: String,
    /// Page segmentation mode (3 = fully automatic)
    pub psm: u8,
    /// OCR engine mode (3 = default, based on what is available)
    pub oem: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            psm: 3,
            oem: 3,
        }
    }
}

/// Remote OCR server options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpOcrConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpOcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:39835".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    pub default_language: LanguageCode,
    /// Upper bound for one recognition call; 0 disables the limit
    pub timeout_secs: u64,
    pub tesseract: TesseractConfig,
    pub http: HttpOcrConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            default_language: LanguageCode::Eng,
            timeout_secs: 120,
            tesseract: TesseractConfig::default(),
            http: HttpOcrConfig::default(),
        }
    }
}

/// Paper size for PDF export
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Width and height in PDF points
    pub fn points(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

/// PDF text placement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfLayout {
    pub page_size: PageSize,
    /// Left edge of the text, millimetres from the page edge
    pub origin_x_mm: f32,
    /// Baseline of the first line, millimetres from the top edge
    pub origin_y_mm: f32,
    pub font_size: f32,
    pub line_height_factor: f32,
    pub wrap_lines: bool,
    pub paginate: bool,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            origin_x_mm: 10.0,
            origin_y_mm: 10.0,
            font_size: 12.0,
            line_height_factor: 1.15,
            wrap_lines: true,
            paginate: true,
        }
    }
}

impl PdfLayout {
    /// Single-page layout that lets long text run off the page
    pub fn unbounded() -> Self {
        Self {
            wrap_lines: false,
            paginate: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.font_size > 0.0) {
            return Err(format!("Font size must be positive, got {}", self.font_size));
        }
        if !(self.line_height_factor > 0.0) {
            return Err(format!(
                "Line height factor must be positive, got {}",
                self.line_height_factor
            ));
        }
        if self.origin_x_mm < 0.0 || self.origin_y_mm < 0.0 {
            return Err("PDF origin must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Download folder override; the user's Downloads folder when unset
    pub directory: Option<PathBuf>,
    /// Replace an existing file instead of picking `name (n).ext`
    pub overwrite: bool,
    pub pdf: PdfLayout,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            overwrite: false,
            pdf: PdfLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.ocr.engine == OcrEngineKind::Http && self.ocr.http.base_url.trim().is_empty() {
            return Err("HTTP OCR engine needs a base URL".to_string());
        }
        if self.ocr.tesseract.binary.trim().is_empty() {
            return Err("Tesseract binary must not be empty".to_string());
        }
        self.export.pdf.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.ocr.engine, OcrEngineKind::Tesseract);
        assert_eq!(config.ocr.default_language, LanguageCode::Eng);
        assert_eq!(config.ocr.timeout_secs, 120);
        assert_eq!(config.ocr.tesseract.binary, "tesseract");
        assert_eq!(config.ocr.tesseract.psm, 3);

        assert!(config.export.directory.is_none());
        assert!(!config.export.overwrite);
        assert_eq!(config.export.pdf.origin_x_mm, 10.0);
        assert_eq!(config.export.pdf.origin_y_mm, 10.0);
        assert!(config.export.pdf.wrap_lines);
        assert!(config.export.pdf.paginate);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();

        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "ocr": { "engine": "http", "default_language": "deu" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.ocr.engine, OcrEngineKind::Http);
        assert_eq!(config.ocr.default_language, LanguageCode::Deu);
        assert_eq!(config.ocr.http, HttpOcrConfig::default());
        assert_eq!(config.export, ExportConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_engine_kind_serialization() {
        assert_eq!(serde_json::to_string(&OcrEngineKind::Tesseract).unwrap(), "\"tesseract\"");
        assert_eq!(serde_json::to_string(&OcrEngineKind::Http).unwrap(), "\"http\"");
    }

    #[test]
    fn test_page_size_points() {
        assert_eq!(PageSize::Letter.points(), (612.0, 792.0));
        let (w, h) = PageSize::A4.points();
        assert!(w < h);
    }

    #[test]
    fn test_unbounded_layout() {
        let layout = PdfLayout::unbounded();
        assert!(!layout.wrap_lines);
        assert!(!layout.paginate);
        assert_eq!(layout.font_size, PdfLayout::default().font_size);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.export.pdf.font_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ocr.engine = OcrEngineKind::Http;
        config.ocr.http.base_url = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.pdf.origin_y_mm = -1.0;
        assert!(config.validate().is_err());
    }
}
