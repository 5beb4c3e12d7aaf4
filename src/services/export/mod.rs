pub mod download;
pub mod pdf;

use crate::models::config::PdfLayout;
use serde::{Deserialize, Serialize};

pub use download::DownloadDir;
pub use pdf::export_as_pdf;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Failed to save {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No download directory available")]
    NoDownloadDir,
}

/// Export target offered once text exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Text,
    Pdf,
    Markdown,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Text, ExportFormat::Pdf, ExportFormat::Markdown];

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "extracted-text.txt",
            ExportFormat::Pdf => "extracted-text.pdf",
            ExportFormat::Markdown => "extracted-text.md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

/// A finished download payload
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            bytes,
        }
    }
}

/// Plain text, byte for byte
pub fn export_as_text(text: &str) -> ExportArtifact {
    ExportArtifact::new(ExportFormat::Text, text.as_bytes().to_vec())
}

/// Markdown payload: the text verbatim, no escaping or structure added
pub fn export_as_markdown(text: &str) -> ExportArtifact {
    ExportArtifact::new(ExportFormat::Markdown, text.as_bytes().to_vec())
}

/// Build the artifact for any format
pub fn build_artifact(format: ExportFormat, text: &str, layout: &PdfLayout) -> Result<ExportArtifact, ExportError> {
    match format {
        ExportFormat::Text => Ok(export_as_text(text)),
        ExportFormat::Markdown => Ok(export_as_markdown(text)),
        ExportFormat::Pdf => export_as_pdf(text, layout).map(|bytes| ExportArtifact::new(ExportFormat::Pdf, bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_are_fixed() {
        assert_eq!(ExportFormat::Text.file_name(), "extracted-text.txt");
        assert_eq!(ExportFormat::Pdf.file_name(), "extracted-text.pdf");
        assert_eq!(ExportFormat::Markdown.file_name(), "extracted-text.md");
    }

    #[test]
    fn test_text_export_is_byte_exact() {
        let text = "Bonjour\n  ligne deux\tavec tab\r\nfin ✓";
        let artifact = export_as_text(text);

        assert_eq!(artifact.mime_type, "text/plain");
        assert_eq!(artifact.file_name, "extracted-text.txt");
        assert_eq!(String::from_utf8(artifact.bytes).unwrap(), text);
    }

    #[test]
    fn test_markdown_export_is_untransformed() {
        let text = "# not a heading on purpose *stars* _under_ [link](x) <b>";
        let artifact = export_as_markdown(text);

        assert_eq!(artifact.mime_type, "text/markdown");
        assert_eq!(artifact.bytes, text.as_bytes());
    }

    #[test]
    fn test_build_artifact_dispatches() {
        let layout = PdfLayout::default();
        for format in ExportFormat::ALL {
            let artifact = build_artifact(format, "Hola", &layout).unwrap();
            assert_eq!(artifact.format, format);
            assert_eq!(artifact.file_name, format.file_name());
        }
    }

    #[test]
    fn test_format_serialization() {
        assert_eq!(serde_json::to_string(&ExportFormat::Markdown).unwrap(), "\"markdown\"");
        let parsed: ExportFormat = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(parsed, ExportFormat::Pdf);
    }
}
