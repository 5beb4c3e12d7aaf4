use serde::Serialize;
use std::io::Cursor;

const UNKNOWN_MIME: &str = "application/octet-stream";

/// A file picked by the user, before it is registered
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Uploaded image bytes plus what could be sniffed from them.
///
/// The type is never validated: bytes that are not an image are kept
/// as-is and the OCR engine reports the failure.
#[derive(Debug)]
pub struct ImageData {
    pub file_name: String,
    pub mime_type: String,
    pub dimensions: Option<(u32, u32)>,
    bytes: Vec<u8>,
}

impl ImageData {
    pub fn from_file(file: SelectedFile) -> Self {
        let mime_type = image::guess_format(&file.bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| UNKNOWN_MIME.to_string());

        let dimensions = image::ImageReader::new(Cursor::new(&file.bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        Self {
            file_name: file.file_name,
            mime_type,
            dimensions,
            bytes: file.bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the UI needs to show the current image
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub id: u64,
    pub url: String,
    pub file_name: String,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: usize,
}
