use crate::models::image::{ImageData, ImageSummary, SelectedFile};
use base64::Engine as _;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// URI scheme the webview uses to load live image handles
pub const IMAGE_SCHEME: &str = "ocrimg";

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Failed to decode image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode an upload sent over IPC as plain base64 or a `data:` URL
pub fn decode_upload(file_name: impl Into<String>, payload: &str) -> Result<SelectedFile, IntakeError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    Ok(SelectedFile::new(file_name, bytes))
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<ImageData>>>,
}

/// Accepts user-selected images and keeps them addressable while their
/// handle is alive.
#[derive(Clone, Default)]
pub struct ImageIntake {
    registry: Arc<Registry>,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the selected file; `None` when nothing was picked
    pub fn select_image(&self, file: Option<SelectedFile>) -> Option<ImageHandle> {
        let file = file?;
        let data = Arc::new(ImageData::from_file(file));
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        self.registry.entries.lock().insert(id, Arc::clone(&data));

        tracing::debug!(
            id,
            file = %data.file_name,
            mime = %data.mime_type,
            bytes = data.len(),
            "image registered"
        );

        Some(ImageHandle {
            id,
            data,
            registry: Arc::downgrade(&self.registry),
        })
    }

    /// Bytes behind a live handle; `None` once released
    pub fn resolve(&self, id: u64) -> Option<Arc<ImageData>> {
        self.registry.entries.lock().get(&id).cloned()
    }

    /// Resolve `ocrimg://localhost/<id>`, `http://ocrimg.localhost/<id>` or a bare path
    pub fn resolve_url(&self, url: &str) -> Option<Arc<ImageData>> {
        parse_image_id(url).and_then(|id| self.resolve(id))
    }

    pub fn live_handles(&self) -> usize {
        self.registry.entries.lock().len()
    }
}

/// Extract the handle id from the last path segment of an image URL
pub fn parse_image_id(url: &str) -> Option<u64> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// Exclusive handle to one registered image.
///
/// Not clonable: the view state owns it and releases it when a new image
/// replaces it. Dropping the handle releases it as well.
pub struct ImageHandle {
    id: u64,
    data: Arc<ImageData>,
    registry: Weak<Registry>,
}

impl ImageHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> String {
        format!("{}://localhost/{}", IMAGE_SCHEME, self.id)
    }

    /// Shared view of the bytes for the OCR engine
    pub fn data(&self) -> Arc<ImageData> {
        Arc::clone(&self.data)
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            id: self.id,
            url: self.url(),
            file_name: self.data.file_name.clone(),
            mime_type: self.data.mime_type.clone(),
            width: self.data.dimensions.map(|(w, _)| w),
            height: self.data.dimensions.map(|(_, h)| h),
            size_bytes: self.data.len(),
        }
    }

    /// Release the registry entry now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.entries.lock().remove(&self.id).is_some() {
                tracing::debug!(id = self.id, "image released");
            }
        }
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.id)
            .field("file_name", &self.data.file_name)
            .finish()
    }
}
