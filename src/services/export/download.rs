use super::{ExportArtifact, ExportError};
use std::fs;
use std::path::{Path, PathBuf};

/// Gives up picking a free name after this many numbered copies
const MAX_COPIES: u32 = 9999;

/// Download boundary: saves artifacts into one folder under their fixed names
#[derive(Debug, Clone)]
pub struct DownloadDir {
    root: PathBuf,
    overwrite: bool,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            root: root.into(),
            overwrite,
        }
    }

    /// Configured folder, else the user's Downloads folder, else home
    pub fn resolve(configured: Option<&Path>, overwrite: bool) -> Result<Self, ExportError> {
        let root = configured
            .map(Path::to_path_buf)
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .ok_or(ExportError::NoDownloadDir)?;
        Ok(Self::new(root, overwrite))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the artifact and return where it landed
    pub fn save(&self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.root).map_err(|source| ExportError::Io {
            path: self.root.clone(),
            source,
        })?;

        let path = self.target_path(artifact.file_name);
        fs::write(&path, &artifact.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            mime = artifact.mime_type,
            bytes = artifact.bytes.len(),
            "export saved"
        );
        Ok(path)
    }

    /// `name.ext`, or the first free `name (n).ext` like a browser would pick
    fn target_path(&self, file_name: &str) -> PathBuf {
        let first = self.root.join(file_name);
        if self.overwrite || !first.exists() {
            return first;
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (file_name, String::new()),
        };

        (1..=MAX_COPIES)
            .map(|n| self.root.join(format!("{} ({}){}", stem, n, ext)))
            .find(|candidate| !candidate.exists())
            .unwrap_or(first)
    }
}
