use super::engine::{OcrEngine, OcrError, ProgressSink};
use crate::models::config::TesseractConfig;
use crate::models::image::ImageData;
use crate::models::language::LanguageCode;
use crate::models::ocr_result::ProgressStatus;
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Tesseract OCR engine driving the `tesseract` executable.
///
/// The image goes in on stdin and the text comes back on stdout, so no
/// temp files are involved. The child is killed if the call is dropped.
pub struct TesseractEngine {
    binary: String,
    psm: u8,
    oem: u8,
}

impl TesseractEngine {
    pub fn new(config: &TesseractConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            psm: config.psm,
            oem: config.oem,
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        if e.kind() == std::io::ErrorKind::NotFound {
            OcrError::Unavailable(format!("'{}' not found on PATH", self.binary))
        } else {
            OcrError::Process(format!("Failed to start {}: {}", self.binary, e))
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn installed_languages(&self) -> Option<Vec<String>> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }

        // Older releases print the list on stderr
        let listing = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        Some(parse_language_list(&listing))
    }

    async fn recognize(
        &self,
        image: &ImageData,
        language: LanguageCode,
        progress: &ProgressSink,
    ) -> Result<String, OcrError> {
        progress.report(ProgressStatus::Initializing, 0.0);

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(language.as_str())
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("--oem")
            .arg(self.oem.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        progress.report(ProgressStatus::LoadingLanguage, 0.1);

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Process("tesseract stdin not captured".to_string()))?;

        let bytes = image.bytes();
        let write_image = async move {
            stdin.write_all(bytes).await?;
            stdin.shutdown().await
        };

        progress.report(ProgressStatus::Recognizing, 0.3);

        let (written, output) = tokio::join!(write_image, child.wait_with_output());
        let output = output.map_err(|e| OcrError::Process(format!("tesseract did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Process(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        // A broken pipe only matters if tesseract itself succeeded
        written.map_err(|e| OcrError::Process(format!("Failed to send image to tesseract: {}", e)))?;

        let text = normalize_output(&String::from_utf8_lossy(&output.stdout));
        progress.report(ProgressStatus::Done, 1.0);

        tracing::debug!(lang = %language, chars = text.chars().count(), "tesseract finished");
        Ok(text)
    }
}

/// Drop page separators and trailing whitespace tesseract leaves behind
pub fn normalize_output(raw: &str) -> String {
    static TRAILING_WS: OnceLock<Regex> = OnceLock::new();
    let trailing = TRAILING_WS.get_or_init(|| Regex::new(r"(?m)[ \t]+$").expect("static regex"));

    let without_feeds = raw.replace('\x0c', "");
    let trimmed = trailing.replace_all(&without_feeds, "");
    trimmed.trim_start_matches(['\n', '\r']).trim_end().to_string()
}

/// Parse `tesseract --list-langs` output
pub fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::SelectedFile;

    fn missing_binary_engine() -> TesseractEngine {
        TesseractEngine::new(&TesseractConfig {
            binary: "tesseract-binary-that-does-not-exist".to_string(),
            ..TesseractConfig::default()
        })
    }

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("Bonjour  \n\x0c"), "Bonjour");
        assert_eq!(normalize_output("\nline one \t\nline two\n\n"), "line one\nline two");
        assert_eq!(normalize_output("  indented\nkept"), "  indented\nkept");
        assert_eq!(normalize_output("\x0c"), "");
    }

    #[test]
    fn test_parse_language_list() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nfra\nosd\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "fra", "osd"]);
        assert!(parse_language_list("").is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let engine = missing_binary_engine();
        assert!(!engine.is_available().await);
        assert!(engine.installed_languages().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_recognize_fails() {
        let engine = missing_binary_engine();
        let image = ImageData::from_file(SelectedFile::new("photo.png", vec![0u8; 8]));

        let result = engine
            .recognize(&image, LanguageCode::Eng, &ProgressSink::discard())
            .await;

        assert!(matches!(result, Err(OcrError::Unavailable(_))));
    }

    /// Stand-in executable: answers `--version`/`--list-langs`, otherwise
    /// prints its arguments, echoes stdin and trails tesseract-style junk
    #[cfg(unix)]
    fn fake_tesseract(dir: &std::path::Path, body: &str) -> TesseractEngine {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-tesseract");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.sync_all().unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        TesseractEngine::new(&TesseractConfig {
            binary: path.to_string_lossy().into_owned(),
            psm: 6,
            oem: 1,
        })
    }

    #[cfg(unix)]
    const ECHO_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "tesseract 5.3.0"; exit 0 ;;
  --list-langs) printf 'List of available languages in "/tmp" (2):\neng\nfra\n'; exit 0 ;;
esac
printf '%s\n' "$*"
cat
printf '   \n\f'
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recognize_passes_options_and_pipes_image() {
        let temp = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(temp.path(), ECHO_SCRIPT);
        let image = ImageData::from_file(SelectedFile::new("photo.png", b"Bonjour le monde  \n".to_vec()));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let text = engine
            .recognize(&image, LanguageCode::Fra, &ProgressSink::new(tx))
            .await
            .unwrap();

        assert_eq!(text, "stdin stdout -l fra --psm 6 --oem 1\nBonjour le monde");

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            statuses.push(event.status);
        }
        assert_eq!(statuses.first(), Some(&ProgressStatus::Initializing));
        assert_eq!(statuses.last(), Some(&ProgressStatus::Done));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_binary_reports_languages() {
        let temp = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(temp.path(), ECHO_SCRIPT);

        assert!(engine.is_available().await);
        assert_eq!(engine.installed_languages().await, Some(vec!["eng".to_string(), "fra".to_string()]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_process_error() {
        let temp = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(
            temp.path(),
            "#!/bin/sh\ncat > /dev/null\necho \"Failed loading language 'ara'\" >&2\nexit 1\n",
        );
        let image = ImageData::from_file(SelectedFile::new("photo.png", vec![0u8; 8]));

        let result = engine
            .recognize(&image, LanguageCode::Ara, &ProgressSink::discard())
            .await;

        match result {
            Err(OcrError::Process(message)) => assert!(message.contains("Failed loading language 'ara'")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Needs tesseract with eng traineddata installed
    async fn test_recognize_blank_image() {
        use image::{DynamicImage, Rgb, RgbImage};

        let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 50, Rgb([255, 255, 255])));
        let mut bytes = Vec::new();
        blank
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let image = ImageData::from_file(SelectedFile::new("blank.png", bytes));

        let engine = TesseractEngine::new(&TesseractConfig::default());
        let text = engine
            .recognize(&image, LanguageCode::Eng, &ProgressSink::discard())
            .await
            .expect("recognition should succeed even on a blank image");

        assert!(text.trim().is_empty(), "blank image gave: {:?}", text);
    }
}
