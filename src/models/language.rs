use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OCR language model selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    Eng,
    Ara,
    Spa,
    Fra,
    Deu,
}

/// Text direction used when rendering recognized text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language code: '{0}'")]
pub struct UnsupportedLanguage(pub String);

impl LanguageCode {
    /// Every language offered in the selector, in display order
    pub const ALL: [LanguageCode; 5] = [
        LanguageCode::Eng,
        LanguageCode::Ara,
        LanguageCode::Spa,
        LanguageCode::Fra,
        LanguageCode::Deu,
    ];

    /// Tesseract traineddata name
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::Eng => "eng",
            LanguageCode::Ara => "ara",
            LanguageCode::Spa => "spa",
            LanguageCode::Fra => "fra",
            LanguageCode::Deu => "deu",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LanguageCode::Eng => "English",
            LanguageCode::Ara => "Arabic",
            LanguageCode::Spa => "Spanish",
            LanguageCode::Fra => "French",
            LanguageCode::Deu => "German",
        }
    }

    pub fn direction(&self) -> TextDirection {
        match self {
            LanguageCode::Ara => TextDirection::Rtl,
            _ => TextDirection::Ltr,
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s.trim())
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

/// Selector entry sent to the UI
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOption {
    pub code: LanguageCode,
    pub label: &'static str,
    pub direction: TextDirection,
    /// `None` when the engine can't report its installed languages
    pub installed: Option<bool>,
}

impl LanguageOption {
    pub fn new(code: LanguageCode, installed: Option<bool>) -> Self {
        Self {
            code,
            label: code.label(),
            direction: code.direction(),
            installed,
        }
    }
}
