pub mod config;
pub mod image;
pub mod language;
pub mod ocr_result;
pub mod view_state;
