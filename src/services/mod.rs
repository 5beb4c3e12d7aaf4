pub mod config;
pub mod export;
pub mod image_intake;
pub mod ocr;
pub mod recognition;
pub mod session;
pub mod view_controller;
