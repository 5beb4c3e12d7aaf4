use super::engine::{OcrEngine, OcrError, ProgressSink};
use crate::models::config::HttpOcrConfig;
use crate::models::image::ImageData;
use crate::models::language::LanguageCode;
use crate::models::ocr_result::ProgressStatus;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

/// Boxes overlapping more than this are treated as duplicates
const OVERLAP_IOU: f64 = 0.3;

/// HTTP OCR engine talking to a local or remote OCR server
#[derive(Clone)]
pub struct HttpOcrEngine {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    image_base64: String,
    language: &'a str,
}

/// Single text box with bounding box coordinates
#[derive(Deserialize, Clone, Debug)]
struct TextBox {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>, // 4 corner points [[x1,y1], [x2,y2], [x3,y3], [x4,y4]]
    text: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    boxes: Vec<TextBox>,
    #[serde(default)]
    raw_text: String,
}

impl TextBox {
    /// Bounding rectangle as (x_min, y_min, x_max, y_max)
    fn rect(&self) -> (f64, f64, f64, f64) {
        let mut rect = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for point in self.bbox.iter().filter(|p| p.len() >= 2) {
            rect.0 = rect.0.min(point[0]);
            rect.1 = rect.1.min(point[1]);
            rect.2 = rect.2.max(point[0]);
            rect.3 = rect.3.max(point[1]);
        }
        rect
    }

    fn area(&self) -> f64 {
        let (x_min, y_min, x_max, y_max) = self.rect();
        ((x_max - x_min) * (y_max - y_min)).max(0.0)
    }

    fn iou(&self, other: &TextBox) -> f64 {
        let (x1_min, y1_min, x1_max, y1_max) = self.rect();
        let (x2_min, y2_min, x2_max, y2_max) = other.rect();

        let inter_w = x1_max.min(x2_max) - x1_min.max(x2_min);
        let inter_h = y1_max.min(y2_max) - y1_min.max(y2_min);
        if inter_w <= 0.0 || inter_h <= 0.0 {
            return 0.0;
        }

        let inter_area = inter_w * inter_h;
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        inter_area / union_area
    }

    fn center_y(&self) -> f64 {
        let (_, y_min, _, y_max) = self.rect();
        (y_min + y_max) / 2.0
    }

    fn height(&self) -> f64 {
        let (_, y_min, _, y_max) = self.rect();
        y_max - y_min
    }

    fn left_x(&self) -> f64 {
        self.rect().0
    }
}

/// Remove overlapping boxes, keeping the larger one
fn suppress_overlaps(mut boxes: Vec<TextBox>) -> Vec<TextBox> {
    boxes.sort_by(|a, b| b.area().partial_cmp(&a.area()).unwrap_or(Ordering::Equal));

    let mut kept: Vec<TextBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= OVERLAP_IOU) {
            kept.push(candidate);
        }
    }
    kept
}

/// Arrange boxes into reading order: lines top to bottom, words left to right.
/// A box joins a line when its vertical center falls within half a line
/// height of the line's first box.
fn assemble_text(boxes: Vec<TextBox>) -> String {
    let mut boxes: Vec<TextBox> = suppress_overlaps(boxes)
        .into_iter()
        .filter(|b| !b.text.trim().is_empty())
        .collect();
    boxes.sort_by(|a, b| a.center_y().partial_cmp(&b.center_y()).unwrap_or(Ordering::Equal));

    let mut lines: Vec<Vec<TextBox>> = Vec::new();
    for text_box in boxes {
        match lines.last_mut() {
            Some(line)
                if (text_box.center_y() - line[0].center_y()).abs()
                    <= line[0].height().max(text_box.height()) / 2.0 =>
            {
                line.push(text_box)
            }
            _ => lines.push(vec![text_box]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.left_x().partial_cmp(&b.left_x()).unwrap_or(Ordering::Equal));
            line.iter()
                .map(|b| b.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl HttpOcrEngine {
    pub fn new(config: &HttpOcrConfig) -> Result<Self, OcrError> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| OcrError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if server is healthy
    pub async fn health_check(&self) -> Result<(), OcrError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OcrError::Request(format!("Health check failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OcrError::Server {
                status: response.status().as_u16(),
                body: "health check rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn is_available(&self) -> bool {
        self.health_check().await.is_ok()
    }

    async fn recognize(
        &self,
        image: &ImageData,
        language: LanguageCode,
        progress: &ProgressSink,
    ) -> Result<String, OcrError> {
        progress.report(ProgressStatus::Initializing, 0.0);

        let request = OcrRequest {
            image_base64: general_purpose::STANDARD.encode(image.bytes()),
            language: language.as_str(),
        };
        let url = format!("{}/ocr", self.base_url);

        progress.report(ProgressStatus::Recognizing, 0.2);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OcrError::Server { status, body });
        }

        let data: OcrResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Response(e.to_string()))?;

        let text = if data.boxes.is_empty() {
            data.raw_text
        } else {
            assemble_text(data.boxes)
        };

        progress.report(ProgressStatus::Done, 1.0);
        Ok(text)
    }
}
