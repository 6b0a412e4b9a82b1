//! OCR adapter: per-frame on-screen text and sticker detections.

use rumi_models::{BBox, MLAnalysisResult, TextCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{confidence_or_default, first_key, parse_bbox};

pub const MODEL_NAME: &str = "ocr";

/// One detected text element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TextCategory>,
    pub confidence: f64,
}

/// One detected sticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSticker {
    pub sticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

/// Per-frame OCR record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<OcrText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stickers: Vec<OcrSticker>,
}

/// Normalized OCR payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedOcr {
    pub frames: Vec<OcrFrame>,
}

/// Map a raw category string to the overlay taxonomy.
fn parse_category(raw: &str) -> Option<TextCategory> {
    match raw.trim().to_lowercase().as_str() {
        "headline" | "title" => Some(TextCategory::Headline),
        "subtitle" | "caption_text" => Some(TextCategory::Subtitle),
        "cta" | "call_to_action" => Some(TextCategory::Cta),
        "caption" => Some(TextCategory::Caption),
        "number" | "numeric" => Some(TextCategory::Number),
        "hashtag" => Some(TextCategory::Hashtag),
        "other" | "overlay_text" => Some(TextCategory::Other),
        _ => None,
    }
}

/// Normalize raw OCR output.
pub fn adapt_ocr(raw: &Value) -> MLAnalysisResult {
    let Some(frames) = first_key(raw, &["frames", "frame_results", "results"]).and_then(|v| v.as_array())
    else {
        warn!("OCR output missing frame list");
        return MLAnalysisResult::failed(MODEL_NAME, "unrecognized OCR structure");
    };

    let mut normalized = Vec::with_capacity(frames.len());
    for frame in frames {
        let texts = first_key(frame, &["text_elements", "textElements", "texts"])
            .and_then(|v| v.as_array())
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|e| {
                        let text = e.get("text").and_then(|v| v.as_str())?;
                        if text.trim().is_empty() {
                            return None;
                        }
                        Some(OcrText {
                            text: text.to_string(),
                            bbox: first_key(e, &["bbox", "box"]).and_then(parse_bbox),
                            category: e
                                .get("category")
                                .and_then(|v| v.as_str())
                                .and_then(parse_category),
                            confidence: confidence_or_default(e, &["confidence", "score"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let stickers = first_key(frame, &["stickers", "sticker_elements"])
            .and_then(|v| v.as_array())
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|e| {
                        let sticker = first_key(e, &["kind", "sticker", "type"])?.as_str()?;
                        Some(OcrSticker {
                            sticker: sticker.to_string(),
                            bbox: first_key(e, &["bbox", "box"]).and_then(parse_bbox),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        normalized.push(OcrFrame {
            frame: first_key(frame, &["frame", "frame_index"]).and_then(|v| v.as_u64()),
            timestamp: first_key(frame, &["timestamp", "time"]).and_then(|v| v.as_f64()),
            texts,
            stickers,
        });
    }

    match serde_json::to_value(NormalizedOcr { frames: normalized }) {
        Ok(data) => MLAnalysisResult::ok(MODEL_NAME, data),
        Err(e) => MLAnalysisResult::failed(MODEL_NAME, e.to_string()),
    }
}
