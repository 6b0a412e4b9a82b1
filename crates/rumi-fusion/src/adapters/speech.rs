//! Speech transcription adapter.

use rumi_models::{MLAnalysisResult, SpeechWord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{confidence_or_default, first_key};

pub const MODEL_NAME: &str = "speech";

/// One transcribed segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<SpeechWord>,
}

/// Normalized transcription payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedSpeech {
    #[serde(default)]
    pub language: String,
    pub segments: Vec<SpeechSegment>,
}

/// Normalize raw transcription output (`{segments: [...], language}`).
pub fn adapt_speech(raw: &Value) -> MLAnalysisResult {
    let Some(segments) = first_key(raw, &["segments", "transcription"]).and_then(|v| v.as_array()) else {
        warn!("Speech output missing segments list");
        return MLAnalysisResult::failed(MODEL_NAME, "unrecognized speech structure");
    };

    let language = first_key(raw, &["language", "lang"])
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut normalized = Vec::with_capacity(segments.len());
    for segment in segments {
        let (Some(start), Some(end)) = (
            first_key(segment, &["start", "start_time"]).and_then(|v| v.as_f64()),
            first_key(segment, &["end", "end_time"]).and_then(|v| v.as_f64()),
        ) else {
            continue;
        };
        let Some(text) = segment.get("text").and_then(|v| v.as_str()) else {
            continue;
        };

        let words = segment
            .get("words")
            .and_then(|v| v.as_array())
            .map(|words| {
                words
                    .iter()
                    .filter_map(|w| {
                        Some(SpeechWord {
                            word: w.get("word").and_then(|v| v.as_str())?.to_string(),
                            start: w.get("start").and_then(|v| v.as_f64())?,
                            end: w.get("end").and_then(|v| v.as_f64())?,
                            confidence: confidence_or_default(w, &["confidence", "probability"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        normalized.push(SpeechSegment {
            start,
            end,
            text: text.to_string(),
            confidence: confidence_or_default(segment, &["confidence", "avg_logprob_confidence"]),
            words,
        });
    }

    match serde_json::to_value(NormalizedSpeech { language, segments: normalized }) {
        Ok(data) => MLAnalysisResult::ok(MODEL_NAME, data),
        Err(e) => MLAnalysisResult::failed(MODEL_NAME, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapt_speech_segments() {
        let raw = json!({
            "language": "en",
            "segments": [
                {"start": 1.0, "end": 3.0, "text": "hello world", "confidence": 0.95,
                 "words": [
                    {"word": "hello", "start": 1.0, "end": 1.5, "confidence": 0.9},
                    {"word": "world", "start": 1.6, "end": 2.2, "confidence": 0.97}
                 ]},
                {"start": 4.0, "end": 5.0, "text": "again"}
            ]
        });
        let result = adapt_speech(&raw);
        assert!(result.success);

        let speech: NormalizedSpeech = serde_json::from_value(result.data).unwrap();
        assert_eq!(speech.language, "en");
        assert_eq!(speech.segments.len(), 2);
        assert_eq!(speech.segments[0].words.len(), 2);
        // Missing confidence defaults to 0.5
        assert_eq!(speech.segments[1].confidence, 0.5);
    }

    #[test]
    fn test_adapt_speech_missing_segments() {
        let result = adapt_speech(&json!({"text": "flat transcript"}));
        assert!(!result.success);
        assert!(result.data.is_object());
    }

    #[test]
    fn test_segment_without_timing_skipped() {
        let raw = json!({"segments": [{"text": "no timing"}]});
        let result = adapt_speech(&raw);
        assert!(result.success);
        let speech: NormalizedSpeech = serde_json::from_value(result.data).unwrap();
        assert!(speech.segments.is_empty());
    }
}
