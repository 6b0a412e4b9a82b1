//! Standardized vocabularies for gestures, emotions, and text sizing.
//!
//! Analyzers report the same concept under many names (`thumbs_up`,
//! `thumb_up`, `ok_sign` are all approval). Marker extraction and feature
//! computation only ever see the standardized forms.

use crate::timeline::{BBox, TextSizeClass};

/// Map a raw gesture label to the standard vocabulary.
pub fn standardize_gesture(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "pointing" | "pointing_up" | "pointing_down" | "finger_point" | "finger_point_up"
        | "finger_point_down" | "point" => "pointing",
        "wave" | "hand_wave" | "waving" | "wave_hand" => "wave",
        "approval" | "thumbs_up" | "thumb_up" | "ok_sign" | "okay" => "approval",
        "peace_sign" | "peace" | "victory" | "v_sign" => "peace",
        "open_palm" | "open_hand" | "stop_sign" | "high_five" => "open_hand",
        "clapping" | "clap" | "applause" => "clap",
        "hands_up" => "hands_up",
        "fist" | "fist_bump" => "fist",
        "heart" | "heart_hands" => "heart",
        "crossed_arms" | "arms_crossed" => "crossed_arms",
        _ => "unknown",
    }
}

/// Map a raw emotion label to the standard vocabulary.
pub fn standardize_emotion(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "happy" | "happiness" | "joy" | "joyful" | "smile" | "smiling" => "happy",
        "surprise" | "surprised" | "shock" | "shocked" | "amazed" => "surprise",
        "neutral" | "calm" | "normal" | "default" => "neutral",
        "sad" | "sadness" | "unhappy" => "sad",
        "angry" | "anger" | "mad" => "anger",
        "fear" | "scared" | "afraid" => "fear",
        "disgust" | "disgusted" => "disgust",
        "curious" | "curiosity" | "interested" => "curious",
        _ => "unknown",
    }
}

/// Signed valence for a standardized emotion, in [-1, 1].
pub fn emotion_valence(emotion: &str) -> f64 {
    match emotion {
        "happy" => 0.8,
        "surprise" => 0.4,
        "curious" => 0.3,
        "neutral" | "unknown" => 0.0,
        "sad" => -0.6,
        "fear" => -0.7,
        "disgust" => -0.7,
        "anger" => -0.8,
        _ => 0.0,
    }
}

/// Whether a standardized emotion reads as positive.
pub fn is_positive_emotion(emotion: &str) -> bool {
    emotion_valence(emotion) > 0.1
}

/// Whether a standardized emotion reads as negative.
pub fn is_negative_emotion(emotion: &str) -> bool {
    emotion_valence(emotion) < -0.1
}

/// Classify text size from its bbox area as a fraction of the frame.
///
/// When the frame area is unknown the pixel-area thresholds from the
/// historical pipeline apply.
pub fn classify_text_size(bbox: Option<&BBox>, frame_area: Option<f64>) -> TextSizeClass {
    let Some(bbox) = bbox else {
        return TextSizeClass::M;
    };
    let area = bbox.area();

    if let Some(frame_area) = frame_area.filter(|a| *a > 0.0) {
        let fraction = area / frame_area;
        return if fraction > 0.15 {
            TextSizeClass::Xl
        } else if fraction > 0.05 {
            TextSizeClass::L
        } else if fraction > 0.01 {
            TextSizeClass::M
        } else {
            TextSizeClass::S
        };
    }

    if area > 40_000.0 {
        TextSizeClass::Xl
    } else if area > 10_000.0 {
        TextSizeClass::L
    } else if area > 1_000.0 {
        TextSizeClass::M
    } else {
        TextSizeClass::S
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_standardization() {
        assert_eq!(standardize_gesture("thumbs_up"), "approval");
        assert_eq!(standardize_gesture("Finger_Point_Up"), "pointing");
        assert_eq!(standardize_gesture("  wave_hand "), "wave");
        assert_eq!(standardize_gesture("somersault"), "unknown");
        assert_eq!(standardize_gesture(""), "unknown");
    }

    #[test]
    fn test_emotion_standardization() {
        assert_eq!(standardize_emotion("Joyful"), "happy");
        assert_eq!(standardize_emotion("shocked"), "surprise");
        assert_eq!(standardize_emotion("mad"), "anger");
        assert_eq!(standardize_emotion("???"), "unknown");
    }

    #[test]
    fn test_valence_signs() {
        assert!(is_positive_emotion("happy"));
        assert!(is_negative_emotion("anger"));
        assert!(!is_positive_emotion("neutral"));
        assert!(!is_negative_emotion("neutral"));
    }

    #[test]
    fn test_text_size_from_frame_fraction() {
        let frame = Some(1080.0 * 1920.0);
        let big = BBox { x: 0.0, y: 0.0, width: 1000.0, height: 400.0 };
        let small = BBox { x: 0.0, y: 0.0, width: 80.0, height: 30.0 };
        assert_eq!(classify_text_size(Some(&big), frame), TextSizeClass::Xl);
        assert_eq!(classify_text_size(Some(&small), frame), TextSizeClass::S);
        assert_eq!(classify_text_size(None, frame), TextSizeClass::M);
    }

    #[test]
    fn test_text_size_pixel_fallback() {
        let medium = BBox { x: 0.0, y: 0.0, width: 100.0, height: 50.0 };
        assert_eq!(classify_text_size(Some(&medium), None), TextSizeClass::M);
    }
}
