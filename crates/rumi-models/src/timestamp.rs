//! Timestamp parsing and frame conversion utilities.
//!
//! Every analyzer reports time differently: float seconds, frame indices,
//! `"<n>s"` suffixes, `"0-1s"` bucket ranges, or clock strings. This module
//! normalizes all of them to a single non-negative seconds value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in time within a video, in non-negative seconds.
///
/// Construction is validating: a `Timestamp` can never hold a negative or
/// non-finite value, which makes the ordering total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// Zero seconds.
    pub const ZERO: Timestamp = Timestamp(0.0);

    /// Create a timestamp from seconds, rejecting negative and non-finite values.
    pub fn new(seconds: f64) -> Option<Self> {
        if seconds.is_finite() && seconds >= 0.0 {
            Some(Self(seconds))
        } else {
            None
        }
    }

    /// Seconds since the start of the video.
    pub fn seconds(&self) -> f64 {
        self.0
    }

    /// The whole second this timestamp falls into.
    pub fn second_index(&self) -> usize {
        self.0 as usize
    }

    /// Clamp into `[0, duration]`.
    pub fn clamp_to(&self, duration: f64) -> Self {
        Self(self.0.min(duration.max(0.0)))
    }

    /// Parse a timestamp from a string.
    ///
    /// Accepted forms:
    /// - plain real or integer seconds: `"2.5"`, `"3"`
    /// - suffixed seconds: `"2s"`
    /// - bucket ranges (start wins): `"0-1s"`, `"15-16s"`
    /// - clock strings: `"MM:SS"`, `"HH:MM:SS"`
    ///
    /// Empty, negative, or unrecognized input yields `None`. This function
    /// never panics; callers record the warning.
    pub fn parse_str(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if value.contains(':') {
            return parse_clock(value);
        }

        // "0-1s" bucket range: the start of the bucket is the timestamp.
        // Split only when the '-' is not a leading sign.
        let stripped = value.strip_suffix('s').unwrap_or(value);
        if let Some(dash) = stripped.rfind('-') {
            if dash > 0 {
                return stripped[..dash].trim().parse::<f64>().ok().and_then(Self::new);
            }
        }

        stripped.trim().parse::<f64>().ok().and_then(Self::new)
    }

    /// Parse a timestamp from a JSON value (number or string).
    pub fn parse_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().and_then(Self::new),
            serde_json::Value::String(s) => Self::parse_str(s),
            _ => None,
        }
    }
}

impl Eq for Timestamp {}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Total because construction rejects NaN.
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.0 - self.0.floor()).abs() > 0.0001 {
            write!(f, "{:.2}s", self.0)
        } else {
            write!(f, "{}s", self.0 as u64)
        }
    }
}

/// Parse `MM:SS` or `HH:MM:SS` clock strings.
fn parse_clock(value: &str) -> Option<Timestamp> {
    let parts: Vec<&str> = value.split(':').collect();
    let components: Option<Vec<f64>> = parts
        .iter()
        .map(|p| p.trim().parse::<f64>().ok().filter(|v| *v >= 0.0))
        .collect();
    let components = components?;

    let seconds = match components.as_slice() {
        [m, s] => m * 60.0 + s,
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        _ => return None,
    };
    Timestamp::new(seconds)
}

/// Convert a frame index to seconds at the given fps.
///
/// Only the original video fps is valid here; analyzer sampling rates are
/// metadata and must not be used for conversion.
pub fn frame_to_seconds(frame: u64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    frame as f64 / fps
}

/// Convert seconds back to the nearest frame index at the given fps.
pub fn seconds_to_frame(seconds: f64, fps: f64) -> u64 {
    if fps <= 0.0 || seconds <= 0.0 {
        return 0;
    }
    (seconds * fps).round() as u64
}

/// Format a bucket range like `"0.0-1.0s"` for timeline output.
pub fn format_range(start: f64, end: f64) -> String {
    format!("{:.1}-{:.1}s", start, end)
}
