//! Response validation for the six-block contract.
//!
//! The model's output is free text that should contain one JSON object.
//! Validation extracts the largest balanced `{...}` substring, remaps
//! legacy prefixed block names, verifies the six canonical blocks, and
//! normalizes per-block confidence. It never fails: garbage input yields
//! an empty result with all six blocks listed missing.

use rumi_models::{AnalysisType, WarningCounters};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::prompts::CANONICAL_BLOCKS;

/// Default confidence assigned when a block omits or mangles its own.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Validation outcome for one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedResponse {
    pub blocks_present: Vec<String>,
    pub blocks_missing: Vec<String>,
    pub data: Map<String, Value>,
}

impl ValidatedResponse {
    /// True when every canonical block arrived.
    pub fn is_complete(&self) -> bool {
        self.blocks_missing.is_empty()
    }
}

/// Validate raw response text against the six-block contract.
pub fn validate_response(
    raw: &str,
    analysis: AnalysisType,
    warnings: &mut WarningCounters,
) -> ValidatedResponse {
    let mut data = match extract_largest_object(raw) {
        Some(json) => match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(%analysis, "Response JSON did not parse to an object");
                warnings.schema_violation += 1;
                Map::new()
            }
        },
        None => {
            warn!(%analysis, "Response contained no balanced JSON object");
            warnings.schema_violation += 1;
            Map::new()
        }
    };

    remap_legacy_names(&mut data, analysis);

    let mut blocks_present = Vec::new();
    let mut blocks_missing = Vec::new();
    for block in CANONICAL_BLOCKS {
        // Non-object blocks are dropped before taking the mutable borrow.
        if data.get(block).map(|v| !v.is_object()).unwrap_or(false) {
            warn!(%analysis, block, "Block is not an object, dropping");
            warnings.schema_violation += 1;
            data.remove(block);
            blocks_missing.push(block.to_string());
            continue;
        }
        match data.get_mut(block) {
            Some(Value::Object(obj)) => {
                normalize_confidence(obj, block, warnings);
                blocks_present.push(block.to_string());
            }
            _ => blocks_missing.push(block.to_string()),
        }
    }

    if !blocks_missing.is_empty() {
        warn!(%analysis, missing = ?blocks_missing, "Response missing blocks");
        warnings.schema_violation += 1;
    }
    debug!(%analysis, present = blocks_present.len(), "Response validated");

    ValidatedResponse { blocks_present, blocks_missing, data }
}

/// Accept legacy prefixed block names (`densityCoreMetrics`) alongside the
/// canonical ones, preferring the canonical key when both exist.
fn remap_legacy_names(data: &mut Map<String, Value>, analysis: AnalysisType) {
    let prefix = analysis.legacy_prefix();
    for block in CANONICAL_BLOCKS {
        if data.contains_key(block) {
            continue;
        }
        // Exact legacy form first, then any key that ends with the block name.
        let exact = format!("{}{}", prefix, block);
        let legacy_key = if data.contains_key(&exact) {
            Some(exact)
        } else {
            data.keys().find(|k| k.ends_with(block) && k.as_str() != block).cloned()
        };
        if let Some(key) = legacy_key {
            if let Some(value) = data.remove(&key) {
                debug!(legacy = %key, canonical = block, "Remapped legacy block name");
                data.insert(block.to_string(), value);
            }
        }
    }
}

/// Clamp an existing confidence into [0, 1], or install the default.
fn normalize_confidence(block: &mut Map<String, Value>, name: &str, warnings: &mut WarningCounters) {
    let normalized = match block.get("confidence").and_then(Value::as_f64) {
        Some(c) if (0.0..=1.0).contains(&c) => return,
        Some(c) => {
            warn!(block = name, confidence = c, "Confidence out of range, clamping");
            c.clamp(0.0, 1.0)
        }
        None => {
            warn!(block = name, "Confidence missing or non-numeric, defaulting");
            DEFAULT_CONFIDENCE
        }
    };
    warnings.schema_violation += 1;
    block.insert("confidence".to_string(), json_number(normalized));
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// The largest balanced `{...}` substring, respecting strings and escapes.
fn extract_largest_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;

    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *b == b'\\' {
                escaped = true;
            } else if *b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        let len = i + 1 - start;
                        if best.map(|(_, l)| len > l).unwrap_or(true) {
                            best = Some((start, len));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(start, len)| text[start..start + len].to_string())
}
