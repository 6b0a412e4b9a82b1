//! Runner configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Output format version for the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatVersion {
    V1,
    V2,
}

/// Runner settings, loaded from the environment once and passed through
/// the pipeline explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Claude API key; required for live runs.
    pub claude_api_key: String,
    /// Apify token; required for URL mode.
    pub apify_token: String,
    /// Run the precompute engine on the bounded worker pool.
    pub use_ml_precompute: bool,
    /// Use the Sonnet model instead of Haiku.
    pub use_claude_sonnet: bool,
    pub output_format_version: OutputFormatVersion,
    /// Delay between consecutive LLM calls.
    pub prompt_delay: Duration,
    /// Maximum accepted video duration, seconds.
    pub max_video_duration: f64,
    /// Elevate InputShape and SchemaViolation to fatal.
    pub strict_mode: bool,
    /// Include temporal markers in prompt contexts.
    pub temporal_markers_enabled: bool,
    pub unified_dir: PathBuf,
    pub temporal_dir: PathBuf,
    pub insights_dir: PathBuf,
    /// Directory holding pre-populated analyzer outputs.
    pub ml_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            claude_api_key: String::new(),
            apify_token: String::new(),
            use_ml_precompute: false,
            use_claude_sonnet: false,
            output_format_version: OutputFormatVersion::V2,
            prompt_delay: Duration::from_secs(5),
            max_video_duration: 180.0,
            strict_mode: false,
            temporal_markers_enabled: true,
            unified_dir: PathBuf::from("unified_analysis"),
            temporal_dir: PathBuf::from("temporal_markers"),
            insights_dir: PathBuf::from("insights"),
            ml_dir: PathBuf::from("ml_outputs"),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            claude_api_key: std::env::var("CLAUDE_API_KEY").unwrap_or_default(),
            apify_token: std::env::var("APIFY_API_TOKEN").unwrap_or_default(),
            use_ml_precompute: env_bool("USE_ML_PRECOMPUTE", defaults.use_ml_precompute),
            use_claude_sonnet: env_bool("USE_CLAUDE_SONNET", defaults.use_claude_sonnet),
            output_format_version: match std::env::var("OUTPUT_FORMAT_VERSION").as_deref() {
                Ok("v1") => OutputFormatVersion::V1,
                _ => OutputFormatVersion::V2,
            },
            prompt_delay: Duration::from_secs(
                std::env::var("PROMPT_DELAY").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            ),
            max_video_duration: std::env::var("MAX_VIDEO_DURATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_video_duration),
            strict_mode: env_bool("RUMIAI_STRICT_MODE", false),
            temporal_markers_enabled: env_bool("RUMIAI_TEMPORAL_MARKERS", true),
            unified_dir: env_path("RUMIAI_UNIFIED_DIR", &defaults.unified_dir),
            temporal_dir: env_path("RUMIAI_TEMPORAL_DIR", &defaults.temporal_dir),
            insights_dir: env_path("RUMIAI_INSIGHTS_DIR", &defaults.insights_dir),
            ml_dir: env_path("RUMIAI_ML_DIR", &defaults.ml_dir),
        }
    }

    /// Validate the settings needed for a live run.
    pub fn validate(&self, needs_apify: bool) -> Result<(), String> {
        if self.claude_api_key.is_empty() {
            return Err("CLAUDE_API_KEY environment variable not set".to_string());
        }
        if needs_apify && self.apify_token.is_empty() {
            return Err("APIFY_API_TOKEN environment variable not set".to_string());
        }
        Ok(())
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).map(|v| v.to_lowercase() == "true").unwrap_or(default)
}

fn env_path(key: &str, default: &PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| default.clone())
}
