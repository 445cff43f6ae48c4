//! Configuration loading, validation, and management for Handoff.
//!
//! Loads configuration from `~/.handoff/config.toml` with environment
//! variable overrides. Every knob has a default, so a missing file is not an
//! error. The size-tier breakpoints and caps are empirical constants kept
//! configurable rather than hard-coded.

use handoff_core::{Profile, TierBreakpoints, TierValues};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.handoff/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock budget for one generation run, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Profile used when the caller does not pick one
    #[serde(default = "default_profile")]
    pub default_profile: Profile,

    /// Embed the raw transcript in Digest packages
    #[serde(default)]
    pub include_transcript: bool,

    /// Size-tier breakpoints
    #[serde(default)]
    pub tiers: TierBreakpoints,

    /// Adaptive caps per size tier
    #[serde(default)]
    pub caps: CapsConfig,

    /// Extractor tuning
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Cognitive segmenter tuning
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Causal chain linker tuning
    #[serde(default)]
    pub causal: CausalConfig,

    /// Output profile tuning
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

fn default_deadline_ms() -> u64 {
    10_000
}
fn default_profile() -> Profile {
    Profile::Digest
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsConfig {
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,

    /// Most-recent message refs attached per topic
    #[serde(default = "default_topic_refs")]
    pub topic_refs: TierValues<usize>,

    #[serde(default = "default_decision_caps")]
    pub decisions: TierValues<usize>,

    #[serde(default = "default_insight_caps")]
    pub insights: TierValues<usize>,

    /// Per constraint category
    #[serde(default = "default_constraint_caps")]
    pub constraints: TierValues<usize>,

    /// Messages per fingerprint chunk
    #[serde(default = "default_fingerprint_chunk")]
    pub fingerprint_chunk: TierValues<usize>,
}

fn default_max_topics() -> usize {
    7
}
fn default_topic_refs() -> TierValues<usize> {
    TierValues::new(3, 5, 8)
}
fn default_decision_caps() -> TierValues<usize> {
    TierValues::new(10, 15, 20)
}
fn default_insight_caps() -> TierValues<usize> {
    TierValues::new(15, 20, 30)
}
fn default_constraint_caps() -> TierValues<usize> {
    TierValues::new(10, 15, 15)
}
fn default_fingerprint_chunk() -> TierValues<usize> {
    TierValues::new(60, 80, 120)
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            max_topics: default_max_topics(),
            topic_refs: default_topic_refs(),
            decisions: default_decision_caps(),
            insights: default_insight_caps(),
            constraints: default_constraint_caps(),
            fingerprint_chunk: default_fingerprint_chunk(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_decision_chunk_chars")]
    pub decision_chunk_chars: usize,

    #[serde(default = "default_insight_chunk_chars")]
    pub insight_chunk_chars: usize,

    /// Terms present in at least this share of messages are boilerplate
    #[serde(default = "default_boilerplate_df_ratio")]
    pub boilerplate_df_ratio: f64,

    /// Boilerplate suppression only applies from this many messages up
    #[serde(default = "default_boilerplate_min_messages")]
    pub boilerplate_min_messages: usize,

    #[serde(default = "default_decision_dedup")]
    pub decision_dedup: f64,

    #[serde(default = "default_insight_dedup")]
    pub insight_dedup: f64,

    #[serde(default = "default_constraint_dedup")]
    pub constraint_dedup: f64,
}

fn default_decision_chunk_chars() -> usize {
    600
}
fn default_insight_chunk_chars() -> usize {
    400
}
fn default_boilerplate_df_ratio() -> f64 {
    0.6
}
fn default_boilerplate_min_messages() -> usize {
    5
}
fn default_decision_dedup() -> f64 {
    0.7
}
fn default_insight_dedup() -> f64 {
    0.7
}
fn default_constraint_dedup() -> f64 {
    0.75
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            decision_chunk_chars: default_decision_chunk_chars(),
            insight_chunk_chars: default_insight_chunk_chars(),
            boilerplate_df_ratio: default_boilerplate_df_ratio(),
            boilerplate_min_messages: default_boilerplate_min_messages(),
            decision_dedup: default_decision_dedup(),
            insight_dedup: default_insight_dedup(),
            constraint_dedup: default_constraint_dedup(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_min_segment")]
    pub min_segment: usize,

    #[serde(default = "default_max_uniform_segments")]
    pub max_uniform_segments: usize,
}

fn default_window() -> usize {
    5
}
fn default_similarity_threshold() -> f64 {
    0.25
}
fn default_min_segment() -> usize {
    3
}
fn default_max_uniform_segments() -> usize {
    10
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            similarity_threshold: default_similarity_threshold(),
            min_segment: default_min_segment(),
            max_uniform_segments: default_max_uniform_segments(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalConfig {
    #[serde(default = "default_min_impact")]
    pub min_impact: f64,

    #[serde(default = "default_max_chains")]
    pub max_chains: usize,

    /// Decisions considered, in original order
    #[serde(default = "default_max_decisions")]
    pub max_decisions: usize,

    #[serde(default = "default_trigger_similarity")]
    pub trigger_similarity: f64,
}

fn default_min_impact() -> f64 {
    0.3
}
fn default_max_chains() -> usize {
    10
}
fn default_max_decisions() -> usize {
    20
}
fn default_trigger_similarity() -> f64 {
    0.2
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            min_impact: default_min_impact(),
            max_chains: default_max_chains(),
            max_decisions: default_max_decisions(),
            trigger_similarity: default_trigger_similarity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Ultra keeps topics weighing more than this
    #[serde(default = "default_ultra_topic_min_weight")]
    pub ultra_topic_min_weight: u32,

    #[serde(default = "default_ultra_max_insights")]
    pub ultra_max_insights: usize,

    #[serde(default = "default_macro_phases")]
    pub macro_phases: usize,

    #[serde(default = "default_narrative_chars")]
    pub narrative_chars: usize,

    /// Messages per Digest timeline range
    #[serde(default = "default_timeline_range")]
    pub timeline_range: usize,
}

fn default_ultra_topic_min_weight() -> u32 {
    500
}
fn default_ultra_max_insights() -> usize {
    5
}
fn default_macro_phases() -> usize {
    7
}
fn default_narrative_chars() -> usize {
    280
}
fn default_timeline_range() -> usize {
    25
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            ultra_topic_min_weight: default_ultra_topic_min_weight(),
            ultra_max_insights: default_ultra_max_insights(),
            macro_phases: default_macro_phases(),
            narrative_chars: default_narrative_chars(),
            timeline_range: default_timeline_range(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path with env var overrides.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(raw) = std::env::var("HANDOFF_DEADLINE_MS") {
            config.deadline_ms = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("HANDOFF_DEADLINE_MS is not a number: {raw}"))
            })?;
        }

        if let Ok(raw) = std::env::var("HANDOFF_PROFILE") {
            config.default_profile = raw
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("HANDOFF_PROFILE: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".handoff")
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.medium_from == 0 || self.tiers.large_from <= self.tiers.medium_from {
            return Err(ConfigError::ValidationError(
                "tiers must satisfy 0 < medium_from < large_from".into(),
            ));
        }

        let ratios = [
            ("extraction.boilerplate_df_ratio", self.extraction.boilerplate_df_ratio),
            ("extraction.decision_dedup", self.extraction.decision_dedup),
            ("extraction.insight_dedup", self.extraction.insight_dedup),
            ("extraction.constraint_dedup", self.extraction.constraint_dedup),
            ("segmentation.similarity_threshold", self.segmentation.similarity_threshold),
            ("causal.min_impact", self.causal.min_impact),
            ("causal.trigger_similarity", self.causal.trigger_similarity),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0 (got {value})"
                )));
            }
        }

        let chunks = self.caps.fingerprint_chunk;
        if chunks.small == 0 || chunks.medium == 0 || chunks.large == 0 {
            return Err(ConfigError::ValidationError(
                "caps.fingerprint_chunk values must be > 0".into(),
            ));
        }

        if self.segmentation.window == 0 || self.profiles.timeline_range == 0 {
            return Err(ConfigError::ValidationError(
                "segmentation.window and profiles.timeline_range must be > 0".into(),
            ));
        }

        if self.profiles.macro_phases == 0 || self.caps.max_topics == 0 {
            return Err(ConfigError::ValidationError(
                "profiles.macro_phases and caps.max_topics must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `handoff config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            default_profile: default_profile(),
            include_transcript: false,
            tiers: TierBreakpoints::default(),
            caps: CapsConfig::default(),
            extraction: ExtractionConfig::default(),
            segmentation: SegmentationConfig::default(),
            causal: CausalConfig::default(),
            profiles: ProfilesConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for handoff_core::Error {
    fn from(err: ConfigError) -> Self {
        handoff_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.deadline_ms, 10_000);
        assert_eq!(config.default_profile, Profile::Digest);
        assert_eq!(config.tiers.medium_from, 100);
        assert_eq!(config.caps.decisions, TierValues::new(10, 15, 20));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_str = r#"
deadline_ms = 2500
default_profile = "ultra_plus"

[tiers]
medium_from = 50
large_from = 400

[caps.insights]
small = 5
medium = 10
large = 12
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deadline_ms, 2500);
        assert_eq!(config.default_profile, Profile::UltraPlus);
        assert_eq!(config.tiers.large_from, 400);
        assert_eq!(config.caps.insights.large, 12);
        assert_eq!(config.caps.decisions, TierValues::new(10, 15, 20));
        assert_eq!(config.segmentation.window, 5);
    }

    #[test]
    fn inverted_tiers_rejected() {
        let config = EngineConfig {
            tiers: TierBreakpoints {
                medium_from: 500,
                large_from: 100,
            },
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = EngineConfig::default();
        config.segmentation.similarity_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let mut config = EngineConfig::default();
        config.caps.fingerprint_chunk.medium = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = EngineConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), EngineConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "include_transcript = true\n[causal]\nmax_chains = 4").unwrap();
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert!(config.include_transcript);
        assert_eq!(config.causal.max_chains, 4);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deadline_ms = \"soon\"").unwrap();
        let err = EngineConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = EngineConfig::default_toml();
        assert!(toml_str.contains("deadline_ms = 10000"));
        assert!(toml_str.contains("[segmentation]"));
    }

    #[test]
    fn config_error_converts_to_core_error() {
        let err: handoff_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(err.to_string().contains("bad"));
    }
}
