//! Configuration loading for mnemon.
//!
//! Layered precedence: built-in defaults, then the config file
//! (`~/.config/mnemon/config.toml`), then environment variables
//! (`MNEMON_*`). CLI flags are applied by the caller after loading.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::MemoryError;
use crate::item::{MemoryKind, MemorySource, SALIENCE_FLOOR};

/// Decay and drift tuning for lifecycle passes.
///
/// Salience halves every `*_half_life_days` of disuse. Items at or above
/// the protection threshold decay on a stretched half-life so strongly
/// reinforced memories fade slower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Half-life in days for episodic items
    #[serde(default = "default_episodic_half_life")]
    pub episodic_half_life_days: f64,

    /// Half-life in days for semantic items
    #[serde(default = "default_semantic_half_life")]
    pub semantic_half_life_days: f64,

    /// Half-life in days for procedural items
    #[serde(default = "default_procedural_half_life")]
    pub procedural_half_life_days: f64,

    /// Salience at or below which an item is recommended stale
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold: f64,

    /// Salience at or below which an item is recommended archived
    #[serde(default = "default_archive_threshold")]
    pub archive_threshold: f64,

    /// Decay never reduces salience below this floor
    #[serde(default = "default_salience_floor")]
    pub salience_floor: f64,

    /// Items at or above this salience decay on a stretched half-life
    #[serde(default = "default_high_salience_protection")]
    pub high_salience_protection: f64,

    /// Half-life multiplier for protected items
    #[serde(default = "default_protection_factor")]
    pub protection_factor: f64,

    /// Days without use before an item is flagged for review
    #[serde(default = "default_reconfirm_after_days")]
    pub reconfirm_after_days: i64,

    /// Stricter window for identity-bearing items
    #[serde(default = "default_identity_reconfirm_days")]
    pub identity_reconfirm_days: i64,

    /// Days without use before a procedural item is flagged as unpracticed
    #[serde(default = "default_procedural_refresh_days")]
    pub procedural_refresh_days: i64,
}

fn default_episodic_half_life() -> f64 {
    30.0
}

fn default_semantic_half_life() -> f64 {
    90.0
}

fn default_procedural_half_life() -> f64 {
    180.0
}

fn default_stale_threshold() -> f64 {
    0.2
}

fn default_archive_threshold() -> f64 {
    0.05
}

fn default_salience_floor() -> f64 {
    SALIENCE_FLOOR
}

// Above the documented 0.8 figure: an item at exactly 0.8 must decay on
// the plain half-life.
fn default_high_salience_protection() -> f64 {
    0.85
}

fn default_protection_factor() -> f64 {
    1.5
}

fn default_reconfirm_after_days() -> i64 {
    60
}

fn default_identity_reconfirm_days() -> i64 {
    30
}

fn default_procedural_refresh_days() -> i64 {
    180
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            episodic_half_life_days: default_episodic_half_life(),
            semantic_half_life_days: default_semantic_half_life(),
            procedural_half_life_days: default_procedural_half_life(),
            stale_threshold: default_stale_threshold(),
            archive_threshold: default_archive_threshold(),
            salience_floor: default_salience_floor(),
            high_salience_protection: default_high_salience_protection(),
            protection_factor: default_protection_factor(),
            reconfirm_after_days: default_reconfirm_after_days(),
            identity_reconfirm_days: default_identity_reconfirm_days(),
            procedural_refresh_days: default_procedural_refresh_days(),
        }
    }
}

impl DecayConfig {
    /// Half-life in days for the given kind.
    pub fn half_life_days(&self, kind: MemoryKind) -> f64 {
        match kind {
            MemoryKind::Episodic => self.episodic_half_life_days,
            MemoryKind::Semantic => self.semantic_half_life_days,
            MemoryKind::Procedural => self.procedural_half_life_days,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for kind in MemoryKind::ALL {
            if self.half_life_days(kind) <= 0.0 {
                return Err(format!("{} half-life must be > 0 days", kind));
            }
        }
        if self.salience_floor <= 0.0 {
            return Err("salience_floor must be > 0".to_string());
        }
        if self.archive_threshold < self.salience_floor {
            return Err(format!(
                "archive_threshold {} must be >= salience_floor {}",
                self.archive_threshold, self.salience_floor
            ));
        }
        if self.stale_threshold <= self.archive_threshold {
            return Err(format!(
                "stale_threshold {} must be > archive_threshold {}",
                self.stale_threshold, self.archive_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.high_salience_protection) {
            return Err(format!(
                "high_salience_protection must be 0.0-1.0, got {}",
                self.high_salience_protection
            ));
        }
        if self.protection_factor < 1.0 {
            return Err("protection_factor must be >= 1.0".to_string());
        }
        if self.reconfirm_after_days <= 0 || self.identity_reconfirm_days <= 0 {
            return Err("reconfirmation windows must be > 0 days".to_string());
        }
        if self.identity_reconfirm_days > self.reconfirm_after_days {
            return Err("identity window must not be looser than the general one".to_string());
        }
        if self.procedural_refresh_days <= 0 {
            return Err("procedural_refresh_days must be > 0".to_string());
        }
        Ok(())
    }
}

/// Bounds for per-session working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemoryConfig {
    /// Maximum items retained per session; the oldest entry drops first
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

fn default_session_capacity() -> usize {
    50
}

impl Default for WorkingMemoryConfig {
    fn default() -> Self {
        Self {
            session_capacity: default_session_capacity(),
        }
    }
}

impl WorkingMemoryConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_capacity == 0 {
            return Err("session_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

/// Store-time policy knobs: payload bounds, salience modifiers, identity
/// handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum payload length accepted at store time
    #[serde(default = "default_min_payload_len")]
    pub min_payload_len: usize,

    /// Maximum payload length accepted at store time
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,

    /// Tags that mark an item as identity-bearing
    #[serde(default = "default_identity_tags")]
    pub identity_tags: Vec<String>,

    /// Salience adjustment for user-stated items
    #[serde(default = "default_user_modifier")]
    pub user_modifier: f64,

    /// Salience adjustment for system-produced items
    #[serde(default)]
    pub system_modifier: f64,

    /// Salience adjustment for imported items
    #[serde(default = "default_import_modifier")]
    pub import_modifier: f64,

    /// Salience adjustment for inferred items
    #[serde(default = "default_inference_modifier")]
    pub inference_modifier: f64,

    /// Extra salience for procedural items
    #[serde(default = "default_procedural_boost")]
    pub procedural_boost: f64,

    /// Extra salience for identity-bearing items
    #[serde(default = "default_identity_boost")]
    pub identity_boost: f64,

    /// Tag applied when a store request carries none
    #[serde(default = "default_fallback_tag")]
    pub fallback_tag: String,
}

fn default_min_payload_len() -> usize {
    1
}

fn default_max_payload_len() -> usize {
    10_000
}

fn default_identity_tags() -> Vec<String> {
    vec!["identity".to_string(), "profile:identity".to_string()]
}

fn default_user_modifier() -> f64 {
    0.05
}

fn default_import_modifier() -> f64 {
    -0.05
}

fn default_inference_modifier() -> f64 {
    -0.10
}

fn default_procedural_boost() -> f64 {
    0.05
}

fn default_identity_boost() -> f64 {
    0.15
}

fn default_fallback_tag() -> String {
    "general".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_payload_len: default_min_payload_len(),
            max_payload_len: default_max_payload_len(),
            identity_tags: default_identity_tags(),
            user_modifier: default_user_modifier(),
            system_modifier: 0.0,
            import_modifier: default_import_modifier(),
            inference_modifier: default_inference_modifier(),
            procedural_boost: default_procedural_boost(),
            identity_boost: default_identity_boost(),
            fallback_tag: default_fallback_tag(),
        }
    }
}

impl PolicyConfig {
    /// Salience adjustment for the given source.
    pub fn source_modifier(&self, source: MemorySource) -> f64 {
        match source {
            MemorySource::User => self.user_modifier,
            MemorySource::System => self.system_modifier,
            MemorySource::Import => self.import_modifier,
            MemorySource::Inference => self.inference_modifier,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_payload_len == 0 {
            return Err("min_payload_len must be > 0".to_string());
        }
        if self.max_payload_len < self.min_payload_len {
            return Err(format!(
                "max_payload_len {} must be >= min_payload_len {}",
                self.max_payload_len, self.min_payload_len
            ));
        }
        if self.fallback_tag.is_empty() {
            return Err("fallback_tag must not be empty".to_string());
        }
        Ok(())
    }
}

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory for memory files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Working memory bounds
    #[serde(default)]
    pub working_memory: WorkingMemoryConfig,

    /// Decay and drift tuning
    #[serde(default)]
    pub decay: DecayConfig,

    /// Store-time policy knobs
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "mnemon")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            working_memory: WorkingMemoryConfig::default(),
            decay: DecayConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`~/.config/mnemon/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`MNEMON_*`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    /// Nested keys use a double underscore in the environment, e.g.
    /// `MNEMON_DECAY__STALE_THRESHOLD`.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, MemoryError> {
        let config_dir = ProjectDirs::from("", "", "mnemon")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            // 1. Built-in defaults
            .set_default("data_dir", default_data_dir())
            .map_err(|e| MemoryError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| MemoryError::Config(e.to_string()))?
            // 2. Default config file (~/.config/mnemon/config.toml)
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        // 3. Explicit config file, required when the caller names one
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment, last word before CLI flag overrides
        builder = builder.add_source(
            Environment::with_prefix("MNEMON")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| MemoryError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| MemoryError::Config(e.to_string()))
    }

    /// Validate every configuration block.
    pub fn validate(&self) -> Result<(), MemoryError> {
        self.working_memory
            .validate()
            .map_err(MemoryError::Config)?;
        self.decay.validate().map_err(MemoryError::Config)?;
        self.policy.validate().map_err(MemoryError::Config)?;
        Ok(())
    }

    /// Expand `~` in data_dir to the actual home directory.
    pub fn expanded_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }
}
