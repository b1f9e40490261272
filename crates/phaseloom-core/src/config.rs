use crate::errors::ConfigError;
use crate::seeds::PHASE_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, rename = "configVersion", alias = "version")]
    pub version: u32,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            database: default_database(),
            engine: EngineConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_phase_count")]
    pub phase_count: u32,
    /// Timeout applied to each external provider call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phase_count: default_phase_count(),
            timeout_seconds: default_timeout_seconds(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many trailing completed phases feed the sequential context.
    #[serde(default = "default_sequential_window")]
    pub sequential_window: usize,
    /// Maximum semantic hits merged into the context.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity for a semantic hit.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Assembled context is truncated past this many characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            sequential_window: default_sequential_window(),
            top_k: default_top_k(),
            threshold: default_threshold(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_database() -> String {
    "phaseloom.db".to_string()
}
fn default_phase_count() -> u32 {
    PHASE_COUNT
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_sequential_window() -> usize {
    3
}
fn default_top_k() -> usize {
    3
}
fn default_threshold() -> f64 {
    0.6
}
fn default_max_context_chars() -> usize {
    6000
}
fn default_chat_model() -> String {
    "gpt-4o".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    // serde_ignored wrapper to capture unknown fields
    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        let meaningful: Vec<_> = ignored_keys
            .iter()
            .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
            .collect();
        if strict && !meaningful.is_empty() {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                meaningful,
                path.display()
            )));
        }
        if !meaningful.is_empty() {
            tracing::warn!(keys = ?meaningful, "ignored unknown config fields");
        }
    }

    if cfg.version != 0 && cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: 0, {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.engine.phase_count == 0 {
        return Err(ConfigError("engine.phase_count must be at least 1".into()));
    }
    let t = cfg.engine.retrieval.threshold;
    if !(0.0..=1.0).contains(&t) {
        return Err(ConfigError(format!(
            "engine.retrieval.threshold must be within 0..=1 (got {t})"
        )));
    }
    if cfg.engine.retrieval.max_context_chars == 0 {
        return Err(ConfigError(
            "engine.retrieval.max_context_chars must be positive".into(),
        ));
    }
    Ok(())
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
database: phaseloom.db
engine:
  phase_count: 14
  timeout_seconds: 30
  generation:
    temperature: 0.7
    max_tokens: 2000
  retrieval:
    sequential_window: 3
    top_k: 3
    threshold: 0.6
    max_context_chars: 6000
providers:
  chat_model: gpt-4o
  embedding_model: text-embedding-3-small
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_workflow_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.engine.phase_count, 14);
        assert_eq!(cfg.engine.retrieval.sequential_window, 3);
        assert_eq!(cfg.engine.retrieval.top_k, 3);
        assert_eq!(cfg.engine.retrieval.threshold, 0.6);
        assert_eq!(cfg.engine.retrieval.max_context_chars, 6000);
    }

    #[test]
    fn sample_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phaseloom.yaml");
        write_sample_config(&path).unwrap();
        let cfg = load_config(&path, true).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn strict_mode_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "version: 1\nnot_a_key: true\n").unwrap();
        assert!(load_config(&path, true).is_err());
        assert!(load_config(&path, false).is_ok());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "version: 1\nengine:\n  retrieval:\n    threshold: 1.5\n").unwrap();
        assert!(load_config(&path, false).is_err());
    }
}
