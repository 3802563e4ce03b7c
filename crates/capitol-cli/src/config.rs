//! Configuration for the `capitol` binary.
//!
//! Values come from the TOML file named by `--config` (optional) and are
//! overridden by `CAPITOL_*` environment variables. Nested keys use a double
//! underscore, e.g. `CAPITOL_SCORING__MODEL=llama3.1`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use capitol_core::{grouping::GroupingParams, relevance::RelevanceConfig};
use capitol_pipeline::{analyzer::AnalyzerConfig, reconcile::ReconcileConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// SQLite database file; `~` is expanded.
  pub store_path: PathBuf,
  pub grouping:   GroupingParams,
  pub relevance:  RelevanceConfig,
  pub scoring:    ScoringConfig,
  pub reconcile:  ReconcileConfig,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("capitol.db"),
      grouping:   GroupingParams::default(),
      relevance:  RelevanceConfig::default(),
      scoring:    ScoringConfig::default(),
      reconcile:  ReconcileConfig::default(),
    }
  }
}

/// An OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  /// Base URL; `/chat/completions` is appended.
  pub endpoint:         String,
  /// Sent as a bearer token when set.
  pub api_key:          Option<String>,
  pub model:            String,
  pub analysis_version: String,
  pub temperature:      f32,
  pub timeout_secs:     u64,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      endpoint:         "http://localhost:11434/v1".to_owned(),
      api_key:          None,
      model:            "llama3.1".to_owned(),
      analysis_version: "v1".to_owned(),
      temperature:      0.1,
      timeout_secs:     120,
    }
  }
}

impl ScoringConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  pub fn analyzer_config(&self) -> AnalyzerConfig {
    AnalyzerConfig {
      analysis_version: self.analysis_version.clone(),
      temperature:      self.temperature,
      timeout:          self.timeout(),
    }
  }
}

/// Read `path` (if it exists) and the environment into a [`CliConfig`].
pub fn load(path: &Path) -> anyhow::Result<CliConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("CAPITOL").separator("__"))
    .build()
    .context("failed to read config file")?;

  let mut cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Replace a leading `~` with `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
  if let Ok(rest) = path.strip_prefix("~")
    && let Some(home) = std::env::var_os("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
