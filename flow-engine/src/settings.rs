//! Settings for the demo binary. The library
//! itself takes its timeout and pipeline description as plain constructor
//! arguments — only the demo host loads them from a file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub flow: FlowSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowSettings {
    #[serde(with = "humantime_serde")]
    pub flow_timeout: Duration,
    pub pipeline: PipelineShape,
}

/// Which of the reference pipelines the demo binary wires up.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineShape {
    /// A single `EchoModule` stage.
    Echo,
    /// Two `FnStageModule` stages: split on whitespace, then uppercase.
    Uppercase,
    /// A `{converge, N}` `FoldModule` counting words, per S4.
    WordCount { converge: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

impl Settings {
    /// Loads settings from `config_path`, then applies `FLOWD__`-prefixed
    /// environment variable overrides (e.g. `FLOWD__FLOW__FLOW_TIMEOUT`).
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = config::Config::builder()
            .add_source(config::File::from(config_path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FLOWD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(raw.try_deserialize()?)
    }
}
