//! Flow configuration loaded from JSON.
//!
//! A config lists the question pods in order and may carry answers from an
//! earlier session.

use crate::builder::BuildError;
use crate::core::{Context, MachineDefinition};
use crate::flow::pods::check_pods;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SAMPLE: &str = include_str!("../assets/sample_pods.json");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid question pod: {0}")]
    InvalidPod(#[from] BuildError),
}

/// Ordered question pods plus seeded answers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub pods: Vec<MachineDefinition>,

    /// Answers from a previous session, kept unless the user starts fresh
    #[serde(default)]
    pub answers: Context,
}

impl FlowConfig {
    /// Parse and validate a config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// The bundled two-question sample: one linear pod, one branching pod.
    pub fn sample() -> Result<Self, ConfigError> {
        Self::from_json(SAMPLE)
    }

    /// Every pod must be valid and bind only the question effects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pods(&self.pods)?;
        Ok(())
    }
}
