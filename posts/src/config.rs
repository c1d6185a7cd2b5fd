use crate::error::{Error, Result};

use std::fs;
use std::path::Path;

use fibre_loader::LoaderConfig;
use serde::Deserialize;

/// Loader settings for each entity of a request scope.
///
/// ```yaml
/// users:
///   max_batch: 50
///   wait: 5ms
/// posts:
///   time_to_live: 0s
/// ```
///
/// Missing entities and fields fall back to `LoaderConfig::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadersConfig {
  pub users: LoaderConfig,
  pub posts: LoaderConfig,
  pub comments: LoaderConfig,
}

impl LoadersConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let raw = fs::read_to_string(path)?;
    Self::from_yaml_str(&raw)
  }
}
