//! Resolver configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::join::JoinKind;

const DEFAULT_CONFIG_FILES: [&str; 3] = [
  "css-url-resolver.json",
  "css-url-resolver.yaml",
  "css-url-resolver.yml",
];

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the configuration file from disk.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Failed to parse a JSON configuration file.
  #[error("failed to parse {}: {source}", path.display())]
  Json {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// Failed to parse a YAML configuration file.
  #[error("failed to parse {}: {source}", path.display())]
  Yaml {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_yaml::Error,
  },
}

/// Options controlling how `url()` references are resolved and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
  /// Directory root-relative URIs resolve against, and the ceiling of the search strategy.
  ///
  /// `None` leaves root-relative URIs untouched. An empty path treats them as filesystem paths.
  pub root: Option<PathBuf>,
  /// Let the search strategy attempt the root directory itself.
  pub include_root: bool,
  /// Maximum number of directories the search strategy attempts. `None` is unbounded.
  pub attempts: Option<usize>,
  /// Reattach `?query` and `#fragment` suffixes to rewritten URIs.
  pub keep_query: bool,
  /// Emit absolute paths instead of paths relative to the generated stylesheet.
  pub absolute: bool,
  /// Emit a trace of every resolution.
  pub debug: bool,
  /// Built-in join strategy.
  pub join: JoinKind,
  /// Files whose presence marks a directory as a package boundary.
  pub package_markers: Vec<String>,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      root: None,
      include_root: false,
      attempts: None,
      keep_query: false,
      absolute: false,
      debug: false,
      join: JoinKind::Default,
      package_markers: vec!["package.json".into()],
    }
  }
}

impl ResolverConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// When no configuration file exists or it fails to load we fall back to default values so
  /// callers can continue with sensible assumptions.
  pub fn discover(dir: &Path) -> Self {
    DEFAULT_CONFIG_FILES
      .iter()
      .map(|name| dir.join(name))
      .find(|candidate| candidate.is_file())
      .and_then(|candidate| match Self::from_path(&candidate) {
        Ok(config) => Some(config),
        Err(err) => {
          tracing::warn!("ignoring configuration: {err}");
          None
        }
      })
      .unwrap_or_default()
  }

  /// Read configuration from a JSON or YAML file, chosen by extension.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
      serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
      })
    } else {
      serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
      })
    }
  }

  /// Root directory to use for root-relative URIs, anchored at `base` when relative.
  pub fn resolved_root(&self, base: &Path) -> Option<PathBuf> {
    self.root.as_ref().map(|root| {
      if root.as_os_str().is_empty() || root.is_absolute() {
        root.clone()
      } else {
        crate::paths::normalize_path(&base.join(root))
      }
    })
  }
}
