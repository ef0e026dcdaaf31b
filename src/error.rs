//! Error kinds raised by the resolver.
//!
//! Only structurally broken input is an error. A reference that cannot be found is reported
//! through [`crate::models::ResolutionResult::NotFound`] instead, and malformed `url()` syntax is
//! passed through as literal text by the tokenizer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort processing of the current stylesheet.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A source map is present but has no usable source for the generated position.
  #[error("source map has no original source for generated position {line}:{column}")]
  MapReversal {
    /// 1-based generated line.
    line: u32,
    /// 1-based generated column.
    column: u32,
  },
  /// A join strategy produced a base or result that violates the path invariants.
  #[error("invalid join candidate {path:?}: {reason}")]
  InvalidCandidate {
    /// Description of the violated invariant.
    reason: &'static str,
    /// Offending path.
    path: PathBuf,
  },
  /// The source map could not be parsed.
  #[error("failed to parse source map: {0}")]
  SourceMap(#[from] sourcemap::Error),
  /// An inline `sourceMappingURL` data URL could not be decoded.
  #[error("invalid inline source map: {reason}")]
  InlineMap {
    /// Why decoding failed.
    reason: String,
  },
  /// Reading an input failed.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
}

impl ResolveError {
  pub(crate) fn invalid(reason: &'static str, path: impl Into<PathBuf>) -> Self {
    Self::InvalidCandidate {
      reason,
      path: path.into(),
    }
  }
}
