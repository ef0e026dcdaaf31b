//! Drive a join strategy over its candidates and decide the final path.

use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::join::{JoinItem, JoinStrategy, Operation};
use crate::models::{Attempt, CandidateBase, NotFound, Resolution, ResolutionResult};
use crate::paths::is_normalized_absolute;

/// Resolve `item` by applying the strategy's operation to each candidate in turn.
///
/// Stops at the first success. Otherwise the result is the first fallback proposed by any
/// attempt, or the URI as written when no attempt proposed one. Bases and returned paths are
/// validated before use and a violation aborts resolution with
/// [`ResolveError::InvalidCandidate`].
pub fn resolve(
  item: &JoinItem<'_>,
  strategy: &dyn JoinStrategy,
  fs: &dyn FileSystem,
) -> Result<Resolution, ResolveError> {
  let mut attempts = Vec::new();
  let mut fallback: Option<PathBuf> = None;

  for base in strategy.generate(item, fs) {
    validate_base(item, &base, fs)?;

    match strategy.operate(item, &base, fs) {
      Operation::Success(path) => {
        require_absolute(&path, "join result must be an absolute path")?;
        tracing::trace!(base = %base.path.display(), joined = %path.display(), "found");
        attempts.push(Attempt {
          base,
          uri: item.uri.to_string(),
          joined: Some(path.clone()),
          is_success: true,
          is_fallback: false,
        });
        return Ok(Resolution {
          result: ResolutionResult::Found(path),
          attempts,
        });
      }
      Operation::Next { fallback: proposed } => {
        if let Some(path) = proposed.as_deref() {
          require_absolute(path, "fallback must be an absolute path")?;
        }
        tracing::trace!(base = %base.path.display(), fallback = ?proposed, "miss");
        if fallback.is_none() {
          fallback = proposed.clone();
        }
        attempts.push(Attempt {
          base,
          uri: item.uri.to_string(),
          is_fallback: proposed.is_some(),
          joined: proposed,
          is_success: false,
        });
      }
    }
  }

  let result = match fallback {
    Some(path) => NotFound::Fallback(path),
    None => NotFound::Original(item.uri.to_string()),
  };
  Ok(Resolution {
    result: ResolutionResult::NotFound(result),
    attempts,
  })
}

fn validate_base(
  item: &JoinItem<'_>,
  base: &CandidateBase,
  fs: &dyn FileSystem,
) -> Result<(), ResolveError> {
  if base.path.as_os_str().is_empty() {
    if item.is_absolute {
      return Ok(());
    }
    return Err(ResolveError::invalid(
      "empty base is only permitted for root-relative URIs",
      PathBuf::new(),
    ));
  }

  if !is_normalized_absolute(&base.path) {
    return Err(ResolveError::invalid(
      "base must be an absolute, normalized path",
      &base.path,
    ));
  }
  if !fs.is_dir(&base.path) {
    return Err(ResolveError::invalid(
      "base must be an existing directory",
      &base.path,
    ));
  }
  Ok(())
}

fn require_absolute(path: &Path, reason: &'static str) -> Result<(), ResolveError> {
  if path.is_absolute() {
    Ok(())
  } else {
    Err(ResolveError::invalid(reason, path))
  }
}
