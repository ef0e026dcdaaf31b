use std::path::PathBuf;

use crate::fs::FileSystem;
use crate::join::{Candidates, JoinItem, JoinStrategy};
use crate::models::{CandidateBase, Provenance};
use crate::paths::normalize_path;

/// Tries the authored directories of a declaration in priority order.
///
/// Relative URIs are tried against the substring, value, property and selector directories,
/// skipping entries that are unknown, not directories, or repeats of an earlier entry.
/// Root-relative URIs are only ever tried against the configured root.
#[derive(Debug, Clone, Default)]
pub struct DefaultJoin {
  root: Option<PathBuf>,
}

impl DefaultJoin {
  /// Strategy resolving root-relative URIs against `root`.
  pub fn new(root: Option<PathBuf>) -> Self {
    Self {
      root: usable_root(root),
    }
  }
}

/// Normalized form of a configured root. A relative root cannot be anchored and is dropped.
pub(super) fn usable_root(root: Option<PathBuf>) -> Option<PathBuf> {
  let root = root?;
  if root.as_os_str().is_empty() {
    return Some(root);
  }
  if !root.is_absolute() {
    tracing::warn!(root = %root.display(), "ignoring relative root directory");
    return None;
  }
  Some(normalize_path(&root))
}

/// Candidate for a root-relative URI, if a root is configured and exists.
pub(super) fn root_candidate(root: Option<&PathBuf>, fs: &dyn FileSystem) -> Option<CandidateBase> {
  let root = root?;
  if !root.as_os_str().is_empty() && !fs.is_dir(root) {
    tracing::debug!(root = %root.display(), "root directory does not exist");
    return None;
  }
  Some(CandidateBase::new(root.clone(), Provenance::Root))
}

/// Existing, distinct context directories in priority order.
pub(super) fn context_candidates(item: &JoinItem<'_>, fs: &dyn FileSystem) -> Vec<CandidateBase> {
  let mut candidates: Vec<CandidateBase> = Vec::new();
  for (path, provenance) in item.context.prioritized() {
    if !fs.is_dir(path) || candidates.iter().any(|known| known.path == path) {
      continue;
    }
    candidates.push(CandidateBase::new(path, provenance));
  }
  candidates
}

impl JoinStrategy for DefaultJoin {
  fn name(&self) -> &str {
    "default"
  }

  fn generate<'a>(&'a self, item: &JoinItem<'a>, fs: &'a dyn FileSystem) -> Candidates<'a> {
    if item.is_absolute {
      Box::new(root_candidate(self.root.as_ref(), fs).into_iter())
    } else {
      Box::new(context_candidates(item, fs).into_iter())
    }
  }
}
