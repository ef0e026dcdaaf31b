use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::ResolverConfig;
use crate::fs::FileSystem;
use crate::join::default::{context_candidates, root_candidate, usable_root};
use crate::join::{Candidates, JoinItem, JoinStrategy};
use crate::models::{CandidateBase, Provenance};

/// Searches the directory tree around the authored location of a declaration.
///
/// Each context directory is walked upward until the configured root or the first package
/// boundary, collecting a closest-first `path_to_root` list. Those directories are then
/// attempted breadth first: every attempted directory enqueues its visible subdirectories that
/// are not package boundaries themselves. The configured root is only attempted when
/// `include_root` is set.
#[derive(Debug, Clone)]
pub struct SearchJoin {
  root: Option<PathBuf>,
  include_root: bool,
  attempts: Option<usize>,
  package_markers: Vec<String>,
}

impl SearchJoin {
  /// Search bounded by `root`, stopping at directories containing one of `package_markers`.
  pub fn new(root: Option<PathBuf>, package_markers: Vec<String>) -> Self {
    Self {
      root: usable_root(root),
      include_root: false,
      attempts: None,
      package_markers,
    }
  }

  /// Build a search strategy from resolver configuration.
  pub fn from_config(config: &ResolverConfig) -> Self {
    Self::new(config.root.clone(), config.package_markers.clone())
      .include_root(config.include_root)
      .max_attempts(config.attempts)
  }

  /// Also attempt the configured root after the upward walk.
  pub fn include_root(mut self, include_root: bool) -> Self {
    self.include_root = include_root;
    self
  }

  /// Stop after this many attempted directories. `None` or `Some(0)` leaves the search unbounded.
  pub fn max_attempts(mut self, attempts: Option<usize>) -> Self {
    self.attempts = attempts.filter(|limit| *limit > 0);
    self
  }

  fn is_package(&self, fs: &dyn FileSystem, dir: &Path) -> bool {
    self
      .package_markers
      .iter()
      .any(|marker| fs.exists(&dir.join(marker)))
  }

  /// Ancestors of `start`, closest first, ending at a package boundary or before the root.
  fn path_to_root(&self, fs: &dyn FileSystem, start: &Path) -> Vec<PathBuf> {
    let root = self.root.as_deref().filter(|root| !root.as_os_str().is_empty());
    if let Some(root) = root {
      if !start.starts_with(root) {
        return Vec::new();
      }
    }

    let mut visited = Vec::new();
    let mut current = Some(start);
    while let Some(dir) = current {
      if root == Some(dir) {
        break;
      }
      visited.push(dir.to_path_buf());
      if self.is_package(fs, dir) {
        break;
      }
      current = dir.parent();
    }
    visited
  }
}

impl JoinStrategy for SearchJoin {
  fn name(&self) -> &str {
    "search"
  }

  fn generate<'a>(&'a self, item: &JoinItem<'a>, fs: &'a dyn FileSystem) -> Candidates<'a> {
    if item.is_absolute {
      return Box::new(root_candidate(self.root.as_ref(), fs).into_iter());
    }

    let mut queue = VecDeque::new();
    let mut seen = BTreeSet::new();
    for start in context_candidates(item, fs) {
      for (index, dir) in self.path_to_root(fs, &start.path).into_iter().enumerate() {
        if !seen.insert(dir.clone()) {
          continue;
        }
        let provenance = if index == 0 {
          start.provenance
        } else {
          Provenance::Searched
        };
        queue.push_back(CandidateBase::new(dir, provenance));
      }
    }

    if self.include_root {
      if let Some(root) = self.root.as_ref().filter(|root| fs.is_dir(root)) {
        if seen.insert(root.clone()) {
          queue.push_back(CandidateBase::new(root.clone(), Provenance::Root));
        }
      }
    }

    Box::new(SearchCandidates {
      strategy: self,
      fs,
      queue,
      seen,
      remaining: self.attempts,
    })
  }
}

struct SearchCandidates<'a> {
  strategy: &'a SearchJoin,
  fs: &'a dyn FileSystem,
  queue: VecDeque<CandidateBase>,
  seen: BTreeSet<PathBuf>,
  remaining: Option<usize>,
}

impl SearchCandidates<'_> {
  fn enqueue_children(&mut self, dir: &Path) {
    let Ok(entries) = self.fs.list_entries(dir) else {
      return;
    };

    for name in entries {
      if name.to_string_lossy().starts_with('.') {
        continue;
      }
      let child = dir.join(&name);
      if !self.fs.is_dir(&child) || self.strategy.is_package(self.fs, &child) {
        continue;
      }
      if self.seen.insert(child.clone()) {
        self
          .queue
          .push_back(CandidateBase::new(child, Provenance::Searched));
      }
    }
  }
}

impl Iterator for SearchCandidates<'_> {
  type Item = CandidateBase;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == Some(0) {
      return None;
    }

    let candidate = self.queue.pop_front()?;
    self.enqueue_children(&candidate.path);
    if let Some(remaining) = self.remaining.as_mut() {
      *remaining -= 1;
    }
    Some(candidate)
  }
}
