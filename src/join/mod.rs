//! Candidate generation and the join engine that consumes it.
//!
//! A [`JoinStrategy`] pairs two capabilities: `generate` proposes base directories lazily and
//! `operate` joins a URI onto one base and decides whether to stop. The engine in
//! [`engine::resolve`] drives any strategy, validates what it yields and records every attempt.
//! Two strategies ship with the crate, [`DefaultJoin`] and [`SearchJoin`], and callers can plug in
//! their own.

mod default;
pub mod engine;
mod search;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::fs::FileSystem;
use crate::models::{CandidateBase, Provenance};
use crate::paths::normalize_path;

pub use default::DefaultJoin;
pub use engine::resolve;
pub use search::SearchJoin;

/// Lazily produced candidate bases for one resolution. Never reused across resolutions.
pub type Candidates<'a> = Box<dyn Iterator<Item = CandidateBase> + 'a>;

/// Authored directories recovered for a declaration, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseContext {
  /// Directory of the `url()` substring's original location.
  pub substring: Option<PathBuf>,
  /// Directory of the declaration value's original location.
  pub value: Option<PathBuf>,
  /// Directory of the property name's original location.
  pub property: Option<PathBuf>,
  /// Directory of the enclosing selector's original location.
  pub selector: Option<PathBuf>,
}

impl BaseContext {
  /// Context where every position maps to the same directory.
  pub fn uniform(directory: impl Into<PathBuf>) -> Self {
    let directory = directory.into();
    Self {
      substring: Some(directory.clone()),
      value: Some(directory.clone()),
      property: Some(directory.clone()),
      selector: Some(directory),
    }
  }

  /// Known directories in priority order, skipping missing entries.
  pub fn prioritized(&self) -> impl Iterator<Item = (&Path, Provenance)> {
    [
      (self.substring.as_deref(), Provenance::Substring),
      (self.value.as_deref(), Provenance::Value),
      (self.property.as_deref(), Provenance::Property),
      (self.selector.as_deref(), Provenance::Selector),
    ]
    .into_iter()
    .filter_map(|(path, provenance)| path.map(|path| (path, provenance)))
  }
}

/// A single URI to resolve, along with where it was found.
#[derive(Debug, Clone, Copy)]
pub struct JoinItem<'a> {
  /// Generated stylesheet the URI appears in.
  pub filename: &'a Path,
  /// URI without query or fragment suffix.
  pub uri: &'a str,
  /// Whether the URI is root-relative.
  pub is_absolute: bool,
  /// Authored directories for the declaration.
  pub context: &'a BaseContext,
}

/// Outcome of applying a join operation to one candidate base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// The joined absolute path is the answer.
  Success(PathBuf),
  /// Continue with the next candidate, optionally proposing a fallback path.
  Next {
    /// Absolute path to use if nothing else succeeds.
    fallback: Option<PathBuf>,
  },
}

/// Pluggable pair of candidate generation and join/verify operation.
pub trait JoinStrategy {
  /// Short name used in debug output.
  fn name(&self) -> &str;

  /// Produce candidate bases for `item` in the order they should be tried.
  fn generate<'a>(&'a self, item: &JoinItem<'a>, fs: &'a dyn FileSystem) -> Candidates<'a>;

  /// Join `item.uri` onto `base` and decide whether resolution is finished.
  fn operate(&self, item: &JoinItem<'_>, base: &CandidateBase, fs: &dyn FileSystem) -> Operation {
    default_operation(item, base, fs)
  }
}

/// Built-in strategy selection used by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
  /// Fixed priority list of authored directories.
  #[default]
  Default,
  /// Upward walk plus breadth-first search of the directory tree.
  Search,
}

impl std::str::FromStr for JoinKind {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "default" => Ok(Self::Default),
      "search" => Ok(Self::Search),
      other => Err(format!("unknown join strategy `{other}`")),
    }
  }
}

/// Instantiate the built-in strategy named by the configuration.
pub fn strategy_for(config: &ResolverConfig) -> Box<dyn JoinStrategy + Send + Sync> {
  match config.join {
    JoinKind::Default => Box::new(DefaultJoin::new(config.root.clone())),
    JoinKind::Search => Box::new(SearchJoin::from_config(config)),
  }
}

/// Join `uri` onto `base`, succeeding when the result is an existing file.
///
/// A missing file proposes the joined path as a fallback.
pub fn default_operation(item: &JoinItem<'_>, base: &CandidateBase, fs: &dyn FileSystem) -> Operation {
  let joined = join_uri(base.path(), item.uri);
  if fs.is_file(&joined) {
    Operation::Success(joined)
  } else {
    Operation::Next {
      fallback: Some(joined),
    }
  }
}

/// Lexically join a URI path onto a base directory.
///
/// Root-relative URIs are re-rooted under `base`; an empty base leaves them as filesystem paths.
pub fn join_uri(base: &Path, uri: &str) -> PathBuf {
  if base.as_os_str().is_empty() {
    return normalize_path(Path::new(uri));
  }
  normalize_path(&base.join(uri.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fs::MemoryFileSystem;

  #[test]
  fn prioritized_context_skips_missing_entries() {
    let context = BaseContext {
      substring: None,
      value: Some("/a".into()),
      property: None,
      selector: Some("/b".into()),
    };
    let order: Vec<_> = context.prioritized().collect();
    assert_eq!(order, vec![
      (Path::new("/a"), Provenance::Value),
      (Path::new("/b"), Provenance::Selector)
    ]);
  }

  #[test]
  fn joins_relative_and_root_relative_uris() {
    assert_eq!(
      join_uri(Path::new("/proj/src/styles"), "../img/x.png"),
      PathBuf::from("/proj/src/img/x.png")
    );
    assert_eq!(
      join_uri(Path::new("/proj/public"), "/img/x.png"),
      PathBuf::from("/proj/public/img/x.png")
    );
    assert_eq!(join_uri(Path::new(""), "/img/x.png"), PathBuf::from("/img/x.png"));
  }

  #[test]
  fn default_operation_proposes_fallbacks_for_missing_files() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/proj/img/x.png");
    let context = BaseContext::default();
    let item = JoinItem {
      filename: Path::new("/proj/out.css"),
      uri: "img/x.png",
      is_absolute: false,
      context: &context,
    };

    let found = default_operation(&item, &CandidateBase::new("/proj", Provenance::Value), &fs);
    assert_eq!(found, Operation::Success(PathBuf::from("/proj/img/x.png")));

    let missing = default_operation(&item, &CandidateBase::new("/other", Provenance::Value), &fs);
    assert_eq!(missing, Operation::Next {
      fallback: Some(PathBuf::from("/other/img/x.png"))
    });
  }

  #[test]
  fn parses_join_kinds() {
    assert_eq!("search".parse::<JoinKind>(), Ok(JoinKind::Search));
    assert_eq!(" Default ".parse::<JoinKind>(), Ok(JoinKind::Default));
    assert!("fancy".parse::<JoinKind>().is_err());
  }
}
