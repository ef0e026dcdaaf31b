//! Data structures created and consumed while resolving a single declaration.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Position within generated text. Both fields are 1-based; columns count UTF-16 code units,
/// as source maps do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceCoordinate {
  /// 1-based line.
  pub line: u32,
  /// 1-based column.
  pub column: u32,
}

impl SourceCoordinate {
  /// Construct a coordinate from 1-based line and column values.
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }

  /// Coordinate reached after walking over `text` starting from this position.
  pub fn advance(self, text: &str) -> Self {
    let mut line = self.line;
    let mut column = self.column;
    for ch in text.chars() {
      if ch == '\n' {
        line += 1;
        column = 1;
      } else {
        column += ch.len_utf16() as u32;
      }
    }
    Self { line, column }
  }
}

impl fmt::Display for SourceCoordinate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A single CSS declaration handed to the resolver by the declaration walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
  /// Property name, e.g. `background-image`.
  pub property: String,
  /// Raw property value as it appears in the generated stylesheet.
  pub value: String,
  /// Generated position of the first character of the value.
  pub value_start: SourceCoordinate,
  /// Generated position of the first character of the property name.
  pub property_start: Option<SourceCoordinate>,
  /// Generated position of the enclosing rule's selector.
  pub selector_start: Option<SourceCoordinate>,
}

impl Declaration {
  /// Declaration without property or selector positions.
  pub fn new(
    property: impl Into<String>,
    value: impl Into<String>,
    value_start: SourceCoordinate,
  ) -> Self {
    Self {
      property: property.into(),
      value: value.into(),
      value_start,
      property_start: None,
      selector_start: None,
    }
  }
}

/// Authored file recovered from a generated position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalSource {
  /// Absolute path of the authored file.
  pub source_file: PathBuf,
  /// Directory containing the authored file.
  pub directory: PathBuf,
}

/// Where a candidate base directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
  /// Original location of the `url()` substring itself.
  Substring,
  /// Original location of the start of the declaration value.
  Value,
  /// Original location of the property name.
  Property,
  /// Original location of the enclosing selector.
  Selector,
  /// The configured root, used for root-relative URIs.
  Root,
  /// Directory discovered while searching the tree.
  Searched,
}

impl fmt::Display for Provenance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Substring => "substring",
      Self::Value => "value",
      Self::Property => "property",
      Self::Selector => "selector",
      Self::Root => "root",
      Self::Searched => "searched",
    };
    f.write_str(label)
  }
}

/// Absolute directory proposed as the resolution root for a URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateBase {
  /// Directory path. May be empty only for root-relative URIs with an empty root.
  pub path: PathBuf,
  /// Origin of the candidate.
  pub provenance: Provenance,
}

impl CandidateBase {
  /// Tag a directory with its provenance.
  pub fn new(path: impl Into<PathBuf>, provenance: Provenance) -> Self {
    Self {
      path: path.into(),
      provenance,
    }
  }

  /// Directory path of the candidate.
  pub fn path(&self) -> &Path {
    &self.path
  }
}

/// One application of the join operation to a candidate base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
  /// Base the operation was applied to.
  pub base: CandidateBase,
  /// URI being resolved, without query suffix.
  pub uri: String,
  /// Joined path produced by the operation, when it produced one.
  pub joined: Option<PathBuf>,
  /// Whether the joined path was accepted.
  pub is_success: bool,
  /// Whether the joined path was proposed as a fallback.
  pub is_fallback: bool,
}

/// Final outcome of resolving a single URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
  /// A candidate produced an existing file.
  Found(PathBuf),
  /// No candidate succeeded.
  NotFound(NotFound),
}

/// Value used in place of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
  /// The first fallback path proposed during resolution.
  Fallback(PathBuf),
  /// No fallback was proposed; the URI is left as written.
  Original(String),
}

impl ResolutionResult {
  /// Whether a file was found.
  pub fn is_found(&self) -> bool {
    matches!(self, Self::Found(_))
  }

  /// Absolute path the URI resolved to, either found or fallback.
  pub fn path(&self) -> Option<&Path> {
    match self {
      Self::Found(path) | Self::NotFound(NotFound::Fallback(path)) => Some(path),
      Self::NotFound(NotFound::Original(_)) => None,
    }
  }
}

/// Result of a resolution together with every attempt made along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// Final decision.
  pub result: ResolutionResult,
  /// Attempts in encounter order.
  pub attempts: Vec<Attempt>,
}
