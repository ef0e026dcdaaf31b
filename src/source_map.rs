//! Map generated stylesheet positions back to the authored files they came from.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use regex::Regex;
use sourcemap::SourceMap;

use crate::error::ResolveError;
use crate::models::{OriginalSource, SourceCoordinate};
use crate::paths::normalize_path;

/// Authored position returned by a source-map lookup. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
  /// Source file named by the mapping segment, as written in the map.
  pub source: Option<String>,
  /// 1-based authored line.
  pub line: u32,
  /// 1-based authored column.
  pub column: u32,
}

/// Lookup from generated positions to authored positions.
pub trait OriginalPositionFor {
  /// Return the mapping segment in effect at `coordinate`, if any.
  fn original_position_for(&self, coordinate: SourceCoordinate) -> Option<OriginalPosition>;
}

/// Position lookup over a parsed source map.
///
/// A mapping segment applies from its generated position until the next segment begins,
/// including across line boundaries.
#[derive(Debug, Clone)]
pub struct MappingTable {
  map: SourceMap,
}

impl MappingTable {
  /// Parse a source map from raw JSON bytes.
  pub fn from_slice(bytes: &[u8]) -> Result<Self, ResolveError> {
    Ok(Self::from_source_map(SourceMap::from_slice(bytes)?))
  }

  /// Wrap an already parsed source map.
  pub fn from_source_map(map: SourceMap) -> Self {
    Self { map }
  }

  /// Number of mapping segments.
  pub fn len(&self) -> usize {
    self.map.get_token_count() as usize
  }

  /// Returns `true` when the map contains no segments.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl OriginalPositionFor for MappingTable {
  fn original_position_for(&self, coordinate: SourceCoordinate) -> Option<OriginalPosition> {
    let token = self.map.lookup_token(
      coordinate.line.saturating_sub(1),
      coordinate.column.saturating_sub(1),
    )?;

    Some(OriginalPosition {
      source: token.get_source().map(str::to_string),
      line: token.get_src_line().saturating_add(1),
      column: token.get_src_col().saturating_add(1),
    })
  }
}

/// Recover the authored file and directory for a generated coordinate.
///
/// Relative sources are resolved against `source_base`, normally the directory holding the map.
/// Returns `None` when no segment covers the coordinate or the segment names no source.
pub fn reverse(
  lookup: &dyn OriginalPositionFor,
  coordinate: SourceCoordinate,
  source_base: &Path,
) -> Option<OriginalSource> {
  let position = lookup.original_position_for(coordinate)?;
  let source = position.source?;
  let source = source.strip_prefix("file://").unwrap_or(&source);
  if source.is_empty() {
    return None;
  }

  let source_file = normalize_path(&source_base.join(source));
  let directory = source_file.parent()?.to_path_buf();
  Some(OriginalSource {
    source_file,
    directory,
  })
}

/// Reverses positions for one stylesheet, or falls back to its directory when it has no map.
pub struct Reversor<'a> {
  lookup: Option<&'a dyn OriginalPositionFor>,
  source_base: PathBuf,
  working_dir: PathBuf,
}

impl<'a> Reversor<'a> {
  /// Reversor for a stylesheet without a source map: every position maps to `working_dir`.
  pub fn without_map(working_dir: impl Into<PathBuf>) -> Self {
    Self {
      lookup: None,
      source_base: PathBuf::new(),
      working_dir: working_dir.into(),
    }
  }

  /// Reversor consulting `lookup`, resolving relative sources against `source_base`.
  pub fn with_map(
    lookup: &'a dyn OriginalPositionFor,
    source_base: impl Into<PathBuf>,
    working_dir: impl Into<PathBuf>,
  ) -> Self {
    Self {
      lookup: Some(lookup),
      source_base: source_base.into(),
      working_dir: working_dir.into(),
    }
  }

  /// Directory of the authored file for `coordinate`.
  pub fn directory_for(&self, coordinate: SourceCoordinate) -> Result<PathBuf, ResolveError> {
    let Some(lookup) = self.lookup else {
      return Ok(self.working_dir.clone());
    };

    reverse(lookup, coordinate, &self.source_base)
      .map(|original| original.directory)
      .ok_or(ResolveError::MapReversal {
        line: coordinate.line,
        column: coordinate.column,
      })
  }
}

/// A parsed source map together with the directory its relative sources resolve against.
#[derive(Debug, Clone)]
pub struct LoadedSourceMap {
  /// Lookup table.
  pub table: MappingTable,
  /// Directory relative sources resolve against.
  pub source_base: PathBuf,
}

impl LoadedSourceMap {
  /// Load a source map file; relative sources resolve against its directory.
  pub fn from_path(path: &Path) -> Result<Self, ResolveError> {
    let bytes = fs::read(path).map_err(|source| ResolveError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let source_base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(Self {
      table: MappingTable::from_slice(&bytes)?,
      source_base: normalize_path(&source_base),
    })
  }

  /// Locate the map for a stylesheet.
  ///
  /// A `sourceMappingURL` comment wins, either as an inline base64 data URL or as a path relative
  /// to the stylesheet. A map named that way must load: a missing file or an undecodable payload
  /// is an error. Without a local reference a sibling `<file>.map` is used when present.
  pub fn discover(css: &str, css_path: &Path) -> Result<Option<Self>, ResolveError> {
    let css_dir = css_path.parent().unwrap_or(Path::new(""));

    if let Some(reference) = source_mapping_url(css) {
      if reference.starts_with("data:") {
        let bytes = decode_inline_map(reference)?;
        return Ok(Some(Self {
          table: MappingTable::from_slice(&bytes)?,
          source_base: normalize_path(css_dir),
        }));
      }
      let local = reference.strip_prefix("file://").unwrap_or(reference);
      if !local.contains(':') {
        return Self::from_path(&css_dir.join(local)).map(Some);
      }
      tracing::warn!(reference, "ignoring non-local sourceMappingURL");
    }

    let mut sibling = css_path.as_os_str().to_os_string();
    sibling.push(".map");
    let sibling = PathBuf::from(sibling);
    if sibling.is_file() {
      return Self::from_path(&sibling).map(Some);
    }

    Ok(None)
  }
}

fn source_mapping_url(css: &str) -> Option<&str> {
  use std::sync::OnceLock;

  static PATTERN: OnceLock<Regex> = OnceLock::new();
  let pattern = PATTERN.get_or_init(|| {
    Regex::new(r"/\*\s*[#@]\s*sourceMappingURL=([^\s*]+)\s*\*/")
      .expect("invalid sourceMappingURL regex")
  });

  pattern
    .captures_iter(css)
    .last()
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str())
}

fn decode_inline_map(reference: &str) -> Result<Vec<u8>, ResolveError> {
  let (_, payload) = reference
    .strip_prefix("data:application/json")
    .and_then(|rest| rest.split_once("base64,"))
    .ok_or_else(|| ResolveError::InlineMap {
      reason: "expected a base64 encoded application/json data URL".to_string(),
    })?;
  general_purpose::STANDARD
    .decode(payload)
    .map_err(|err| ResolveError::InlineMap {
      reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  // line 1 -> main.scss 1:1, line 3 col 5 -> button.scss 11:3, line 6 -> no source
  const SAMPLE_MAP: &str = r#"{
    "version": 3,
    "file": "main.css",
    "sources": ["../src/styles/main.scss", "../src/components/button.scss"],
    "names": [],
    "mappings": "AAAA;;ICUE;;;A"
  }"#;

  fn sample_table() -> MappingTable {
    MappingTable::from_slice(SAMPLE_MAP.as_bytes()).unwrap()
  }

  #[test]
  fn finds_nearest_preceding_segment() {
    let table = sample_table();

    let position = table
      .original_position_for(SourceCoordinate::new(2, 8))
      .unwrap();
    assert_eq!(position.source.as_deref(), Some("../src/styles/main.scss"));

    let position = table
      .original_position_for(SourceCoordinate::new(3, 5))
      .unwrap();
    assert_eq!(position.source.as_deref(), Some("../src/components/button.scss"));
    assert_eq!((position.line, position.column), (11, 3));

    let position = table
      .original_position_for(SourceCoordinate::new(4, 1))
      .unwrap();
    assert_eq!(position.source.as_deref(), Some("../src/components/button.scss"));
  }

  #[test]
  fn reverses_into_authored_directories() {
    let table = sample_table();
    let original = reverse(&table, SourceCoordinate::new(3, 5), Path::new("/proj/dist")).unwrap();

    assert_eq!(
      original.source_file,
      PathBuf::from("/proj/src/components/button.scss")
    );
    assert_eq!(original.directory, PathBuf::from("/proj/src/components"));
  }

  #[test]
  fn segments_without_sources_fail_reversal() {
    let table = sample_table();
    let reversor = Reversor::with_map(&table, "/proj/dist", "/proj/dist");

    let err = reversor
      .directory_for(SourceCoordinate::new(6, 1))
      .unwrap_err();
    assert!(matches!(err, ResolveError::MapReversal { line: 6, column: 1 }));
  }

  #[test]
  fn positions_before_first_segment_fail_reversal() {
    let json = r#"{"version":3,"sources":["a.scss"],"names":[],"mappings":";;;AAAA"}"#;
    let table = MappingTable::from_slice(json.as_bytes()).unwrap();

    assert!(reverse(&table, SourceCoordinate::new(1, 1), Path::new("/proj")).is_none());
    assert!(reverse(&table, SourceCoordinate::new(4, 1), Path::new("/proj")).is_some());
  }

  #[test]
  fn rejects_unparseable_maps() {
    assert!(matches!(
      MappingTable::from_slice(b"not json"),
      Err(ResolveError::SourceMap(_))
    ));
  }

  #[test]
  fn missing_map_uses_working_directory() {
    let reversor = Reversor::without_map("/proj/dist");
    assert_eq!(
      reversor.directory_for(SourceCoordinate::new(40, 2)).unwrap(),
      PathBuf::from("/proj/dist")
    );
  }

  #[test]
  fn discovers_inline_and_sibling_maps() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    let inline = format!(
      "a{{}}\n/*# sourceMappingURL=data:application/json;charset=utf-8;base64,{} */",
      general_purpose::STANDARD.encode(SAMPLE_MAP)
    );
    let css_path = temp.path().join("inline.css");
    let loaded = LoadedSourceMap::discover(&inline, &css_path)?.unwrap();
    assert_eq!(loaded.source_base, normalize_path(temp.path()));
    assert!(!loaded.table.is_empty());

    let css_path = temp.path().join("main.css");
    fs::write(temp.path().join("main.css.map"), SAMPLE_MAP)?;
    let loaded = LoadedSourceMap::discover("a{}", &css_path)?.unwrap();
    assert_eq!(loaded.table.len(), 3);

    let css_path = temp.path().join("plain.css");
    assert!(LoadedSourceMap::discover("a{}", &css_path)?.is_none());
    Ok(())
  }

  #[test]
  fn named_maps_that_cannot_load_are_errors() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let css_path = temp.path().join("main.css");
    fs::write(temp.path().join("main.css.map"), SAMPLE_MAP)?;

    let missing = "a{}\n/*# sourceMappingURL=gone.css.map */";
    assert!(matches!(
      LoadedSourceMap::discover(missing, &css_path),
      Err(ResolveError::Io { .. })
    ));

    let corrupt = "a{}\n/*# sourceMappingURL=data:application/json;base64,@@not-base64@@ */";
    assert!(matches!(
      LoadedSourceMap::discover(corrupt, &css_path),
      Err(ResolveError::InlineMap { .. })
    ));

    let unencoded = "a{}\n/*# sourceMappingURL=data:application/json,%7B%7D */";
    assert!(matches!(
      LoadedSourceMap::discover(unencoded, &css_path),
      Err(ResolveError::InlineMap { .. })
    ));
    Ok(())
  }

  #[test]
  fn follows_external_mapping_comments() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join("maps"))?;
    fs::write(temp.path().join("maps/out.map"), SAMPLE_MAP)?;

    let css = "a{}\n/*# sourceMappingURL=maps/out.map */";
    let loaded = LoadedSourceMap::discover(css, &temp.path().join("out.css"))?.unwrap();
    assert_eq!(loaded.source_base, normalize_path(&temp.path().join("maps")));
    Ok(())
  }
}
