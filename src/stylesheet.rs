//! Whole-stylesheet rewriting built on a lightweight declaration walker.
//!
//! The walker is not a CSS parser. It only tracks comments, strings, parentheses and block
//! nesting well enough to find `property: value` pairs and their positions. Everything it does
//! not recognise is copied to the output unchanged.

use std::fs;
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ResolverConfig;
use crate::debug::DebugLog;
use crate::error::ResolveError;
use crate::fs::NativeFileSystem;
use crate::models::{Declaration, SourceCoordinate};
use crate::rewriter::UrlRewriter;
use crate::source_map::LoadedSourceMap;

/// A declaration found in stylesheet text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSpan {
  /// Declaration with generated positions.
  pub declaration: Declaration,
  /// Byte range of the value within the stylesheet.
  pub value_range: Range<usize>,
}

struct LineIndex<'a> {
  text: &'a str,
  starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
  fn new(text: &'a str) -> Self {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(index, _)| index + 1));
    Self { text, starts }
  }

  fn coordinate(&self, offset: usize) -> SourceCoordinate {
    let line = self.starts.partition_point(|start| *start <= offset) - 1;
    let column: usize = self.text[self.starts[line]..offset]
      .chars()
      .map(char::len_utf16)
      .sum();
    SourceCoordinate::new(line as u32 + 1, column as u32 + 1)
  }
}

/// Find every declaration inside a block, in document order.
///
/// Statements at the top level (such as `@import` or `@charset`) and nested at-rule statements
/// are skipped.
pub fn declarations(css: &str) -> Vec<DeclarationSpan> {
  let lines = LineIndex::new(css);
  let bytes = css.as_bytes();
  let mut found = Vec::new();
  let mut blocks: Vec<Option<usize>> = Vec::new();
  let mut segment_start: Option<usize> = None;
  let mut depth = 0usize;
  let mut index = 0;

  while index < bytes.len() {
    let byte = bytes[index];
    match byte {
      b'/' if bytes.get(index + 1) == Some(&b'*') => {
        index = css[index + 2..]
          .find("*/")
          .map_or(bytes.len(), |end| index + 2 + end + 2);
        continue;
      }
      b'"' | b'\'' => {
        segment_start.get_or_insert(index);
        index = skip_string(bytes, index);
        continue;
      }
      b'(' => {
        segment_start.get_or_insert(index);
        depth += 1;
      }
      b')' => depth = depth.saturating_sub(1),
      b'{' if depth == 0 => {
        blocks.push(segment_start.take());
      }
      b';' if depth == 0 => {
        if let Some(start) = segment_start.take() {
          if !blocks.is_empty() {
            push_declaration(css, &lines, &blocks, start..index, &mut found);
          }
        }
      }
      b'}' if depth == 0 => {
        if let Some(start) = segment_start.take() {
          if !blocks.is_empty() {
            push_declaration(css, &lines, &blocks, start..index, &mut found);
          }
        }
        blocks.pop();
      }
      _ if !byte.is_ascii_whitespace() => {
        segment_start.get_or_insert(index);
      }
      _ => {}
    }
    index += 1;
  }

  found
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
  let quote = bytes[start];
  let mut index = start + 1;
  while index < bytes.len() {
    match bytes[index] {
      b'\\' => index += 2,
      byte if byte == quote => return index + 1,
      b'\n' => return index,
      _ => index += 1,
    }
  }
  bytes.len()
}

fn push_declaration(
  css: &str,
  lines: &LineIndex<'_>,
  blocks: &[Option<usize>],
  segment: Range<usize>,
  found: &mut Vec<DeclarationSpan>,
) {
  let text = &css[segment.clone()];
  let Some(colon) = text.find(':') else {
    return;
  };
  let property = text[..colon].trim();
  if property.is_empty() || property.starts_with('@') || property.contains(char::is_whitespace) {
    return;
  }

  let after_colon = &text[colon + 1..];
  let leading = after_colon.len() - after_colon.trim_start().len();
  let value = after_colon.trim();
  let value_start = segment.start + colon + 1 + leading;
  let value_range = value_start..value_start + value.len();

  found.push(DeclarationSpan {
    declaration: Declaration {
      property: property.to_string(),
      value: value.to_string(),
      value_start: lines.coordinate(value_start),
      property_start: Some(lines.coordinate(segment.start)),
      selector_start: blocks
        .last()
        .copied()
        .flatten()
        .map(|start| lines.coordinate(start)),
    },
    value_range,
  });
}

/// Rewrite every declaration value of `css`, leaving all other text untouched.
pub fn rewrite_stylesheet(css: &str, rewriter: &UrlRewriter<'_>) -> Result<String, ResolveError> {
  let mut output = String::with_capacity(css.len());
  let mut cursor = 0;
  let mut changed = 0usize;

  for span in declarations(css) {
    let rewritten = rewriter.rewrite(&span.declaration)?;
    if rewritten == span.declaration.value {
      continue;
    }
    output.push_str(&css[cursor..span.value_range.start]);
    output.push_str(&rewritten);
    cursor = span.value_range.end;
    changed += 1;
  }
  output.push_str(&css[cursor..]);

  tracing::debug!(
    file = %rewriter.filename().display(),
    changed,
    "rewrote stylesheet declarations"
  );
  Ok(output)
}

/// Read a generated stylesheet from disk and rewrite its `url()` references.
///
/// The source map is taken from `map_path` when given, otherwise discovered from the stylesheet.
pub fn rewrite_file(
  path: &Path,
  map_path: Option<&Path>,
  config: &ResolverConfig,
  log: &DebugLog,
) -> Result<String> {
  let css = fs::read_to_string(path)
    .with_context(|| format!("failed to read stylesheet at {}", path.display()))?;
  let filename = std::path::absolute(path)
    .with_context(|| format!("failed to resolve {}", path.display()))?;

  let source_map = match map_path {
    Some(map_path) => Some(
      LoadedSourceMap::from_path(map_path)
        .with_context(|| format!("failed to load source map {}", map_path.display()))?,
    ),
    None => LoadedSourceMap::discover(&css, &filename)
      .with_context(|| format!("failed to load source map for {}", path.display()))?,
  };

  let fs = NativeFileSystem;
  let mut rewriter = UrlRewriter::new(config, &filename, &fs).with_debug_log(log);
  if let Some(map) = source_map.as_ref() {
    rewriter = rewriter.with_source_map(map);
  }

  rewrite_stylesheet(&css, &rewriter)
    .with_context(|| format!("failed to rewrite {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fs::MemoryFileSystem;
  use tempfile::tempdir;

  #[test]
  fn finds_declarations_with_positions() {
    let css = "a {\n  color: red;\n  background: url(x.png)\n}\n";
    let found = declarations(css);

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].declaration.property, "color");
    assert_eq!(found[0].declaration.value, "red");
    assert_eq!(found[0].declaration.value_start, SourceCoordinate::new(2, 10));
    assert_eq!(found[0].declaration.property_start, Some(SourceCoordinate::new(2, 3)));
    assert_eq!(found[0].declaration.selector_start, Some(SourceCoordinate::new(1, 1)));
    assert_eq!(&css[found[1].value_range.clone()], "url(x.png)");
  }

  #[test]
  fn columns_follow_source_map_units() {
    let css = ".\u{1F600} { content: \"\u{1F600}\"; background: url(x.png) }";
    let found = declarations(css);

    assert_eq!(found[0].declaration.value_start, SourceCoordinate::new(1, 16));
    assert_eq!(found[1].declaration.value_start, SourceCoordinate::new(1, 34));
  }

  #[test]
  fn skips_comments_strings_and_top_level_statements() {
    let css = concat!(
      "@import url(base.css);\n",
      "/* a { color: blue; } */\n",
      "@media (min-width: 10px) {\n",
      "  .a:hover { content: \"x;}\"; background: url(data:image/png;base64,AA==) }\n",
      "}\n"
    );
    let found = declarations(css);
    let pairs: Vec<(&str, &str)> = found
      .iter()
      .map(|span| (span.declaration.property.as_str(), span.declaration.value.as_str()))
      .collect();

    assert_eq!(pairs, vec![
      ("content", "\"x;}\""),
      ("background", "url(data:image/png;base64,AA==)")
    ]);
    assert_eq!(found[0].declaration.selector_start, Some(SourceCoordinate::new(4, 3)));
  }

  #[test]
  fn rewrites_only_url_values() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/proj/dist/img/x.png");
    let config = ResolverConfig {
      absolute: true,
      ..ResolverConfig::default()
    };
    let rewriter = UrlRewriter::new(&config, Path::new("/proj/dist/main.css"), &fs);

    let css = "a{color:red;background:url('img/x.png') no-repeat}\nb { mask: url(#m) }";
    let rewritten = rewrite_stylesheet(css, &rewriter).unwrap();
    assert_eq!(
      rewritten,
      "a{color:red;background:url('/proj/dist/img/x.png') no-repeat}\nb { mask: url(#m) }"
    );
  }

  #[test]
  fn stylesheets_without_urls_are_unchanged() {
    let fs = MemoryFileSystem::new();
    let config = ResolverConfig::default();
    let rewriter = UrlRewriter::new(&config, Path::new("/proj/dist/main.css"), &fs);
    let css = "/* header */\n.a { color: red; }\n@font-face { font-family: x }\n";
    assert_eq!(rewrite_stylesheet(css, &rewriter).unwrap(), css);
  }

  #[test]
  fn rewrites_files_using_sibling_maps() -> Result<()> {
    let temp = tempdir()?;
    let root = temp.path();
    fs::create_dir_all(root.join("src/styles"))?;
    fs::create_dir_all(root.join("src/img"))?;
    fs::create_dir_all(root.join("dist"))?;
    fs::write(root.join("src/img/x.png"), b"png")?;
    fs::write(
      root.join("dist/main.css"),
      ".hero {\n  background: url(../img/x.png);\n}\n",
    )?;
    fs::write(
      root.join("dist/main.css.map"),
      r#"{"version":3,"sources":["../src/styles/main.scss"],"names":[],"mappings":"AAAA"}"#,
    )?;

    let config = ResolverConfig::default();
    let output = rewrite_file(&root.join("dist/main.css"), None, &config, &DebugLog::disabled())?;
    assert_eq!(output, ".hero {\n  background: url(../src/img/x.png);\n}\n");
    Ok(())
  }

  #[test]
  fn missing_referenced_maps_fail_instead_of_guessing() -> Result<()> {
    let temp = tempdir()?;
    let root = temp.path();
    fs::create_dir_all(root.join("dist/img"))?;
    fs::create_dir_all(root.join("src/img"))?;
    fs::write(root.join("dist/img/x.png"), b"png")?;
    fs::write(root.join("src/img/x.png"), b"png")?;
    fs::write(
      root.join("dist/main.css"),
      "a {\n  background: url(img/x.png);\n}\n/*# sourceMappingURL=main.css.map */\n",
    )?;

    let err = rewrite_file(
      &root.join("dist/main.css"),
      None,
      &ResolverConfig::default(),
      &DebugLog::disabled(),
    )
    .unwrap_err();
    assert!(err.chain().any(|cause| matches!(
      cause.downcast_ref::<ResolveError>(),
      Some(ResolveError::Io { .. })
    )));
    Ok(())
  }

  #[test]
  fn broken_maps_fail_the_whole_file() -> Result<()> {
    let temp = tempdir()?;
    let css_path = temp.path().join("main.css");
    fs::write(&css_path, "a {\n  background: url(x.png);\n}\n")?;
    fs::write(
      temp.path().join("main.css.map"),
      r#"{"version":3,"sources":["a.scss"],"names":[],"mappings":";;;;AAAA"}"#,
    )?;

    let err = rewrite_file(&css_path, None, &ResolverConfig::default(), &DebugLog::disabled())
      .unwrap_err();
    assert!(err.chain().any(|cause| matches!(
      cause.downcast_ref::<ResolveError>(),
      Some(ResolveError::MapReversal { .. })
    )));
    Ok(())
  }
}
