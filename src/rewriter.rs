//! Rewrite the `url()` references of a single declaration.
//!
//! The rewriter is a pure transform from declaration value to declaration value. It holds no
//! mutable state and performs no caching, so one instance can serve many declarations and
//! several instances can run side by side.

use std::path::{Path, PathBuf};

use crate::config::ResolverConfig;
use crate::debug::DebugLog;
use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::join::{BaseContext, JoinItem, JoinStrategy, resolve, strategy_for};
use crate::models::{Declaration, NotFound, Resolution, ResolutionResult, SourceCoordinate};
use crate::paths::{
  is_absolute_uri, normalize_path, relative_to, should_ignore_uri, split_query, to_slash,
};
use crate::source_map::{LoadedSourceMap, OriginalPositionFor, Reversor};
use crate::tokenizer::{UrlToken, join, tokenize};

/// A `url()` reference that went through resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
  /// Index of the token within the tokenized value.
  pub token_index: usize,
  /// Payload as written, including any query suffix.
  pub original: String,
  /// Payload written back into the value.
  pub replacement: String,
  /// Engine outcome and attempts.
  pub resolution: Resolution,
}

/// Resolves and rewrites `url()` references for declarations of one generated stylesheet.
pub struct UrlRewriter<'a> {
  config: &'a ResolverConfig,
  filename: PathBuf,
  output_dir: PathBuf,
  fs: &'a dyn FileSystem,
  reversor: Reversor<'a>,
  strategy: Box<dyn JoinStrategy + 'a>,
  log: Option<&'a DebugLog>,
}

impl<'a> UrlRewriter<'a> {
  /// Rewriter for the generated stylesheet at `filename`, without a source map.
  ///
  /// Every declaration is then assumed to originate from the stylesheet's own directory.
  pub fn new(config: &'a ResolverConfig, filename: &Path, fs: &'a dyn FileSystem) -> Self {
    let filename = normalize_path(filename);
    let output_dir = filename.parent().map(Path::to_path_buf).unwrap_or_default();
    Self {
      config,
      reversor: Reversor::without_map(output_dir.clone()),
      filename,
      output_dir,
      fs,
      strategy: strategy_for(config),
      log: None,
    }
  }

  /// Consult a loaded source map when recovering authored directories.
  pub fn with_source_map(self, map: &'a LoadedSourceMap) -> Self {
    let source_base = map.source_base.clone();
    self.with_lookup(&map.table, source_base)
  }

  /// Consult an arbitrary position lookup, resolving relative sources against `source_base`.
  pub fn with_lookup(
    mut self,
    lookup: &'a dyn OriginalPositionFor,
    source_base: impl Into<PathBuf>,
  ) -> Self {
    self.reversor = Reversor::with_map(lookup, source_base, self.output_dir.clone());
    self
  }

  /// Replace the configured join strategy with a custom one.
  pub fn with_strategy(mut self, strategy: Box<dyn JoinStrategy + 'a>) -> Self {
    self.strategy = strategy;
    self
  }

  /// Write resolution traces to `log`.
  pub fn with_debug_log(mut self, log: &'a DebugLog) -> Self {
    self.log = Some(log);
    self
  }

  /// Generated stylesheet path.
  pub fn filename(&self) -> &Path {
    &self.filename
  }

  /// Rewrite the value of `declaration`, returning the new value.
  pub fn rewrite(&self, declaration: &Declaration) -> Result<String, ResolveError> {
    let mut tokens = tokenize(&declaration.value);
    let resolved = self.resolve_tokens(declaration, &tokens)?;
    if resolved.is_empty() {
      return Ok(declaration.value.clone());
    }

    for reference in resolved {
      if let Some(UrlToken::Url(url)) = tokens.get_mut(reference.token_index) {
        url.uri = reference.replacement;
      }
    }
    Ok(join(&tokens))
  }

  /// Resolve every eligible `url()` reference of `declaration` without rewriting it.
  pub fn resolve_declaration(
    &self,
    declaration: &Declaration,
  ) -> Result<Vec<ResolvedReference>, ResolveError> {
    let tokens = tokenize(&declaration.value);
    self.resolve_tokens(declaration, &tokens)
  }

  fn resolve_tokens(
    &self,
    declaration: &Declaration,
    tokens: &[UrlToken],
  ) -> Result<Vec<ResolvedReference>, ResolveError> {
    let mut resolved = Vec::new();
    let mut shared: Option<BaseContext> = None;

    for (token_index, token) in tokens.iter().enumerate() {
      let UrlToken::Url(reference) = token else {
        continue;
      };
      if should_ignore_uri(&reference.uri) {
        tracing::debug!(uri = %reference.uri, "skipping non-local url()");
        continue;
      }
      let (uri, suffix) = split_query(&reference.uri);
      if uri.is_empty() {
        continue;
      }

      if shared.is_none() {
        shared = Some(self.declaration_context(declaration)?);
      }
      let mut context = shared.clone().unwrap_or_default();
      let position = declaration
        .value_start
        .advance(&declaration.value[..reference.offset]);
      context.substring = Some(self.reversor.directory_for(position)?);

      let item = JoinItem {
        filename: &self.filename,
        uri,
        is_absolute: is_absolute_uri(uri),
        context: &context,
      };
      let resolution = resolve(&item, self.strategy.as_ref(), self.fs)?;
      if let Some(log) = self.log {
        log.log_attempts(&self.filename, uri, &resolution.attempts);
      }

      let replacement = match &resolution.result {
        ResolutionResult::Found(path) | ResolutionResult::NotFound(NotFound::Fallback(path)) => {
          let mut rendered = self.render(path);
          if self.config.keep_query {
            rendered.push_str(suffix);
          }
          rendered
        }
        ResolutionResult::NotFound(NotFound::Original(_)) => reference.uri.clone(),
      };

      resolved.push(ResolvedReference {
        token_index,
        original: reference.uri.clone(),
        replacement,
        resolution,
      });
    }

    Ok(resolved)
  }

  fn declaration_context(&self, declaration: &Declaration) -> Result<BaseContext, ResolveError> {
    let directory = |position: Option<SourceCoordinate>| {
      position
        .map(|position| self.reversor.directory_for(position))
        .transpose()
    };

    Ok(BaseContext {
      substring: None,
      value: directory(Some(declaration.value_start))?,
      property: directory(declaration.property_start)?,
      selector: directory(declaration.selector_start)?,
    })
  }

  fn render(&self, path: &Path) -> String {
    if self.config.absolute || self.output_dir.as_os_str().is_empty() {
      to_slash(path)
    } else {
      to_slash(&relative_to(path, &self.output_dir))
    }
  }
}
