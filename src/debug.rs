//! Human readable traces of resolution attempts.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::Attempt;
use crate::paths::{relative_to, to_slash};

const FORMATTER: &str = "format_attempts";

/// Destination for debug traces.
#[derive(Default)]
pub enum DebugSink {
  /// Traces are not produced.
  #[default]
  Disabled,
  /// Traces are emitted through `tracing` at info level.
  Tracing,
  /// Traces are handed to a callback.
  Custom(Box<dyn Fn(&str) + Send + Sync>),
}

impl fmt::Debug for DebugSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Disabled => f.write_str("Disabled"),
      Self::Tracing => f.write_str("Tracing"),
      Self::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

/// Deduplicating debug logger scoped to a single build invocation.
///
/// Identical traces are only written once for the lifetime of the logger, or until
/// [`DebugLog::reset`] is called.
#[derive(Debug)]
pub struct DebugLog {
  sink: DebugSink,
  working_dir: PathBuf,
  seen: Mutex<BTreeSet<String>>,
}

impl Default for DebugLog {
  fn default() -> Self {
    Self::disabled()
  }
}

impl DebugLog {
  /// Logger that never writes anything.
  pub fn disabled() -> Self {
    Self::new(DebugSink::Disabled, PathBuf::new())
  }

  /// Logger writing to `sink`, rendering paths under `working_dir` relatively.
  pub fn new(sink: DebugSink, working_dir: impl Into<PathBuf>) -> Self {
    Self {
      sink,
      working_dir: working_dir.into(),
      seen: Mutex::new(BTreeSet::new()),
    }
  }

  /// Logger emitting through `tracing` when `enabled`, relative to the process working directory.
  pub fn tracing(enabled: bool) -> Self {
    let sink = if enabled {
      DebugSink::Tracing
    } else {
      DebugSink::Disabled
    };
    Self::new(sink, std::env::current_dir().unwrap_or_default())
  }

  /// Whether traces are produced at all.
  pub fn is_enabled(&self) -> bool {
    !matches!(self.sink, DebugSink::Disabled)
  }

  /// Write the trace for one resolved URI unless an identical one was already written.
  ///
  /// Returns `true` when the trace was written.
  pub fn log_attempts(&self, filename: &Path, uri: &str, attempts: &[Attempt]) -> bool {
    if !self.is_enabled() {
      return false;
    }

    let message = format_attempts(filename, uri, attempts, &self.working_dir);
    let key = serde_json::to_string(&(FORMATTER, filename, uri, attempts))
      .unwrap_or_else(|_| message.clone());
    let is_new = match self.seen.lock() {
      Ok(mut seen) => seen.insert(key),
      Err(poisoned) => poisoned.into_inner().insert(key),
    };
    if !is_new {
      return false;
    }

    match &self.sink {
      DebugSink::Disabled => return false,
      DebugSink::Tracing => tracing::info!(target: "css_url_resolver::debug", "{message}"),
      DebugSink::Custom(callback) => callback(&message),
    }
    true
  }

  /// Forget every trace written so far.
  pub fn reset(&self) {
    match self.seen.lock() {
      Ok(mut seen) => seen.clear(),
      Err(poisoned) => poisoned.into_inner().clear(),
    }
  }
}

/// Render the attempts made for one URI.
///
/// The first line names the stylesheet and URI, each following line shows `base --> joined`
/// and the last line is `FOUND` or `NOT FOUND`.
pub fn format_attempts(filename: &Path, uri: &str, attempts: &[Attempt], working_dir: &Path) -> String {
  let mut lines = vec![format!(
    "css-url-resolver: {}: {}",
    display_path(filename, working_dir),
    uri
  )];

  for attempt in attempts {
    let joined = attempt
      .joined
      .as_deref()
      .map_or_else(|| "-".to_string(), |path| display_path(path, working_dir));
    lines.push(format!(
      "  {} --> {}",
      display_path(&attempt.base.path, working_dir),
      joined
    ));
  }

  let found = attempts.iter().any(|attempt| attempt.is_success);
  lines.push(if found { "  FOUND" } else { "  NOT FOUND" }.to_string());
  lines.join("\n")
}

fn display_path(path: &Path, working_dir: &Path) -> String {
  if path.as_os_str().is_empty() {
    return "\"\"".to_string();
  }
  if !working_dir.as_os_str().is_empty() && path.starts_with(working_dir) {
    let relative = to_slash(&relative_to(path, working_dir));
    if relative.is_empty() {
      return ".".to_string();
    }
    return format!("./{relative}");
  }
  to_slash(path)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::models::{CandidateBase, Provenance};

  fn attempts() -> Vec<Attempt> {
    vec![
      Attempt {
        base: CandidateBase::new("/proj/src/styles", Provenance::Value),
        uri: "x.png".into(),
        joined: Some("/proj/src/styles/x.png".into()),
        is_success: false,
        is_fallback: true,
      },
      Attempt {
        base: CandidateBase::new("/elsewhere/theme", Provenance::Selector),
        uri: "x.png".into(),
        joined: Some("/elsewhere/theme/x.png".into()),
        is_success: true,
        is_fallback: false,
      },
    ]
  }

  #[test]
  fn formats_relative_and_absolute_paths() {
    let trace = format_attempts(
      Path::new("/proj/dist/main.css"),
      "x.png",
      &attempts(),
      Path::new("/proj"),
    );

    assert_eq!(
      trace,
      "css-url-resolver: ./dist/main.css: x.png\n  ./src/styles --> ./src/styles/x.png\n  /elsewhere/theme --> /elsewhere/theme/x.png\n  FOUND"
    );
  }

  #[test]
  fn marks_misses() {
    let trace = format_attempts(Path::new("/a.css"), "x.png", &[], Path::new("/proj"));
    assert!(trace.ends_with("NOT FOUND"));
  }

  #[test]
  fn deduplicates_identical_traces_until_reset() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let log = DebugLog::new(
      DebugSink::Custom(Box::new(move |message| {
        sink_lines.lock().unwrap().push(message.to_string());
      })),
      "/proj",
    );
    let filename = Path::new("/proj/dist/main.css");

    assert!(log.log_attempts(filename, "x.png", &attempts()));
    assert!(!log.log_attempts(filename, "x.png", &attempts()));
    assert!(log.log_attempts(filename, "y.png", &attempts()));
    log.reset();
    assert!(log.log_attempts(filename, "x.png", &attempts()));

    assert_eq!(lines.lock().unwrap().len(), 3);
  }

  #[test]
  fn disabled_logs_write_nothing() {
    let log = DebugLog::disabled();
    assert!(!log.is_enabled());
    assert!(!log.log_attempts(Path::new("/a.css"), "x.png", &attempts()));
  }
}
