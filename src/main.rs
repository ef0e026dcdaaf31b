use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use css_url_resolver::config::ResolverConfig;
use css_url_resolver::debug::DebugLog;
use css_url_resolver::join::JoinKind;
use css_url_resolver::stylesheet::rewrite_file;
use tracing_subscriber::EnvFilter;

/// Rewrite `url()` references in a generated stylesheet so they point at the assets next to the
/// original authored sources.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Generated stylesheet to rewrite
  input: PathBuf,

  /// Source map for the stylesheet. Discovered from the stylesheet when omitted.
  #[arg(long)]
  map: Option<PathBuf>,

  /// Write the result here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Directory that root-relative URIs resolve against
  #[arg(long)]
  root: Option<PathBuf>,

  /// Let the search strategy attempt the root directory itself
  #[arg(long)]
  include_root: bool,

  /// Maximum number of directories the search strategy attempts (0 is unbounded)
  #[arg(long)]
  attempts: Option<usize>,

  /// Keep `?query` and `#fragment` suffixes on rewritten URIs
  #[arg(long)]
  keep_query: bool,

  /// Emit absolute paths
  #[arg(long)]
  absolute: bool,

  /// Join strategy: `default` or `search`
  #[arg(long)]
  join: Option<JoinKind>,

  /// Configuration file. `css-url-resolver.{json,yaml,yml}` in the working directory otherwise.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Print a trace of every resolution
  #[arg(long)]
  debug: bool,

  /// Verbose logging
  #[arg(short, long)]
  verbose: bool,
}

impl Args {
  fn apply(&self, config: &mut ResolverConfig) {
    if let Some(root) = &self.root {
      config.root = Some(root.clone());
    }
    if let Some(attempts) = self.attempts {
      config.attempts = Some(attempts);
    }
    if let Some(join) = self.join {
      config.join = join;
    }
    config.include_root |= self.include_root;
    config.keep_query |= self.keep_query;
    config.absolute |= self.absolute;
    config.debug |= self.debug;
  }
}

fn main() -> Result<()> {
  let args = Args::parse();

  let level = if args.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();

  let cwd = std::env::current_dir().context("failed to read the working directory")?;
  let mut config = match &args.config {
    Some(path) => ResolverConfig::from_path(path)?,
    None => ResolverConfig::discover(&cwd),
  };
  args.apply(&mut config);
  config.root = config.resolved_root(&cwd);

  let log = DebugLog::tracing(config.debug);
  let css = rewrite_file(&args.input, args.map.as_deref(), &config, &log)?;

  match &args.output {
    Some(path) => {
      fs::write(path, css).with_context(|| format!("failed to write {}", path.display()))?;
      tracing::debug!(output = %path.display(), "stylesheet written");
    }
    None => io::stdout()
      .lock()
      .write_all(css.as_bytes())
      .context("failed to write to stdout")?,
  }
  Ok(())
}
