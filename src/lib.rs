#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod debug;
pub mod error;
pub mod fs;
pub mod join;
pub mod models;
pub mod paths;
pub mod rewriter;
pub mod source_map;
pub mod stylesheet;
pub mod tokenizer;

pub use config::ResolverConfig;
pub use debug::{DebugLog, DebugSink};
pub use error::ResolveError;
pub use join::{JoinItem, JoinKind, JoinStrategy, Operation};
pub use models::{Declaration, NotFound, Resolution, ResolutionResult, SourceCoordinate};
pub use rewriter::UrlRewriter;
pub use source_map::LoadedSourceMap;
pub use stylesheet::{rewrite_file, rewrite_stylesheet};
