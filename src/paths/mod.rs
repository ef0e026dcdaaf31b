//! Helpers for classifying and normalising the URIs and paths handled by the resolver.
//!
//! The responsibilities are split into focused submodules so that URI filtering, query
//! handling and lexical path arithmetic can be tested independently of any filesystem.

mod filters;
mod normalize;
mod query;

pub use filters::{is_absolute_uri, should_ignore_uri};
pub use normalize::{is_normalized_absolute, normalize_path, relative_to, to_slash};
pub use query::split_query;
