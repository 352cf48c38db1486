//! XPath resolution: edit-config document synthesis and response pruning.
//!
//! The resolver owns the two halves of the library's query/structure
//! pair: [`build_strict`]/[`build_with_schema`] turn an XPath filter into
//! the hierarchical document an `edit-config` expects, and
//! [`resolve_xpath`] trims a get response down to the addressed node.

mod build;
mod prune;
mod xpath;

pub use build::{build_strict, build_with_schema, BuildResult};
pub use prune::resolve_xpath;
pub use xpath::{
    canonical_segments, canonicalize, is_strict_candidate, parse_strict, validate_for_build,
    Segment,
};
