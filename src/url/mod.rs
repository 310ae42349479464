//! URL handling module for Sitegraph
//!
//! Page identity in the graph is the canonical URL: scheme, host, port, path
//! and query of the parsed URL with the fragment stripped. This module owns
//! that canonical form and the exact-host scoping rule used by the crawler.

mod domain;
mod normalize;

pub use domain::{extract_domain, same_host};
pub use normalize::{canonicalize, strip_fragment};
