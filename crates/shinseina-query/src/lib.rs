//! Natural-language queries over the Shinseina catalogue.
//!
//! A query is parsed into a limit, categorical filters and clause fragments.
//! Filters resolve to an allow-set of ids, every fragment is searched in the
//! embedding index independently, and the per-fragment neighbours are fused
//! by averaging the distances of repeated ids.

pub mod diagnostics;
pub mod engine;
pub mod filters;
pub mod fragments;
pub mod fusion;
pub mod parser;
pub mod similarity;

pub use diagnostics::Diagnostic;
pub use engine::{QueryEngine, QueryReport};
pub use fragments::FragmentDecomposer;
pub use parser::QueryParser;
