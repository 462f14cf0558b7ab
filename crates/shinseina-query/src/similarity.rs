use tracing::debug;

use shinseina_core::traits::{Embedder, EmbeddingIndex};
use shinseina_core::types::{IdSet, Neighbor};

use crate::diagnostics::{report, Diagnostic};

pub const DEFAULT_OVERFETCH: usize = 100;

/// Nearest-neighbour lookup for one fragment with post-hoc filtering.
///
/// The index is always asked for `overfetch` neighbours regardless of the
/// limit, so filtering has a wider pool to draw from.
pub struct SimilaritySearch<'a> {
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn EmbeddingIndex,
    pub overfetch: usize,
}

impl SimilaritySearch<'_> {
    /// Neighbours of `fragment` in ascending distance, restricted to `allowed`
    /// and capped at `limit`. Failures are reported and yield no neighbours.
    pub fn search(&self, fragment: &str, limit: Option<usize>, allowed: Option<&IdSet>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Neighbor> {
        let fragment = fragment.trim();
        if fragment.is_empty() { return Vec::new(); }

        let vector = match self.embedder.embed_text(fragment) {
            Ok(v) if v.len() == self.index.dim() => v,
            Ok(v) => {
                let message = format!("embedding has dim {} but the index expects {}", v.len(), self.index.dim());
                report(diagnostics, Diagnostic::EmbeddingFailure { fragment: fragment.to_string(), message });
                return Vec::new();
            }
            Err(e) => {
                report(diagnostics, Diagnostic::EmbeddingFailure { fragment: fragment.to_string(), message: e.to_string() });
                return Vec::new();
            }
        };

        let neighbours = match self.index.search(&vector, self.overfetch) {
            Ok(n) => n,
            Err(e) => {
                report(diagnostics, Diagnostic::SearchFailure { fragment: fragment.to_string(), message: e.to_string() });
                return Vec::new();
            }
        };

        let mut kept = Vec::new();
        for n in neighbours {
            if allowed.is_some_and(|ids| !ids.contains(&n.id)) { continue; }
            kept.push(n);
            if limit.is_some_and(|l| kept.len() >= l) { break; }
        }
        debug!("fragment '{}': {} candidates kept", fragment, kept.len());
        kept
    }
}
