use std::fmt;
use tracing::warn;

use shinseina_core::types::{FilterKey, ItemId};

/// A non-fatal problem met while answering one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The filter index has no entry for this key; it matched nothing.
    UnknownFilterKey(FilterKey),
    /// The fragment could not be embedded and contributed no candidates.
    EmbeddingFailure { fragment: String, message: String },
    /// The index search for the fragment failed and it contributed no candidates.
    SearchFailure { fragment: String, message: String },
    /// The index returned an id the catalogue has no record for.
    MissingItem(ItemId),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownFilterKey(key) => write!(f, "Filter key not found: {key}"),
            Diagnostic::EmbeddingFailure { fragment, message } => write!(f, "Error encoding fragment '{fragment}': {message}"),
            Diagnostic::SearchFailure { fragment, message } => write!(f, "Index search failed for '{fragment}': {message}"),
            Diagnostic::MissingItem(id) => write!(f, "No catalogue record for id {id}"),
        }
    }
}

pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}
