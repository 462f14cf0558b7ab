use std::collections::BTreeMap;

use shinseina_core::traits::MetadataStore;
use shinseina_core::types::{FilterAttribute, FilterKey, IdSet};

use crate::diagnostics::{report, Diagnostic};

/// Ids satisfying every filter, or `None` when there are no filters.
///
/// A value the index has never seen resolves to the empty set.
pub fn resolve(store: &dyn MetadataStore, filters: &BTreeMap<FilterAttribute, String>, diagnostics: &mut Vec<Diagnostic>) -> Option<IdSet> {
    let empty = IdSet::new();
    let mut allowed: Option<IdSet> = None;
    for (attribute, value) in filters {
        let key = FilterKey::new(*attribute, value);
        let ids = store.lookup_filter(&key).unwrap_or_else(|| {
            report(diagnostics, Diagnostic::UnknownFilterKey(key.clone()));
            &empty
        });
        allowed = Some(match allowed {
            None => ids.clone(),
            Some(acc) => acc.intersection(ids).copied().collect(),
        });
    }
    allowed
}
