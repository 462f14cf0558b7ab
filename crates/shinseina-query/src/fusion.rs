use std::collections::HashMap;

use shinseina_core::traits::MetadataStore;
use shinseina_core::types::{Candidate, ItemId, Neighbor, RankedItem};

use crate::diagnostics::{report, Diagnostic};

/// Merge per-fragment neighbours into one list ordered by mean distance.
///
/// An id's score is the mean over the fragments it appeared in; fragments
/// that did not return it are ignored. Equal scores keep first-seen order.
pub fn fuse(neighbours: impl IntoIterator<Item = Neighbor>) -> Vec<Candidate> {
    let mut slots: HashMap<ItemId, usize> = HashMap::new();
    let mut merged: Vec<Candidate> = Vec::new();
    for n in neighbours {
        match slots.get(&n.id) {
            Some(&slot) => {
                merged[slot].score += f64::from(n.distance);
                merged[slot].occurrences += 1;
            }
            None => {
                slots.insert(n.id, merged.len());
                merged.push(Candidate { id: n.id, score: f64::from(n.distance), occurrences: 1 });
            }
        }
    }
    for c in &mut merged {
        #[allow(clippy::cast_precision_loss)]
        let count = c.occurrences as f64;
        c.score /= count;
    }
    merged.sort_by(|a, b| a.score.total_cmp(&b.score));
    merged
}

/// Attach display fields from the catalogue and truncate to `limit`.
/// Ids without a record are skipped before they can take a slot.
pub fn finalize(candidates: Vec<Candidate>, limit: Option<usize>, store: &dyn MetadataStore, diagnostics: &mut Vec<Diagnostic>) -> Vec<RankedItem> {
    let take = limit.unwrap_or(usize::MAX);
    let mut results = Vec::with_capacity(candidates.len().min(take));
    for c in candidates {
        if results.len() >= take { break; }
        match store.get_item(c.id) {
            Some(record) => results.push(RankedItem::from_record(record, c.score)),
            None => report(diagnostics, Diagnostic::MissingItem(c.id)),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u64, distance: f32) -> Neighbor { Neighbor { id, distance } }

    #[test]
    fn repeated_ids_are_averaged_not_summed() {
        let fused = fuse(vec![n(7, 0.2), n(3, 0.4), n(7, 0.8)]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id, 3);
        assert_eq!(fused[1].id, 7);
        assert_eq!(fused[1].occurrences, 2);
        assert!((fused[1].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let fused = fuse(vec![n(9, 1.0), n(2, 1.0), n(5, 0.5), n(4, 1.0)]);
        let ids: Vec<_> = fused.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![5, 9, 2, 4]);
    }

    #[test]
    fn single_occurrence_keeps_raw_distance() {
        let fused = fuse(vec![n(1, 0.25)]);
        assert_eq!(fused[0].occurrences, 1);
        assert!((fused[0].score - 0.25).abs() < 1e-9);
        assert!(fuse(Vec::new()).is_empty());
    }
}
