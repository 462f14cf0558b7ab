use crate::types::{FilterKey, IdSet, ItemId, ItemRecord, Neighbor};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for input"))
    }
}

/// Read-only k-nearest-neighbour index over item vectors.
pub trait EmbeddingIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    /// Up to `k` neighbours ordered by ascending distance.
    fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Neighbor>>;
}

/// Item records plus the inverted filter index.
pub trait MetadataStore: Send + Sync {
    fn get_item(&self, id: ItemId) -> Option<&ItemRecord>;
    /// `None` for a key the index has never seen; callers treat it as an empty set.
    fn lookup_filter(&self, key: &FilterKey) -> Option<&IdSet>;
    /// Every known key, in a stable order.
    fn filter_keys(&self) -> Vec<&FilterKey>;
}
