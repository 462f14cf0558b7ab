use anyhow::{Result, bail};
use shinseina_core::traits::EmbeddingIndex;
use shinseina_core::types::{ItemId, Neighbor};

/// Exact brute-force index using squared Euclidean distance.
///
/// Vectors are stored contiguously in insertion order; equal distances keep
/// that order.
#[derive(Debug, Clone)]
pub struct FlatL2Index { dim: usize, ids: Vec<ItemId>, data: Vec<f32> }

impl FlatL2Index {
    pub fn new(dim: usize) -> Self { Self { dim, ids: Vec::new(), data: Vec::new() } }

    pub fn from_rows(dim: usize, rows: impl IntoIterator<Item = (ItemId, Vec<f32>)>) -> Result<Self> {
        let mut index = Self::new(dim);
        for (id, v) in rows { index.add(id, &v)?; }
        Ok(index)
    }

    pub fn add(&mut self, id: ItemId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim { bail!("item {} has dim {} expected {}", id, vector.len(), self.dim); }
        self.ids.push(id);
        self.data.extend_from_slice(vector);
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl EmbeddingIndex for FlatL2Index {
    fn dim(&self) -> usize { self.dim }
    fn len(&self) -> usize { self.ids.len() }

    fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query_vec.len() != self.dim { bail!("query dim {} expected {}", query_vec.len(), self.dim); }
        if k == 0 || self.ids.is_empty() { return Ok(Vec::new()); }
        let mut scored: Vec<(usize, f32)> = self.data.chunks_exact(self.dim)
            .map(|row| squared_l2(query_vec, row))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        Ok(scored.into_iter().take(k).map(|(pos, distance)| Neighbor { id: self.ids[pos], distance }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_first_and_ties_keep_insertion_order() {
        let index = FlatL2Index::from_rows(2, vec![
            (10, vec![1.0, 0.0]),
            (11, vec![0.0, 1.0]),
            (12, vec![0.0, 0.0]),
        ]).unwrap();
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![12, 10, 11]);
        assert!((hits[1].distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let mut index = FlatL2Index::new(3);
        assert!(index.add(1, &[1.0]).is_err());
        assert!(index.search(&[1.0, 2.0], 5).is_err());
        assert!(index.search(&[0.0; 3], 5).unwrap().is_empty());
    }
}
