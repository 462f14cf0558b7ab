//! Embedding-index backends for the catalogue.
//!
//! `FlatL2Index` keeps every vector in memory and searches exactly;
//! `LanceItemIndex` delegates to a LanceDB table. Both rank by squared
//! Euclidean distance, lower is better.

pub mod flat;
pub mod schema;
pub mod search;
pub mod table;

use std::path::Path;
use tracing::info;

use shinseina_core::config::{IndexBackend, IndexSettings};
use shinseina_core::error::Error;
use shinseina_core::traits::EmbeddingIndex;

pub use flat::FlatL2Index;
pub use search::LanceItemIndex;

/// Open the configured backend over the table at `lancedb_dir`.
///
/// The memory backend scans the table once and answers queries from RAM.
pub fn open_index(settings: &IndexSettings, lancedb_dir: &Path) -> shinseina_core::Result<Box<dyn EmbeddingIndex>> {
    let uri = lancedb_dir.to_string_lossy().to_string();
    let lance = LanceItemIndex::open(&uri, &settings.table)?;
    match settings.backend {
        IndexBackend::Lance => Ok(Box::new(lance)),
        IndexBackend::Memory => {
            let rows = lance.runtime().block_on(table::load_vectors(lance.table()))
                .map_err(|e| Error::IndexUnavailable(format!("{uri}/{}: {e}", settings.table)))?;
            let index = FlatL2Index::from_rows(lance.dim(), rows)
                .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
            info!("Loaded {} vectors into memory", index.len());
            Ok(Box::new(index))
        }
    }
}
