use anyhow::{Result, anyhow, bail};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use arrow_array::Float32Array;

use shinseina_core::error::Error;
use shinseina_core::traits::EmbeddingIndex;
use shinseina_core::types::Neighbor;

use crate::schema::{vector_dim, ID_COLUMN};
use crate::table::{id_at, open_db, table_exists};

/// Nearest-neighbour search against a LanceDB table of item vectors.
///
/// Owns a tokio runtime so it can serve the synchronous `EmbeddingIndex`
/// interface; `search` must not be called from inside another runtime.
pub struct LanceItemIndex { rt: Runtime, table: Table, dim: usize, len: usize }

impl LanceItemIndex {
    pub fn open(uri: &str, table_name: &str) -> shinseina_core::Result<Self> {
        let unavailable = |e: anyhow::Error| Error::IndexUnavailable(format!("{uri}/{table_name}: {e}"));
        let rt = Runtime::new().map_err(|e| unavailable(e.into()))?;
        let (table, dim, len) = rt.block_on(async {
            let conn = open_db(uri).await?;
            if !table_exists(&conn, table_name).await? { bail!("table not found"); }
            let table = conn.open_table(table_name).execute().await?;
            let schema = table.schema().await?;
            let dim = vector_dim(&schema).ok_or_else(|| anyhow!("no fixed-size vector column"))?;
            let len = table.count_rows(None).await?;
            Ok::<_, anyhow::Error>((table, dim, len))
        }).map_err(unavailable)?;
        info!("Opened LanceDB table {} ({} rows, dim={})", table_name, len, dim);
        Ok(Self { rt, table, dim, len })
    }

    pub fn table(&self) -> &Table { &self.table }

    pub fn runtime(&self) -> &Runtime { &self.rt }
}

impl EmbeddingIndex for LanceItemIndex {
    fn dim(&self) -> usize { self.dim }
    fn len(&self) -> usize { self.len }

    fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query_vec.len() != self.dim { bail!("query dim {} expected {}", query_vec.len(), self.dim); }
        if k == 0 { return Ok(Vec::new()); }
        let mut hits = self.rt.block_on(async {
            let mut stream = self.table.vector_search(query_vec.to_vec())?
                .distance_type(DistanceType::L2)
                .select(Select::columns(&[ID_COLUMN]))
                .limit(k)
                .execute().await?;
            let mut hits = Vec::new();
            while let Some(batch) = stream.try_next().await? {
                let ids = batch.column_by_name(ID_COLUMN).ok_or_else(|| anyhow!("{} column missing", ID_COLUMN))?;
                let distances = batch.column_by_name("_distance")
                    .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                    .ok_or_else(|| anyhow!("_distance column missing"))?;
                for i in 0..batch.num_rows() {
                    hits.push(Neighbor { id: id_at(ids.as_ref(), i)?, distance: distances.value(i) });
                }
            }
            Ok::<_, anyhow::Error>(hits)
        })?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        debug!("LanceDB returned {} neighbours (k={})", hits.len(), k);
        Ok(hits)
    }
}
