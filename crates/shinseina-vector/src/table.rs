//! LanceDB connection and item-vector table helpers.
//!
//! Opens the database, writes `(id, vector)` rows and scans them back so the
//! in-memory index can be populated from the same table the Lance backend
//! queries.
use anyhow::{Result, anyhow};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, Table};
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, UInt64Array};
use arrow_array::types::Float32Type;

use shinseina_core::types::ItemId;

use crate::schema::{build_items_schema, ID_COLUMN, VECTOR_COLUMN};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Append rows to `name`, creating the table on first write.
pub async fn write_vectors(conn: &Connection, name: &str, dim: usize, rows: &[(ItemId, Vec<f32>)]) -> Result<()> {
    if rows.is_empty() { return Ok(()); }
    let batch = rows_to_record_batch(dim, rows)?;
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    if table_exists(conn, name).await? {
        conn.open_table(name).execute().await?.add(reader).execute().await?;
    } else {
        conn.create_table(name, reader).execute().await?;
    }
    Ok(())
}

fn rows_to_record_batch(dim: usize, rows: &[(ItemId, Vec<f32>)]) -> Result<RecordBatch> {
    let width = i32::try_from(dim)?;
    let mut ids = Vec::with_capacity(rows.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(rows.len());
    for (id, v) in rows {
        if v.len() != dim { return Err(anyhow!("item {} has dim {} expected {}", id, v.len(), dim)); }
        ids.push(i64::try_from(*id)?);
        vectors.push(Some(v.iter().map(|&x| Some(x)).collect()));
    }
    Ok(RecordBatch::try_new(build_items_schema(width), vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), width)),
    ])?)
}

/// Scan every `(id, vector)` row of the table.
pub async fn load_vectors(table: &Table) -> Result<Vec<(ItemId, Vec<f32>)>> {
    let mut stream = table.query().select(Select::columns(&[ID_COLUMN, VECTOR_COLUMN])).execute().await?;
    let mut rows = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        let ids = batch.column_by_name(ID_COLUMN).ok_or_else(|| anyhow!("{} column missing", ID_COLUMN))?;
        let vectors = batch.column_by_name(VECTOR_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| anyhow!("{} column missing or not a fixed-size list", VECTOR_COLUMN))?;
        for i in 0..batch.num_rows() {
            if vectors.is_null(i) { continue; }
            let value = vectors.value(i);
            let floats = value.as_any().downcast_ref::<Float32Array>().ok_or_else(|| anyhow!("vector items are not f32"))?;
            rows.push((id_at(ids.as_ref(), i)?, floats.values().to_vec()));
        }
    }
    Ok(rows)
}

/// Read an item id from an integer column of any of the widths index builders use.
pub(crate) fn id_at(col: &dyn Array, i: usize) -> Result<ItemId> {
    if let Some(a) = col.as_any().downcast_ref::<Int64Array>() { return Ok(ItemId::try_from(a.value(i))?); }
    if let Some(a) = col.as_any().downcast_ref::<UInt64Array>() { return Ok(a.value(i)); }
    if let Some(a) = col.as_any().downcast_ref::<Int32Array>() { return Ok(ItemId::try_from(a.value(i))?); }
    Err(anyhow!("unsupported id column type {:?}", col.data_type()))
}
