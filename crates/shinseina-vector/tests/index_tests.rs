use shinseina_core::config::{IndexBackend, IndexSettings};
use shinseina_core::traits::EmbeddingIndex;
use shinseina_core::Error;
use shinseina_vector::table::{open_db, write_vectors};
use shinseina_vector::{open_index, LanceItemIndex};
use tempfile::TempDir;

const TABLE: &str = "items_test_tmp";

fn rows() -> Vec<(u64, Vec<f32>)> {
    vec![
        (1, vec![0.0, 0.0, 1.0, 0.0]),
        (2, vec![1.0, 0.0, 0.0, 0.0]),
        (3, vec![0.9, 0.1, 0.0, 0.0]),
        (4, vec![0.0, 1.0, 0.0, 0.0]),
    ]
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    let uri = tmp.path().to_string_lossy().to_string();
    let rt = tokio::runtime::Runtime::new().expect("rt");
    rt.block_on(async {
        let conn = open_db(&uri).await.expect("db");
        write_vectors(&conn, TABLE, 4, &rows()).await.expect("write");
    });
    tmp
}

#[test]
fn lance_index_ranks_by_squared_l2() {
    let tmp = fixture();
    let index = LanceItemIndex::open(&tmp.path().to_string_lossy(), TABLE).expect("open");
    assert_eq!(index.dim(), 4);
    assert_eq!(index.len(), 4);
    let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 2).expect("search");
    let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(hits[0].distance <= hits[1].distance);
    assert!(hits[0].distance.abs() < 1e-5);
    assert!((hits[1].distance - 0.02).abs() < 1e-4, "squared distance, got {}", hits[1].distance);
    assert!(index.search(&[1.0, 0.0], 2).is_err());
}

#[test]
fn memory_backend_matches_lance_backend() {
    let tmp = fixture();
    let query = [0.1f32, 0.9, 0.0, 0.0];
    let mut results = Vec::new();
    for backend in [IndexBackend::Memory, IndexBackend::Lance] {
        let settings = IndexSettings { backend, table: TABLE.to_string(), ..IndexSettings::default() };
        let index = open_index(&settings, tmp.path()).expect("open_index");
        assert_eq!(index.len(), 4);
        results.push(index.search(&query, 4).expect("search").iter().map(|h| h.id).collect::<Vec<_>>());
    }
    assert_eq!(results[0][0], 4);
    assert_eq!(results[0], results[1]);
}

#[test]
fn missing_table_is_index_unavailable() {
    let tmp = TempDir::new().expect("tmp");
    let err = LanceItemIndex::open(&tmp.path().to_string_lossy(), "nope").err().expect("error");
    assert!(matches!(err, Error::IndexUnavailable(_)));
}
