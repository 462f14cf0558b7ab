use std::fs;
use tempfile::TempDir;

use shinseina_core::config::{Config, IndexBackend};
use shinseina_core::traits::MetadataStore;
use shinseina_core::types::{Category, FilterAttribute, FilterKey, ItemRecord, RankedItem};
use shinseina_core::{Catalog, Error, FilterIndex};

const RECORDS: &str = r#"[
  {"id": 0, "name": "moonpetal", "category": "flora", "rarity": "rare", "region": "forest",
   "rank": "", "Link": "https://example.org/post/moonpetal", "Location": "Whispering Forest", "rank_value": 8},
  {"id": 1, "name": "ember ore", "category": "mineral", "rarity": "common", "region": "mountain", "rank": "b"},
  {"id": 2, "name": "tidebloom", "category": "flora", "rarity": "legendary+", "region": "ocean"}
]"#;

fn write_records(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("index_metadata_map.json");
    fs::write(&path, RECORDS).unwrap();
    path
}

#[test]
fn records_keep_link_and_extra_fields() {
    let items: Vec<ItemRecord> = serde_json::from_str(RECORDS).unwrap();
    assert_eq!(items[0].link.as_deref(), Some("https://example.org/post/moonpetal"));
    assert_eq!(items[0].extra.get("Location").and_then(|v| v.as_str()), Some("Whispering Forest"));
    assert_eq!(items[1].category, Category::Mineral);
    assert_eq!(items[0].filter_value(FilterAttribute::Rank), None, "empty rank is absent");
    assert_eq!(items[1].filter_value(FilterAttribute::Rank).as_deref(), Some("b"));
}

#[test]
fn filter_index_derived_from_records() {
    let tmp = TempDir::new().unwrap();
    let catalog = Catalog::load(&write_records(tmp.path()), None).expect("load");
    assert_eq!(catalog.len(), 3);

    let flora = catalog.lookup_filter(&FilterKey::new(FilterAttribute::Category, "flora")).unwrap();
    assert_eq!(flora.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(catalog.values(FilterAttribute::Rarity), vec!["common", "legendary+", "rare"]);
    assert!(catalog.lookup_filter(&FilterKey::new(FilterAttribute::Region, "tundra")).is_none());
    assert!(catalog.lookup_filter(&FilterKey::new(FilterAttribute::Rank, "")).is_none());
}

#[test]
fn unknown_or_missing_category_still_loads() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index_metadata_map.json");
    fs::write(&path, r#"[
      {"id": 5, "name": "dusk stalker", "category": "creature", "rarity": "rare", "region": "forest"},
      {"id": 6, "name": "nameless shard", "rarity": "common", "region": "cave"},
      {"id": 7, "name": "moss", "category": "flora", "rarity": "common", "region": "forest"}
    ]"#).unwrap();

    let catalog = Catalog::load(&path, None).expect("load");
    assert_eq!(catalog.len(), 3);
    let stalker = catalog.get_item(5).unwrap();
    assert_eq!(stalker.category, Category::Other);
    assert_eq!(stalker.category.to_string(), "???");
    assert_eq!(catalog.get_item(6).unwrap().category, Category::Other);
    assert!(RankedItem::from_record(stalker, 0.5).to_string().contains("???"));

    assert_eq!(catalog.values(FilterAttribute::Category), vec!["flora"]);
    assert!(catalog.lookup_filter(&FilterKey::new(FilterAttribute::Category, "???")).is_none());
    let forest = catalog.lookup_filter(&FilterKey::new(FilterAttribute::Region, "forest")).unwrap();
    assert_eq!(forest.iter().copied().collect::<Vec<_>>(), vec![5, 7]);
}

#[test]
fn reverse_map_drops_dangling_ids_and_bad_keys() {
    let tmp = TempDir::new().unwrap();
    let records = write_records(tmp.path());
    let reverse = tmp.path().join("reverse_map.json");
    fs::write(&reverse, r#"{"rarity:rare": [0, 99], "region:Forest": [0], "forest": [0]}"#).unwrap();

    let catalog = Catalog::load(&records, Some(&reverse)).expect("load");
    let rare = catalog.lookup_filter(&FilterKey::new(FilterAttribute::Rarity, "rare")).unwrap();
    assert!(rare.contains(&0));
    assert!(!rare.contains(&99), "id without a record is dropped");
    // values are normalised to lower case
    assert!(catalog.lookup_filter(&FilterKey::new(FilterAttribute::Region, "forest")).is_some());
    assert_eq!(catalog.filter_keys().len(), 2, "unprefixed key is skipped");
}

#[test]
fn missing_files_are_index_unavailable() {
    let tmp = TempDir::new().unwrap();
    let err = Catalog::load(&tmp.path().join("nope.json"), None).unwrap_err();
    assert!(matches!(err, Error::IndexUnavailable(_)));

    let bad = tmp.path().join("bad.json");
    fs::write(&bad, "{not json").unwrap();
    assert!(matches!(Catalog::load(&bad, None).unwrap_err(), Error::IndexUnavailable(_)));
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut items: Vec<ItemRecord> = serde_json::from_str(RECORDS).unwrap();
    items.push(items[0].clone());
    assert!(matches!(Catalog::from_items(items), Err(Error::IndexUnavailable(_))));
}

#[test]
fn filter_key_round_trips_through_text() {
    let key: FilterKey = "region:Deep Sea".parse().unwrap();
    assert_eq!(key, FilterKey::new(FilterAttribute::Region, "deep sea"));
    assert_eq!(key.to_string(), "region:deep sea");
    assert!("colour:red".parse::<FilterKey>().is_err());
    assert!(FilterIndex::from_json("[1, 2]").is_err());
}

#[test]
fn ranked_item_renders_result_line() {
    let items: Vec<ItemRecord> = serde_json::from_str(RECORDS).unwrap();
    let line = RankedItem::from_record(&items[1], 0.4567).to_string();
    assert!(line.starts_with("[   1] ember ore"));
    assert!(line.ends_with("(mineral, common, mountain) | Score: 0.46"));
}

#[test]
fn config_defaults_and_overrides() {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml_str(
        r#"
        [search]
        default_limit = 8
        [index]
        backend = "lance"
        table = "shin_items"
        "#,
        tmp.path(),
    )
    .expect("config");
    let settings = config.settings().unwrap();
    assert_eq!(settings.search.default_limit, 8);
    assert_eq!(settings.search.overfetch, 100);
    assert_eq!(settings.index.backend, IndexBackend::Lance);
    assert_eq!(settings.embedding.dimension, 384);
    assert_eq!(config.resolve(&settings.catalog.metadata_path), tmp.path().join("data/index_metadata_map.json"));
    let limit: usize = config.get("search.default_limit").unwrap();
    assert_eq!(limit, 8);
}

#[test]
fn config_rejects_zero_limits() {
    let tmp = TempDir::new().unwrap();
    assert!(Config::from_toml_str("[search]\ndefault_limit = 0\n", tmp.path()).is_err());
    assert!(Config::from_toml_str("[search]\noverfetch = 0\n", tmp.path()).is_err());
}

#[test]
fn config_file_is_read_from_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[catalog]\nmetadata_path = \"items.json\"\nfilter_map_path = \"rev.json\"\n").unwrap();
    let config = Config::load_from(tmp.path()).expect("load");
    let settings = config.settings().unwrap();
    assert_eq!(settings.catalog.metadata_path, "items.json");
    assert_eq!(settings.catalog.filter_map_path.as_deref(), Some("rev.json"));
}
