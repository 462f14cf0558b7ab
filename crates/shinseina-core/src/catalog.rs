//! In-memory catalogue: item records plus the inverted filter index.
//!
//! Loads the two files the index builder writes next to the vector index:
//! a JSON array of item records and a `reverse_map.json` keyed by
//! `attribute:value`. Both are read once; the catalogue is immutable after.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::MetadataStore;
use crate::types::{FilterAttribute, FilterKey, IdSet, ItemId, ItemRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterIndex {
    entries: BTreeMap<FilterKey, IdSet>,
}

impl FilterIndex {
    pub fn new() -> Self { Self::default() }

    /// Derive the index from records: one key per non-empty
    /// category, rarity, region and rank value.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ItemRecord>) -> Self {
        let mut index = Self::new();
        for item in items {
            for attribute in FilterAttribute::ALL {
                if let Some(value) = item.filter_value(attribute) {
                    index.insert(FilterKey::new(attribute, value), item.id);
                }
            }
        }
        index
    }

    /// Parse a `reverse_map.json` document. Keys without a known
    /// `attribute:` prefix are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<ItemId>> = serde_json::from_str(json)
            .map_err(|e| Error::IndexUnavailable(format!("filter map is not valid JSON: {}", e)))?;
        let mut index = Self::new();
        for (key, ids) in raw {
            match key.parse::<FilterKey>() {
                Ok(parsed) => {
                    let set = index.entries.entry(parsed).or_default();
                    set.extend(ids);
                }
                Err(e) => warn!("Skipping filter map entry '{}': {}", key, e),
            }
        }
        Ok(index)
    }

    pub fn insert(&mut self, key: FilterKey, id: ItemId) {
        self.entries.entry(key).or_default().insert(id);
    }

    pub fn get(&self, key: &FilterKey) -> Option<&IdSet> { self.entries.get(key) }

    pub fn keys(&self) -> impl Iterator<Item = &FilterKey> { self.entries.keys() }

    /// Known values for one attribute, in key order.
    pub fn values(&self, attribute: FilterAttribute) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|k| k.attribute == attribute)
            .map(|k| k.value.as_str())
            .collect()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Drop ids that `known` rejects; returns how many were removed.
    fn retain_ids(&mut self, known: impl Fn(ItemId) -> bool) -> usize {
        let mut removed = 0usize;
        for (key, ids) in self.entries.iter_mut() {
            let before = ids.len();
            ids.retain(|id| known(*id));
            if ids.len() != before {
                warn!("Filter key '{}' referenced {} unknown item ids", key, before - ids.len());
                removed += before - ids.len();
            }
        }
        removed
    }
}

/// Item records indexed by id, together with their filter index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, ItemRecord>,
    filters: FilterIndex,
}

impl Catalog {
    /// Build from records, deriving the filter index from them.
    pub fn from_items(items: Vec<ItemRecord>) -> Result<Self> {
        let filters = FilterIndex::from_items(&items);
        Self::new(items, filters)
    }

    /// Build from records and an externally produced filter index.
    /// Duplicate ids are rejected; filter ids without a record are dropped.
    pub fn new(items: Vec<ItemRecord>, mut filters: FilterIndex) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for item in items {
            let id = item.id;
            if by_id.insert(id, item).is_some() {
                return Err(Error::IndexUnavailable(format!("duplicate item id {}", id)));
            }
        }
        let dropped = filters.retain_ids(|id| by_id.contains_key(&id));
        if dropped > 0 {
            warn!("Dropped {} dangling ids from the filter index", dropped);
        }
        Ok(Self { items: by_id, filters })
    }

    /// Load records from `metadata_path` and, when given, the filter map from
    /// `filter_map_path`. A missing or unreadable file is `IndexUnavailable`.
    pub fn load(metadata_path: &Path, filter_map_path: Option<&Path>) -> Result<Self> {
        let items_json = read_file(metadata_path)?;
        let items: Vec<ItemRecord> = serde_json::from_str(&items_json).map_err(|e| {
            Error::IndexUnavailable(format!("{} is not a valid item list: {}", metadata_path.display(), e))
        })?;
        debug!("Read {} item records from {}", items.len(), metadata_path.display());
        let catalog = match filter_map_path {
            Some(path) => Self::new(items, FilterIndex::from_json(&read_file(path)?)?)?,
            None => Self::from_items(items)?,
        };
        info!("Catalog loaded: {} items, {} filter keys", catalog.len(), catalog.filters.len());
        Ok(catalog)
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn filters(&self) -> &FilterIndex { &self.filters }

    pub fn values(&self, attribute: FilterAttribute) -> Vec<&str> { self.filters.values(attribute) }
}

impl MetadataStore for Catalog {
    fn get_item(&self, id: ItemId) -> Option<&ItemRecord> { self.items.get(&id) }

    fn lookup_filter(&self, key: &FilterKey) -> Option<&IdSet> { self.filters.get(key) }

    fn filter_keys(&self) -> Vec<&FilterKey> { self.filters.keys().collect() }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::IndexUnavailable(format!("cannot read {}: {}", path.display(), e)))
}
