//! Domain types shared by the catalogue, the index backends and the query engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ItemId = u64;
pub type IdSet = BTreeSet<ItemId>;

/// Top-level kind of a catalogue entry. Unknown or absent categories load as
/// `Other` and never produce a category filter key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Flora,
    Mineral,
    Fauna,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flora => "flora",
            Category::Mineral => "mineral",
            Category::Fauna => "fauna",
            Category::Other => "???",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Attributes an item can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAttribute {
    Category,
    Rarity,
    Region,
    Rank,
}

impl FilterAttribute {
    pub const ALL: [FilterAttribute; 4] = [
        FilterAttribute::Category,
        FilterAttribute::Rarity,
        FilterAttribute::Region,
        FilterAttribute::Rank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAttribute::Category => "category",
            FilterAttribute::Rarity => "rarity",
            FilterAttribute::Region => "region",
            FilterAttribute::Rank => "rank",
        }
    }
}

impl fmt::Display for FilterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FilterAttribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterAttribute::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| Error::NotFound(format!("filter attribute '{}'", s)))
    }
}

/// Lookup key into the filter index. Values are stored lower-case.
///
/// The textual form is `attribute:value`, matching the keys of the
/// `reverse_map.json` file written by the index builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilterKey {
    pub attribute: FilterAttribute,
    pub value: String,
}

impl FilterKey {
    pub fn new(attribute: FilterAttribute, value: impl AsRef<str>) -> Self {
        Self { attribute, value: value.as_ref().trim().to_lowercase() }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.attribute, self.value)
    }
}

impl FromStr for FilterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (attribute, value) = s
            .split_once(':')
            .ok_or_else(|| Error::NotFound(format!("filter key '{}' has no attribute prefix", s)))?;
        Ok(FilterKey::new(attribute.parse()?, value))
    }
}

fn unknown_label() -> String { "???".to_string() }

/// One catalogue entry as written by the index builder.
///
/// Only the fields the engine reads are typed; everything else the builder
/// stored (descriptions, location text, rank values) is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    #[serde(default = "unknown_label")]
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "unknown_label")]
    pub rarity: String,
    #[serde(default = "unknown_label")]
    pub region: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default, rename = "Link")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ItemRecord {
    /// Value of a filterable attribute, lower-cased as the filter index stores it.
    /// Empty values are treated as absent.
    pub fn filter_value(&self, attribute: FilterAttribute) -> Option<String> {
        let raw = match attribute {
            FilterAttribute::Category if self.category == Category::Other => None,
            FilterAttribute::Category => Some(self.category.as_str()),
            FilterAttribute::Rarity => Some(self.rarity.as_str()),
            FilterAttribute::Region => Some(self.region.as_str()),
            FilterAttribute::Rank => self.rank.as_deref(),
        }?;
        let value = raw.trim().to_lowercase();
        if value.is_empty() { None } else { Some(value) }
    }
}

/// One entry returned by an embedding index: lower distance is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: ItemId,
    pub distance: f32,
}

/// A query after parsing. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub filters: BTreeMap<FilterAttribute, String>,
    /// `None` means unlimited.
    pub limit: Option<usize>,
    /// Query text left after filter values, `all` and digit tokens are stripped.
    pub semantic: String,
    pub fragments: Vec<String>,
}

/// Intermediate fusion state for one id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: ItemId,
    /// Sum of distances while accumulating, mean once fused.
    pub score: f64,
    pub occurrences: usize,
}

/// Final ranked answer row. Lower `score` is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: ItemId,
    pub name: String,
    pub category: Category,
    pub rarity: String,
    pub region: String,
    pub link: Option<String>,
    pub score: f64,
}

impl RankedItem {
    pub fn from_record(record: &ItemRecord, score: f64) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            category: record.category,
            rarity: record.rarity.clone(),
            region: record.region.clone(),
            link: record.link.clone(),
            score,
        }
    }
}

impl fmt::Display for RankedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>4}] {:<30} ({}, {}, {}) | Score: {:.2}",
            self.id, self.name, self.category, self.rarity, self.region, self.score
        )
    }
}
