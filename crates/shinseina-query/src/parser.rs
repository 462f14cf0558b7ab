//! Free text -> `ParsedQuery`.
//!
//! All matchers are compiled once when the parser is built from the catalogue
//! vocabulary. Each attribute uses a `RegexSet` whose pattern order is the
//! scan order, so the lowest matching index is the first match.

use regex::{Regex, RegexSet};
use std::collections::BTreeMap;
use tracing::debug;

use shinseina_core::error::{Error, Result};
use shinseina_core::traits::MetadataStore;
use shinseina_core::types::{Category, FilterAttribute, ParsedQuery};

use crate::fragments::FragmentDecomposer;

pub const FLORA_KEYWORDS: &[&str] = &["flora", "floras", "plants", "plant", "tree", "flowers", "flower", "bush", "vine"];
pub const MINERAL_KEYWORDS: &[&str] = &["mineral", "ore", "rock", "crystal", "stone", "gem", "material"];

/// Patterns paired with the value each one yields.
struct Matcher { set: RegexSet, values: Vec<String> }

impl Matcher {
    fn new(patterns: Vec<String>, values: Vec<String>) -> Result<Self> {
        let set = RegexSet::new(&patterns).map_err(|e| Error::InvalidConfig(format!("bad vocabulary pattern: {e}")))?;
        Ok(Self { set, values })
    }

    fn substring(values: Vec<String>) -> Result<Self> {
        let patterns = values.iter().map(|v| regex::escape(v)).collect();
        Self::new(patterns, values)
    }

    fn whole_word(values: Vec<String>) -> Result<Self> {
        let patterns = values.iter().map(|v| format!(r"\b{}\b", regex::escape(v))).collect();
        Self::new(patterns, values)
    }

    fn first(&self, text: &str) -> Option<&str> {
        self.set.matches(text).iter().next().map(|i| self.values[i].as_str())
    }
}

pub struct QueryParser {
    all_word: Regex,
    number: Regex,
    noise: Regex,
    category: Matcher,
    rarity: Matcher,
    region: Matcher,
    decomposer: FragmentDecomposer,
}

/// Longest values first so a label is preferred over its own prefix
/// (`legendary+` before `legendary`), then lexicographic.
fn scan_order(mut values: Vec<String>) -> Vec<String> {
    values.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    values.dedup();
    values
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidConfig(format!("bad pattern {pattern}: {e}")))
}

impl QueryParser {
    pub fn new(rarities: Vec<String>, regions: Vec<String>) -> Result<Self> {
        let mut keywords = Vec::new();
        let mut categories = Vec::new();
        for (category, words) in [(Category::Flora, FLORA_KEYWORDS), (Category::Mineral, MINERAL_KEYWORDS)] {
            for word in words {
                keywords.push(regex::escape(word));
                categories.push(category.as_str().to_string());
            }
        }
        let clean = |v: Vec<String>| scan_order(v.into_iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect());
        Ok(Self {
            all_word: compile(r"\ball\b")?,
            number: compile(r"\b([0-9]+)\b")?,
            noise: compile(r"\ball\b|\b[0-9]+\b")?,
            category: Matcher::new(keywords, categories)?,
            rarity: Matcher::substring(clean(rarities))?,
            region: Matcher::whole_word(clean(regions))?,
            decomposer: FragmentDecomposer::new()?,
        })
    }

    /// Build the rarity and region vocabularies from the store's known keys.
    pub fn from_store(store: &dyn MetadataStore) -> Result<Self> {
        let mut rarities = Vec::new();
        let mut regions = Vec::new();
        for key in store.filter_keys() {
            match key.attribute {
                FilterAttribute::Rarity => rarities.push(key.value.clone()),
                FilterAttribute::Region => regions.push(key.value.clone()),
                FilterAttribute::Category | FilterAttribute::Rank => {}
            }
        }
        debug!("Parser vocabulary: {} rarities, {} regions", rarities.len(), regions.len());
        Self::new(rarities, regions)
    }

    /// `default_limit` applies when the text names no limit; `0` means unlimited.
    pub fn parse(&self, raw: &str, default_limit: usize) -> Result<ParsedQuery> {
        if raw.trim().is_empty() { return Err(Error::EmptyQuery); }
        let q = raw.to_lowercase();
        let limit = self.extract_limit(&q, default_limit);
        let filters = self.extract_filters(&q);
        let semantic = self.semantic_residual(raw, &q, &filters);
        let fragments = self.decomposer.split(&semantic);
        debug!(?limit, ?filters, %semantic, ?fragments, "parsed query");
        Ok(ParsedQuery { filters, limit, semantic, fragments })
    }

    fn extract_limit(&self, q: &str, default_limit: usize) -> Option<usize> {
        if self.all_word.is_match(q) { return None; }
        let explicit = self.number.captures(q)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().parse::<usize>().unwrap_or(0));
        match explicit.unwrap_or(default_limit) {
            0 => None,
            n => Some(n),
        }
    }

    fn extract_filters(&self, q: &str) -> BTreeMap<FilterAttribute, String> {
        let mut filters = BTreeMap::new();
        for (attribute, matcher) in [
            (FilterAttribute::Category, &self.category),
            (FilterAttribute::Rarity, &self.rarity),
            (FilterAttribute::Region, &self.region),
        ] {
            if let Some(value) = matcher.first(q) { filters.insert(attribute, value.to_string()); }
        }
        filters
    }

    fn semantic_residual(&self, raw: &str, q: &str, filters: &BTreeMap<FilterAttribute, String>) -> String {
        let mut text = q.to_string();
        for value in filters.values() { text = text.replace(value.as_str(), " "); }
        let text = self.noise.replace_all(&text, " ");
        let residual = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if residual.is_empty() { raw.to_string() } else { residual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(
            vec!["common".into(), "rare".into(), "legendary".into(), "legendary+".into()],
            vec!["forest".into(), "deep sea".into(), "tundra".into()],
        ).unwrap()
    }

    #[test]
    fn limit_rules() {
        let p = parser();
        assert_eq!(p.parse("3 glowing mushrooms", 5).unwrap().limit, Some(3));
        assert_eq!(p.parse("glowing mushrooms 7 or 9", 5).unwrap().limit, Some(7));
        assert_eq!(p.parse("show all glowing mushrooms", 5).unwrap().limit, None);
        assert_eq!(p.parse("glowing mushrooms", 5).unwrap().limit, Some(5));
        assert_eq!(p.parse("glowing mushrooms", 2).unwrap().limit, Some(2));
        assert_eq!(p.parse("0 glowing mushrooms", 5).unwrap().limit, None);
        assert_eq!(p.parse("99999999999999999999999 mushrooms", 5).unwrap().limit, None);
        // `all` only counts as a whole word.
        assert_eq!(p.parse("tall trees", 5).unwrap().limit, Some(5));
    }

    #[test]
    fn flora_keywords_win_over_mineral_keywords() {
        let p = parser();
        let parsed = p.parse("a plant growing on rock", 5).unwrap();
        assert_eq!(parsed.filters.get(&FilterAttribute::Category).map(String::as_str), Some("flora"));
        let parsed = p.parse("a shiny crystal", 5).unwrap();
        assert_eq!(parsed.filters.get(&FilterAttribute::Category).map(String::as_str), Some("mineral"));
    }

    #[test]
    fn longer_rarity_label_is_preferred() {
        let p = parser();
        let parsed = p.parse("legendary+ beasts", 5).unwrap();
        assert_eq!(parsed.filters.get(&FilterAttribute::Rarity).map(String::as_str), Some("legendary+"));
    }

    #[test]
    fn region_requires_whole_word() {
        let p = parser();
        assert!(p.parse("forestry tools", 5).unwrap().filters.get(&FilterAttribute::Region).is_none());
        let parsed = p.parse("creatures of the deep sea", 5).unwrap();
        assert_eq!(parsed.filters.get(&FilterAttribute::Region).map(String::as_str), Some("deep sea"));
        assert_eq!(parsed.semantic, "creatures of the");
    }

    #[test]
    fn blank_input_is_rejected() {
        let p = parser();
        assert!(matches!(p.parse("", 5), Err(Error::EmptyQuery)));
        assert!(matches!(p.parse("  \t ", 5), Err(Error::EmptyQuery)));
    }

    #[test]
    fn residual_falls_back_to_raw_text() {
        let p = parser();
        let parsed = p.parse("Rare 4", 5).unwrap();
        assert_eq!(parsed.limit, Some(4));
        assert_eq!(parsed.semantic, "Rare 4");
        assert_eq!(parsed.fragments, vec!["rare 4".to_string()]);
        // kept as typed, surrounding whitespace included
        assert_eq!(p.parse("  Rare 4\t", 5).unwrap().semantic, "  Rare 4\t");
    }

    #[test]
    fn empty_vocabulary_still_parses() {
        let p = QueryParser::new(Vec::new(), Vec::new()).unwrap();
        let parsed = p.parse("glowing moss", 5).unwrap();
        assert!(parsed.filters.is_empty());
        assert_eq!(parsed.semantic, "glowing moss");
    }
}
