use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use shinseina_core::config::{Config, SearchSettings};
use shinseina_core::error::{Error, Result};
use shinseina_core::traits::{Embedder, EmbeddingIndex, MetadataStore};
use shinseina_core::types::{ParsedQuery, RankedItem};
use shinseina_core::Catalog;

use crate::diagnostics::Diagnostic;
use crate::filters;
use crate::fusion::{finalize, fuse};
use crate::parser::QueryParser;
use crate::similarity::SimilaritySearch;

/// Everything one query produced, including the non-fatal problems.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub parsed: ParsedQuery,
    pub results: Vec<RankedItem>,
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Owned, immutable query engine. Safe to share across threads; queries keep
/// all their state on the stack.
pub struct QueryEngine {
    store: Box<dyn MetadataStore>,
    index: Box<dyn EmbeddingIndex>,
    embedder: Box<dyn Embedder>,
    parser: QueryParser,
    search: SearchSettings,
}

impl QueryEngine {
    pub fn new(store: Box<dyn MetadataStore>, index: Box<dyn EmbeddingIndex>, embedder: Box<dyn Embedder>, search: SearchSettings) -> Result<Self> {
        if embedder.dim() != index.dim() {
            return Err(Error::IndexUnavailable(format!("embedder dim {} does not match index dim {}", embedder.dim(), index.dim())));
        }
        let parser = QueryParser::from_store(store.as_ref())?;
        info!("Query engine ready: {} vectors, dim={}, overfetch={}", index.len(), index.dim(), search.overfetch);
        Ok(Self { store, index, embedder, parser, search })
    }

    /// Load catalogue, index and embedder as configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = config.settings()?;
        let metadata_path = config.resolve(&settings.catalog.metadata_path);
        let filter_map_path = settings.catalog.filter_map_path.as_ref().map(|p| config.resolve(p)).filter(|p| {
            let found = p.exists();
            if !found { info!("No filter map at {}; deriving filters from records", p.display()); }
            found
        });
        let catalog = Catalog::load(&metadata_path, filter_map_path.as_deref())?;
        let index = shinseina_vector::open_index(&settings.index, &config.resolve(&settings.index.lancedb_dir))?;
        let embedder = shinseina_embed::get_default_embedder(&settings.embedding, &config.resolve(&settings.embedding.model_dir))
            .context("loading embedder")?;
        Ok(Self::new(Box::new(catalog), index, embedder, settings.search)?)
    }

    pub fn parse(&self, text: &str) -> Result<ParsedQuery> { self.parser.parse(text, self.search.default_limit) }

    pub fn query(&self, text: &str) -> Result<Vec<RankedItem>> { self.query_with_limit(text, self.search.default_limit) }

    /// `default_limit` applies when the text names no limit; `0` means unlimited.
    pub fn query_with_limit(&self, text: &str, default_limit: usize) -> Result<Vec<RankedItem>> {
        let parsed = self.parser.parse(text, default_limit)?;
        Ok(self.execute(&parsed))
    }

    pub fn explain(&self, text: &str) -> Result<QueryReport> {
        let parsed = self.parse(text)?;
        let mut diagnostics = Vec::new();
        let results = self.run(&parsed, &mut diagnostics);
        Ok(QueryReport { parsed, results, diagnostics })
    }

    /// Run an already parsed query. Filters need not come from the parser,
    /// e.g. a `rank` filter built by the caller.
    pub fn execute(&self, parsed: &ParsedQuery) -> Vec<RankedItem> {
        self.run(parsed, &mut Vec::new())
    }

    fn run(&self, parsed: &ParsedQuery, diagnostics: &mut Vec<Diagnostic>) -> Vec<RankedItem> {
        let allowed = filters::resolve(self.store.as_ref(), &parsed.filters, diagnostics);
        if allowed.as_ref().is_some_and(|ids| ids.is_empty()) {
            debug!("filters {:?} match no items", parsed.filters);
            return Vec::new();
        }
        let searcher = SimilaritySearch { embedder: self.embedder.as_ref(), index: self.index.as_ref(), overfetch: self.search.overfetch };
        let fallback = [parsed.semantic.clone()];
        let fragments: &[String] = if parsed.fragments.is_empty() { &fallback } else { &parsed.fragments };
        let neighbours: Vec<_> = fragments
            .iter()
            .flat_map(|f| searcher.search(f, parsed.limit, allowed.as_ref(), diagnostics))
            .collect();
        let results = finalize(fuse(neighbours), parsed.limit, self.store.as_ref(), diagnostics);
        debug!("{} fragments -> {} results", fragments.len(), results.len());
        results
    }
}
