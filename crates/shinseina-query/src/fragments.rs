use regex::Regex;

use shinseina_core::error::{Error, Result};

pub const CLAUSE_WORDS: &[&str] = &["when", "if", "that", "which", "who", "and", "but", "or", "because", "so"];

const BOUNDARY: char = '\u{1e}';

/// Splits a semantic query into clause-sized fragments.
pub struct FragmentDecomposer { clause: Regex }

impl FragmentDecomposer {
    pub fn new() -> Result<Self> {
        let pattern = format!(r"\b({})\b", CLAUSE_WORDS.join("|"));
        let clause = Regex::new(&pattern).map_err(|e| Error::InvalidConfig(format!("bad clause pattern: {e}")))?;
        Ok(Self { clause })
    }

    /// Never returns an empty list: with no usable pieces the whole text is
    /// the only fragment.
    pub fn split(&self, semantic: &str) -> Vec<String> {
        let lowered = semantic.to_lowercase();
        let marked = self.clause.replace_all(&lowered, format!("{BOUNDARY}$1").as_str());
        let fragments: Vec<String> = marked
            .split(|c| c == BOUNDARY || c == ',' || c == '.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if fragments.is_empty() { vec![semantic.to_string()] } else { fragments }
    }
}
