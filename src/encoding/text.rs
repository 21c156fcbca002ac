//! Text block: TF-IDF weights over a frozen top-N vocabulary.
//!
//! Tokens are lowercase words of two or more characters. The vocabulary
//! keeps the `max_features` terms with the highest corpus frequency (ties
//! broken alphabetically) and orders columns alphabetically. IDF uses the
//! smoothed form `ln((1 + n) / (1 + df)) + 1`; each row is L2-normalized.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Splits a document into lowercase tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fitted vocabulary and inverse document frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVocabulary {
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
}

impl TfidfVocabulary {
    /// Fits the vocabulary over the corpus. Missing documents count as empty.
    pub fn fit(documents: &[Option<String>], max_features: usize) -> Self {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| doc.as_deref().map(tokenize).unwrap_or_default())
            .collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                *corpus_counts.entry(token.as_str()).or_default() += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        // BTreeMap iteration is alphabetical and the sort is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        terms.sort();

        let n = tokenized.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = tokenized
                    .iter()
                    .filter(|tokens| tokens.iter().any(|t| t == term))
                    .count() as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        Self { terms, idf }
    }

    /// Number of TF-IDF columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.terms.len()
    }

    /// Appends the normalized TF-IDF row for one document to `out`.
    pub fn encode_into(&self, document: Option<&str>, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);

        let Some(document) = document else {
            return;
        };

        let index: HashMap<&str, usize> = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        for token in tokenize(document) {
            if let Some(&i) = index.get(token.as_str()) {
                out[start + i] += 1.0;
            }
        }

        let row = &mut out[start..];
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<Option<String>> {
        items.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_single_chars() {
        assert_eq!(
            tokenize("Rust, SQL; a Go-lang"),
            vec!["rust", "sql", "go", "lang"]
        );
    }

    #[test]
    fn test_vocabulary_keeps_most_frequent_terms() {
        let corpus = docs(&["rust sql", "rust python", "rust sql docker", "java"]);
        let vocab = TfidfVocabulary::fit(&corpus, 2);
        // rust (3) and sql (2) survive; python/docker/java (1) are cut
        assert_eq!(vocab.terms, vec!["rust", "sql"]);
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let corpus = docs(&["zeta alpha", "beta"]);
        let vocab = TfidfVocabulary::fit(&corpus, 2);
        assert_eq!(vocab.terms, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_smoothed_idf() {
        let corpus = docs(&["rust", "rust sql"]);
        let vocab = TfidfVocabulary::fit(&corpus, 10);
        let rust = vocab.terms.iter().position(|t| t == "rust").unwrap();
        let sql = vocab.terms.iter().position(|t| t == "sql").unwrap();
        assert!((vocab.idf[rust] - 1.0).abs() < 1e-12);
        assert!((vocab.idf[sql] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_unit_length_or_zero() {
        let corpus = docs(&["rust sql", "python"]);
        let vocab = TfidfVocabulary::fit(&corpus, 10);

        let mut row = Vec::new();
        vocab.encode_into(Some("rust rust sql"), &mut row);
        let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);

        let mut row = Vec::new();
        vocab.encode_into(Some("cobol"), &mut row);
        assert!(row.iter().all(|v| *v == 0.0));

        let mut row = Vec::new();
        vocab.encode_into(None, &mut row);
        assert_eq!(row.len(), vocab.width());
    }
}
