//! Categorical block: one-hot indicators against the fit-time vocabulary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sorted category vocabulary observed for one field at fit time.
///
/// Missing values are fit as the reserved unknown category, so the unknown
/// indicator exists only when the training data had gaps in this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub categories: Vec<String>,
}

impl CategoryVocabulary {
    pub fn fit(values: &[Option<String>], unknown: &str) -> Self {
        let categories: BTreeSet<&str> = values
            .iter()
            .map(|v| v.as_deref().unwrap_or(unknown))
            .collect();
        Self {
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Number of indicator columns this field contributes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Position of a category in the indicator block.
    #[must_use]
    pub fn position(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    /// Writes the indicator block for one value into `out`.
    ///
    /// Returns `false` when the value was not seen at fit time; the block is
    /// then left all-zero.
    pub fn encode_into(&self, value: Option<&str>, unknown: &str, out: &mut Vec<f64>) -> bool {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        match self.position(value.unwrap_or(unknown)) {
            Some(pos) => {
                out[start + pos] = 1.0;
                true
            }
            None => false,
        }
    }
}
