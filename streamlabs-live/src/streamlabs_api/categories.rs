//! Game category search types.

use serde::{Deserialize, Serialize};

/// Longest category query the relay accepts; longer queries make it answer with a 500.
pub const MAX_QUERY_CHARS: usize = 25;

/// Raw response of `GET /info?category=<query>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategorySearchResponse {
    pub categories: Vec<CategorySuggestion>,
}

/// A game category that a stream can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategorySuggestion {
    /// Display name, e.g. `"Minecraft"`.
    pub full_name: String,
    /// Identifier passed as `category` when starting a stream.
    pub game_mask_id: String,
}

impl CategorySuggestion {
    /// The `"Other"` entry that search always offers, whatever the relay returned.
    pub fn fallback() -> Self {
        Self {
            full_name: "Other".to_string(),
            game_mask_id: String::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.full_name == "Other" && self.game_mask_id.is_empty()
    }
}

/// Cuts `query` down to at most [`MAX_QUERY_CHARS`] characters.
pub(crate) fn truncate_query(query: &str) -> &str {
    match query.char_indices().nth(MAX_QUERY_CHARS) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_query() {
        assert_eq!(truncate_query("minecraft"), "minecraft");
        assert_eq!(truncate_query(&"a".repeat(25)), "a".repeat(25));
        assert_eq!(truncate_query(&"a".repeat(26)), "a".repeat(25));
        assert_eq!(truncate_query(""), "");
    }

    #[test]
    fn test_truncate_query_counts_characters() {
        let query = "ポケモン".repeat(10);
        let truncated = truncate_query(&query);
        assert_eq!(truncated.chars().count(), MAX_QUERY_CHARS);
        assert!(query.starts_with(truncated));
    }

    #[test]
    fn test_fallback() {
        let other = CategorySuggestion::fallback();
        assert!(other.is_fallback());
        assert_eq!(other.full_name, "Other");
        assert_eq!(other.game_mask_id, "");
    }
}
