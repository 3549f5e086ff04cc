use serde::Deserialize;

/// Search result limits.
#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    /// Maximum results returned by `/search`.
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}
