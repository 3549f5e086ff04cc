use serde::Deserialize;

/// Configuration for the metadata store backend.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL for the backend (e.g. `redis://localhost:6379`).
    pub url: Option<String>,

    /// Key prefix for backends that support it.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Records fetched per round trip when streaming scans.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            prefix: default_prefix(),
            pool_size: default_pool_size(),
            page_size: default_page_size(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_prefix() -> String {
    "ferry".to_owned()
}

fn default_pool_size() -> usize {
    10
}

fn default_page_size() -> usize {
    100
}
