use std::time::Duration;

/// Configuration for the Redis metadata store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key to avoid collisions.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,

    /// How many index entries to fetch per round trip when streaming.
    pub page_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("ferry"),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            page_size: 100,
        }
    }
}
