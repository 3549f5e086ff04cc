use std::sync::Arc;

use ferry_store::MetadataStore;
use ferry_store_memory::MemoryMetadataStore;
#[cfg(feature = "redis")]
use ferry_store_redis::{RedisConfig, RedisMetadataStore};

use crate::config::StoreConfig;
use crate::error::ServerError;

/// Create a metadata store from the given configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn MetadataStore>, ServerError> {
    let store: Arc<dyn MetadataStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryMetadataStore::new()),
        #[cfg(feature = "redis")]
        "redis" => {
            let url = config.url.clone().ok_or_else(|| {
                ServerError::Config("redis store backend requires [store] url".into())
            })?;

            let redis_config = RedisConfig {
                url,
                prefix: config.prefix.clone(),
                pool_size: config.pool_size,
                page_size: config.page_size,
                ..RedisConfig::default()
            };

            Arc::new(RedisMetadataStore::new(&redis_config)?)
        }
        other => {
            return Err(ServerError::Config(format!(
                "unsupported store backend: {other}"
            )));
        }
    };

    Ok(store)
}
