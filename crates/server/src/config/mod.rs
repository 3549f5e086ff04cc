mod links;
mod logging;
mod relay;
mod retention;
mod search;
mod store;
mod sweeper;
mod telegram;


pub use links::*;
pub use logging::*;
pub use relay::*;
pub use retention::*;
pub use search::*;
pub use store::*;
pub use sweeper::*;
pub use telegram::*;

use serde::Deserialize;

/// Top-level configuration for the Ferry server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct FerryConfig {
    /// Metadata store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Blob relay backend selection.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Telegram bot configuration.
    #[serde(default)]
    pub telegram: TelegramServerConfig,
    /// How long records live.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Eviction sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperServerConfig,
    /// Search result limits.
    #[serde(default)]
    pub search: SearchConfig,
    /// Link shortening configuration.
    #[serde(default)]
    pub links: LinksConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}
