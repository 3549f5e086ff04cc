use serde::Deserialize;

/// Blob relay backend selection.
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    /// `"telegram"` keeps copies in the log channel; `"memory"` keeps them
    /// in process, which only suits local testing.
    #[serde(default = "default_relay_backend")]
    pub backend: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend: default_relay_backend(),
        }
    }
}

fn default_relay_backend() -> String {
    "telegram".to_owned()
}
