pub mod error;
pub mod memory;
pub mod relay;
pub mod types;

pub use error::RelayError;
pub use memory::{Delivery, MEMORY_RELAY_CHAT, MemoryRelay};
pub use relay::BlobRelay;
pub use types::ContentSource;
