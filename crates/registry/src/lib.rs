//! File-record lifecycle management.
//!
//! [`FileRegistry`] mints records and tokens for uploaded content, resolves
//! tokens back to records and serves administrative deletes. [`Sweeper`]
//! evicts expired records from both the blob relay and the metadata store.
//!
//! The two stores share no transaction. Writes go to the relay first and the
//! metadata store second. Deletes also remove the relay copy first and the
//! record second, because the record is the only key to the locator. A crash
//! can only ever leave a relay copy without metadata, never metadata pointing
//! at nothing.

pub mod builder;
pub mod error;
mod eviction;
pub mod registry;
pub mod sweeper;

#[cfg(test)]
mod testing;

pub use builder::FileRegistryBuilder;
pub use error::RegistryError;
pub use registry::{DEFAULT_SEARCH_CAP, FileRegistry, UploadRequest};
pub use sweeper::{SweepReport, Sweeper, SweeperConfig, SweeperState};
