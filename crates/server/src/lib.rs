pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod links;
pub mod relay_factory;
pub mod store_factory;
pub mod telemetry;
