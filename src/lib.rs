pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::storage::{LocalStorage, S3Storage};
pub use adapters::warehouse::PostgresWarehouse;
pub use app::stages::{CleanStage, IngestStage, LoadStage};
pub use config::{DatabaseSettings, SourceLayout, StorageSettings};
pub use core::{cleaning::CleaningEngine, etl::EtlEngine};
pub use domain::keys::RunTimestamp;
pub use domain::schema::{SchemaRegistry, Table};
pub use utils::error::{EtlError, Result};
