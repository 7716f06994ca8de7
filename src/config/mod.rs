#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod sources;

#[cfg(feature = "cli")]
pub use cli::Cli;
pub use env::{DatabaseSettings, StorageSettings};
pub use sources::SourceLayout;
