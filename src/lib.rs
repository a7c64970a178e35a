// batpack - batch launcher to launch profile converter and package builder
//
// This is the library crate containing the conversion and packaging logic.
// The binary crate (main.rs) provides the command line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod summary;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{PackSettings, TranslatedConfig, TranslatorOptions};
pub use services::ScriptTranslator;
pub use summary::RunSummary;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
