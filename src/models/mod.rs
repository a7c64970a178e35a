//! Data models for batpack.
//!
//! - [`TranslatedConfig`]: a launch profile produced from one batch script
//! - [`PackSettings`]: run settings loaded from `batpack.yaml` and the environment
//! - [`TranslatorOptions`]: naming policy, quote handling and target version for the translator

pub mod config;
pub mod launch_profile;

pub use config::{NamingPolicy, PackSettings, QuoteStripping, TranslatorOptions};
pub use launch_profile::{
    DEFAULT_TARGET_VERSION, EmptyStartupCommand, GAME_FILTER_VARIABLE, LaunchParams, SCHEMA_TAG,
    TARGET_APP_ID, TargetDescriptor, TranslatedConfig,
};
