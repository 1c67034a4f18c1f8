//! Campaign configuration models.
//!
//! Everything is loaded through [`AppConfig::load`]: defaults, then an optional
//! TOML file, then `CAMPAIGN_*` environment overrides.

pub mod models;

pub use models::{
    AppConfig, DispatchConfig, LogLevel, ObservabilityConfig, OutputFormat, PacingConfig,
    SessionConfig,
};
