//! Settings store for the TrueHDR converter
//!
//! Handles loading the settings document (TOML or JSON), clamping bad values,
//! environment variable overrides and saving.

pub mod settings;

pub use settings::*;
