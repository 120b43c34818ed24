//! Trainwatch configuration module
//! Handles loading and saving the config file

#[allow(clippy::module_inception)]
pub mod config;

pub use config::{Config, MonitorConfig, SourceConfig, CONFIG_ENV};
