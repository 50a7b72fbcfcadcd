//! Storage modules: config, presets

pub mod config;
pub mod presets;
