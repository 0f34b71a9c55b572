//! Core types and configuration for fnforge.
//!
//! This crate defines the `fnforge.toml` schema ([`FnforgeConfig`]), the
//! stack manifest model ([`Stack`]), build-argument resolution
//! ([`BuildArgMap`]), language templates and their build options
//! ([`TemplateStore`]), and shared error types.

pub mod args;
pub mod config;
pub mod error;
pub mod stack;
pub mod template;

pub use args::{BuildArgMap, parse_map};
pub use config::{BuildDefaults, BuildSettings, FnforgeConfig, TemplatesConfig};
pub use error::{Error, Result};
pub use stack::{FunctionSpec, Provider, Stack};
pub use template::{
    BuildOption, LanguageTemplate, OptionResolution, TemplateStore, find_build_options,
    validate_language,
};
