//! Pipeline document model and loader for pipectl.
//!
//! A pipeline document describes the render canvas, the encoder/output
//! pipelines and the scene sources. This crate reads it from disk, checks
//! the shape of the top-level sections and hands back a typed
//! [`Configuration`] that stays immutable for the life of the process.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{load, parse, validate};
pub use types::{
    Configuration, EncoderSpec, OutputSpec, ParamValue, Parameter, ScaleMode, Settings,
    SourceSpec,
};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name of the render settings section.
pub const SETTINGS_SECTION: &str = "settings";

/// Name of the encoder pipelines section.
pub const ENCODERS_SECTION: &str = "encoders";

/// Name of the scene sources section.
pub const SOURCES_SECTION: &str = "sources";

/// Highest accepted source volume, in percent.
pub const MAX_VOLUME_PERCENT: i64 = 100;
