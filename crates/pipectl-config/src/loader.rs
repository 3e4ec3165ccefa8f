//! Loading and validating pipeline documents.
//!
//! Validation happens in two passes. The raw JSON tree is checked first for
//! the presence and type of each top-level section (and of every encoder's
//! `outputs`), so a structurally broken document is reported by section name.
//! Each section is then decoded into its typed form.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::error::ConfigError;
use crate::types::{Configuration, SourceSpec};
use crate::{
    ConfigResult, ENCODERS_SECTION, MAX_VOLUME_PERCENT, SETTINGS_SECTION, SOURCES_SECTION,
};

/// Expected JSON type of a section.
#[derive(Debug, Clone, Copy)]
enum SectionKind {
    Object,
    Array,
}

impl SectionKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Load and validate a pipeline document from disk.
#[instrument(name = "load_config", skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> ConfigResult<Configuration> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse(&text)?;

    info!(
        encoders = config.encoders.len(),
        sources = config.sources.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse and validate a pipeline document held in memory.
///
/// Parameter trees may nest arbitrarily deep, so the JSON depth limit is
/// lifted and the stack grows on demand instead.
pub fn parse(text: &str) -> ConfigResult<Configuration> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();

    let document = Value::deserialize(serde_stacker::Deserializer::new(&mut de))
        .map_err(syntax_error)?;
    de.end().map_err(syntax_error)?;

    validate(document)
}

fn syntax_error(e: serde_json::Error) -> ConfigError {
    ConfigError::Parse {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    }
}

/// Validate an already-parsed document tree and decode it.
pub fn validate(document: Value) -> ConfigResult<Configuration> {
    let Value::Object(mut root) = document else {
        return Err(ConfigError::invalid_section("document", "object"));
    };

    let settings = take_section(&mut root, SETTINGS_SECTION, SectionKind::Object)?;
    let encoders = take_section(&mut root, ENCODERS_SECTION, SectionKind::Array)?;
    let sources = take_section(&mut root, SOURCES_SECTION, SectionKind::Array)?;

    check_outputs(&encoders)?;

    let config = Configuration {
        settings: decode(SETTINGS_SECTION, settings)?,
        encoders: decode(ENCODERS_SECTION, encoders)?,
        sources: decode(SOURCES_SECTION, sources)?,
    };

    check_volumes(&config.sources)?;

    debug!(
        graphics = %config.settings.graphics,
        width = config.settings.width,
        height = config.settings.height,
        "Configuration validated"
    );
    Ok(config)
}

fn take_section(
    root: &mut Map<String, Value>,
    name: &str,
    kind: SectionKind,
) -> ConfigResult<Value> {
    let value = root
        .remove(name)
        .ok_or_else(|| ConfigError::MissingSection(name.to_string()))?;

    if !kind.matches(&value) {
        return Err(ConfigError::invalid_section(name, kind.name()));
    }

    Ok(value)
}

/// Every encoder must carry an `outputs` array, even an empty one.
fn check_outputs(encoders: &Value) -> ConfigResult<()> {
    let Some(encoders) = encoders.as_array() else {
        return Ok(());
    };

    for (index, encoder) in encoders.iter().enumerate() {
        let section = format!("{ENCODERS_SECTION}[{index}].outputs");
        match encoder.get("outputs") {
            Some(outputs) if outputs.is_array() => {}
            Some(_) => return Err(ConfigError::invalid_section(section, "array")),
            None => return Err(ConfigError::MissingSection(section)),
        }
    }

    Ok(())
}

fn check_volumes(sources: &[SourceSpec]) -> ConfigResult<()> {
    for (index, source) in sources.iter().enumerate() {
        if !(0..=MAX_VOLUME_PERCENT).contains(&source.volume) {
            return Err(ConfigError::invalid_value(
                format!("{SOURCES_SECTION}[{index}].volume"),
                format!("{} is outside 0..={MAX_VOLUME_PERCENT}", source.volume),
            ));
        }
    }

    Ok(())
}

fn decode<T: DeserializeOwned>(section: &str, value: Value) -> ConfigResult<T> {
    T::deserialize(serde_stacker::Deserializer::new(value)).map_err(|e| ConfigError::Field {
        section: section.to_string(),
        message: e.to_string(),
    })
}
