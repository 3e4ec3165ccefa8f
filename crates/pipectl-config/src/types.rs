//! Pipeline document types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The root pipeline document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Canvas and render backend settings.
    pub settings: Settings,

    /// Encoder pipelines, in document order.
    pub encoders: Vec<EncoderSpec>,

    /// Scene sources, in document order.
    pub sources: Vec<SourceSpec>,
}

/// Render backend and canvas settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics module the engine renders with (e.g., "libobs-opengl").
    pub graphics: String,

    /// Canvas width in pixels.
    pub width: u32,

    /// Canvas height in pixels.
    pub height: u32,
}

/// One encoder pipeline: a video/audio encoder pair feeding its outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSpec {
    /// Scaled video width in pixels.
    pub width: u32,

    /// Scaled video height in pixels.
    pub height: u32,

    /// Audio bitrate in kbps. No audio encoder is created when this is not positive.
    pub audio_bitrate: i64,

    /// Video bitrate in kbps. No video encoder is created when this is not positive.
    pub video_bitrate: i64,

    /// x264 preset.
    pub preset: String,

    /// H.264 profile.
    pub profile: String,

    /// Outputs fed by this encoder, in document order.
    pub outputs: Vec<OutputSpec>,
}

impl EncoderSpec {
    /// Returns true if a video encoder should be created.
    pub fn has_video(&self) -> bool {
        self.video_bitrate > 0
    }

    /// Returns true if an audio encoder should be created.
    pub fn has_audio(&self) -> bool {
        self.audio_bitrate > 0
    }
}

/// A sink fed by an encoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
    /// Output kind identifier (e.g., "rtmp_output").
    #[serde(rename = "type")]
    pub kind: String,

    /// Streaming server address.
    pub server: String,

    /// Stream key.
    pub key: String,
}

/// A scene source and its placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    /// Source kind identifier (e.g., "image_source").
    #[serde(rename = "type")]
    pub kind: String,

    /// Scale mode name, see [`ScaleMode::from_name`].
    pub scale: String,

    pub pos_x: i64,
    pub pos_y: i64,
    pub width: i64,
    pub height: i64,

    /// Volume in percent (0 - 100).
    pub volume: i64,

    /// Source settings handed to the engine.
    pub parameters: Vec<Parameter>,
}

impl SourceSpec {
    /// Scale mode for this source's scene item.
    pub fn scale_mode(&self) -> ScaleMode {
        ScaleMode::from_name(&self.scale)
    }

    /// Volume as the fraction the engine expects (0.0 - 1.0).
    pub fn volume_fraction(&self) -> f32 {
        self.volume as f32 / 100.0
    }

    /// Returns true if the document overrides the item's bounds.
    pub fn has_bounds(&self) -> bool {
        self.width > 0 || self.height > 0
    }

    /// Returns true if the document overrides the item's position.
    pub fn has_position(&self) -> bool {
        self.pos_x > 0 || self.pos_y > 0
    }
}

/// How a scene item is fitted into its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Scale to fit inside the bounds, keeping aspect ratio.
    Inner,

    /// Stretch to fill the bounds.
    Stretch,

    /// No bounds constraint.
    None,
}

impl ScaleMode {
    /// Map a document scale name to a mode. Unknown names, including the
    /// empty string, mean no bounds constraint.
    pub fn from_name(name: &str) -> Self {
        match name {
            "inner" => Self::Inner,
            "stretch" => Self::Stretch,
            _ => Self::None,
        }
    }
}

/// A named entry of a source's parameter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(default)]
    pub value: ParamValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Decode an `{ "name": ..., "value": ... }` entry. Entries without a
    /// string name are not parameters.
    fn from_entry(entry: Value) -> Option<Self> {
        let Value::Object(mut map) = entry else {
            return None;
        };
        let Some(Value::String(name)) = map.remove("name") else {
            return None;
        };
        let value = map.remove("value").map(ParamValue::from).unwrap_or_default();
        Some(Self { name, value })
    }
}

/// Value of a parameter tree entry.
///
/// Arrays hold further parameter entries and may nest to any depth. Values
/// of any other JSON type, including arrays that are not all entries, land
/// in [`ParamValue::Other`] and are not passed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "Value")]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Bool(bool),
    Array(Vec<Parameter>),
    Other(Value),
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Other(Value::Number(n)),
            },
            Value::Array(items) if items.iter().all(is_entry) => {
                Self::Array(items.into_iter().filter_map(Parameter::from_entry).collect())
            }
            other => Self::Other(other),
        }
    }
}

fn is_entry(item: &Value) -> bool {
    item.get("name").is_some_and(Value::is_string)
}

impl Default for ParamValue {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_mode_mapping() {
        assert_eq!(ScaleMode::from_name("inner"), ScaleMode::Inner);
        assert_eq!(ScaleMode::from_name("stretch"), ScaleMode::Stretch);
        assert_eq!(ScaleMode::from_name("none"), ScaleMode::None);
        assert_eq!(ScaleMode::from_name(""), ScaleMode::None);
        assert_eq!(ScaleMode::from_name("Inner"), ScaleMode::None);
    }

    #[test]
    fn test_volume_fraction() {
        let source = SourceSpec {
            volume: 50,
            ..Default::default()
        };
        assert_eq!(source.volume_fraction(), 0.5);

        let muted = SourceSpec::default();
        assert_eq!(muted.volume_fraction(), 0.0);
    }

    #[test]
    fn test_geometry_overrides() {
        let source = SourceSpec::default();
        assert!(!source.has_bounds());
        assert!(!source.has_position());

        let source = SourceSpec {
            width: 640,
            pos_y: 10,
            ..Default::default()
        };
        assert!(source.has_bounds());
        assert!(source.has_position());
    }

    #[test]
    fn test_param_value_types() {
        let params: Vec<Parameter> = serde_json::from_str(
            r#"[
                {"name": "file", "value": "/tmp/a.png"},
                {"name": "loop", "value": true},
                {"name": "speed", "value": 100},
                {"name": "ratio", "value": 0.5},
                {"name": "missing"},
                {"name": "list", "value": [{"name": "inner", "value": 1}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(params[0].value, ParamValue::String("/tmp/a.png".into()));
        assert_eq!(params[1].value, ParamValue::Bool(true));
        assert_eq!(params[2].value, ParamValue::Integer(100));
        assert!(matches!(params[3].value, ParamValue::Other(_)));
        assert_eq!(params[4].value, ParamValue::Other(serde_json::Value::Null));
        assert_eq!(
            params[5].value,
            ParamValue::Array(vec![Parameter::new("inner", ParamValue::Integer(1))])
        );
    }

    #[test]
    fn test_array_of_non_entries_is_other() {
        let params: Vec<Parameter> = serde_json::from_str(
            r#"[
                {"name": "numbers", "value": [1, 2, 3]},
                {"name": "mixed", "value": [{"name": "ok", "value": 1}, {"value": 2}]},
                {"name": "empty", "value": []},
                {"name": "huge", "value": 18446744073709551615}
            ]"#,
        )
        .unwrap();

        assert!(matches!(params[0].value, ParamValue::Other(Value::Array(_))));
        assert!(matches!(params[1].value, ParamValue::Other(Value::Array(_))));
        assert_eq!(params[2].value, ParamValue::Array(vec![]));
        assert!(matches!(params[3].value, ParamValue::Other(Value::Number(_))));
    }

    #[test]
    fn test_encoder_bitrate_gates() {
        let encoder = EncoderSpec {
            video_bitrate: 2000,
            audio_bitrate: 0,
            ..Default::default()
        };
        assert!(encoder.has_video());
        assert!(!encoder.has_audio());
    }
}
