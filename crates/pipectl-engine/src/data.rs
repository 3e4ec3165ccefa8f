//! Native settings objects handed to the engine.

use serde::{Deserialize, Serialize};

/// A value stored in an [`EngineData`] object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    String(String),
    Int(i64),
    Bool(bool),
    Array(Vec<EngineData>),
}

/// An ordered settings object, the engine's native settings representation.
///
/// Setting a name that already exists replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineData {
    entries: Vec<(String, DataValue)>,
}

impl EngineData {
    /// Create an empty settings object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, DataValue::String(value.into()));
    }

    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, DataValue::Int(value));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, DataValue::Bool(value));
    }

    pub fn set_array(&mut self, name: &str, value: Vec<EngineData>) {
        self.set(name, DataValue::Array(value));
    }

    /// Set a value, replacing any existing entry with the same name.
    pub fn set(&mut self, name: &str, value: DataValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(DataValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(DataValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(DataValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_array(&self, name: &str) -> Option<&[EngineData]> {
        match self.get(name) {
            Some(DataValue::Array(value)) => Some(value),
            _ => None,
        }
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut data = EngineData::new();
        data.set_string("server", "rtmp://localhost/live");
        data.set_int("bitrate", 2500);
        data.set_bool("cbr", true);

        assert_eq!(data.get_string("server"), Some("rtmp://localhost/live"));
        assert_eq!(data.get_int("bitrate"), Some(2500));
        assert_eq!(data.get_bool("cbr"), Some(true));
        assert_eq!(data.get_int("server"), None);
        assert_eq!(data.get("missing"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut data = EngineData::new();
        data.set_int("a", 1);
        data.set_int("b", 2);
        data.set_string("a", "one");

        let names: Vec<_> = data.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(data.get_string("a"), Some("one"));
        assert_eq!(data.len(), 2);
    }
}
