//! Parameter tree flattening into engine settings.

use tracing::trace;

use pipectl_config::{ParamValue, Parameter};
use pipectl_engine::EngineData;

/// Copy a parameter tree into an engine settings object.
///
/// Scalars are set under their name. An array value becomes a nested
/// settings object holding the array's own entries, attached under the
/// entry's name as a one-element array. Values of any other type are skipped.
pub fn flatten(target: &mut EngineData, params: &[Parameter]) {
    for param in params {
        match &param.value {
            ParamValue::String(value) => target.set_string(&param.name, value.as_str()),
            ParamValue::Integer(value) => target.set_int(&param.name, *value),
            ParamValue::Bool(value) => target.set_bool(&param.name, *value),
            ParamValue::Array(entries) => {
                let mut nested = EngineData::new();
                flatten(&mut nested, entries);
                target.set_array(&param.name, vec![nested]);
            }
            ParamValue::Other(value) => {
                trace!(name = %param.name, %value, "Ignoring parameter of unsupported type");
            }
        }
    }
}

/// Flatten a parameter tree into a fresh settings object.
pub fn to_engine_data(params: &[Parameter]) -> EngineData {
    let mut data = EngineData::new();
    flatten(&mut data, params);
    data
}
