//! Section names and typed accessors over raw JSON profile data.

use outreach_core::data_object::JsonMap;
use serde_json::Value;

use crate::error::PipelineError;

pub const BASIC_INFO: &str = "basic_info";
pub const CONTENT: &str = "content";
pub const ENGAGEMENT: &str = "engagement";
pub const NETWORK: &str = "network";
pub const ENRICHED: &str = "enriched";

/// Borrow an object section. Missing is `Ok(None)`; any other shape is an error.
pub(crate) fn object<'a>(
    data: &'a JsonMap,
    section: &'static str,
) -> Result<Option<&'a JsonMap>, PipelineError> {
    match data.get(section) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(PipelineError::malformed(section, "an object")),
    }
}

/// Borrow an array section. Missing is `Ok(None)`; any other shape is an error.
pub(crate) fn array<'a>(
    data: &'a JsonMap,
    section: &'static str,
) -> Result<Option<&'a Vec<Value>>, PipelineError> {
    match data.get(section) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(PipelineError::malformed(section, "an array")),
    }
}

/// Numeric field as `f64`, zero when missing or non-numeric.
pub(crate) fn num(map: &JsonMap, key: &str) -> f64 {
    map.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Numeric field nested one object deep, e.g. `engagement.likes` of an item.
pub(crate) fn nested_num(map: &JsonMap, outer: &str, key: &str) -> f64 {
    map.get(outer)
        .and_then(Value::as_object)
        .map(|inner| num(inner, key))
        .unwrap_or(0.0)
}
