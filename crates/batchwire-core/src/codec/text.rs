use serde_json::Value as Json;
use tracing::warn;

use super::{type_mismatch, wire_kind};
use crate::{DecodingError, EncodingError, FeatureSpec, Value};

/// Over-long text is sent unchanged, with a warning.
pub(super) fn encode(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    let Value::Text(text) = value else {
        return Err(type_mismatch(spec, "text", value));
    };
    let limit = spec.shape().dims()[0];
    let chars = text.chars().count();
    if chars > limit {
        warn!(feature = spec.name(), chars, limit, "text longer than feature shape");
    }
    Ok(Json::String(text.clone()))
}

pub(super) fn decode(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    wire.as_str()
        .map(|s| Value::Text(s.to_string()))
        .ok_or_else(|| DecodingError::UnexpectedWireType {
            feature: spec.name().to_string(),
            expected: "string",
            actual: wire_kind(wire),
        })
}
