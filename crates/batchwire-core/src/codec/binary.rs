use bytes::Bytes;
use serde_json::Value as Json;

use super::{data_url, type_mismatch, wire_kind};
use crate::{Blob, DecodingError, EncodingError, FeatureSpec, Value};

pub(super) fn encode(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    let Value::Binary(blob) = value else {
        return Err(type_mismatch(spec, "binary", value));
    };
    Ok(Json::String(data_url::encode(&blob.media_type, &blob.data)))
}

pub(super) fn decode(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    let url = wire.as_str().ok_or_else(|| DecodingError::UnexpectedWireType {
        feature: spec.name().to_string(),
        expected: "data URL string",
        actual: wire_kind(wire),
    })?;
    let (media_type, data) = data_url::decode(spec.name(), url)?;
    Ok(Value::Binary(Blob {
        media_type,
        data: Bytes::from(data),
    }))
}
