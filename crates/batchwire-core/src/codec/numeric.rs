use serde_json::{Number, Value as Json};

use super::{data_url, npy, type_mismatch, wire_kind};
use crate::{DecodingError, EncodingError, FeatureSpec, Value};

pub(super) fn encode(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    if spec.is_scalar() {
        let Value::Number(n) = value else {
            return Err(type_mismatch(spec, "number", value));
        };
        let number = Number::from_f64(*n).ok_or_else(|| EncodingError::NonFinite {
            feature: spec.name().to_string(),
        })?;
        return Ok(Json::Number(number));
    }

    let Value::Tensor(tensor) = value else {
        return Err(type_mismatch(spec, "tensor", value));
    };
    if tensor.shape() != spec.shape() {
        return Err(EncodingError::ShapeMismatch {
            feature: spec.name().to_string(),
            expected: spec.shape().clone(),
            actual: tensor.shape().clone(),
        });
    }
    Ok(Json::String(data_url::encode(
        npy::MEDIA_TYPE,
        &npy::write(tensor),
    )))
}

pub(super) fn decode(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    if spec.is_scalar() {
        return wire
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| DecodingError::UnexpectedWireType {
                feature: spec.name().to_string(),
                expected: "number",
                actual: wire_kind(wire),
            });
    }

    let url = wire.as_str().ok_or_else(|| DecodingError::UnexpectedWireType {
        feature: spec.name().to_string(),
        expected: "data URL string",
        actual: wire_kind(wire),
    })?;
    let (_, data) = data_url::decode_expecting(spec.name(), url, &[npy::MEDIA_TYPE])?;
    let tensor = npy::read(&data).map_err(|reason| DecodingError::Npy {
        feature: spec.name().to_string(),
        reason,
    })?;
    if tensor.shape() != spec.shape() {
        return Err(DecodingError::ShapeMismatch {
            feature: spec.name().to_string(),
            expected: spec.shape().clone(),
            actual: tensor.shape().clone(),
        });
    }
    Ok(Value::Tensor(tensor))
}
