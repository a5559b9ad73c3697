//! Conversion between typed [`Value`]s and their JSON wire form.
//!
//! Every function here is pure: no I/O, no shared state. One encoder/decoder
//! pair exists per [`FeatureType`], selected by matching on the spec's dtype.

mod binary;
mod categorical;
mod data_url;
mod npy;
mod numeric;
mod raster;
mod text;

use serde_json::Value as Json;

use crate::{
    DecodingError, EncodedItem, EncodingError, FeatureSpec, FeatureSpecSet, FeatureType, Record,
    Value,
};

pub use npy::MEDIA_TYPE as NPY_MEDIA_TYPE;

/// Validates `value` against `spec` and produces its wire form.
pub fn encode_feature(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    match spec.dtype() {
        FeatureType::Numeric => numeric::encode(value, spec),
        FeatureType::Image => raster::encode(value, spec),
        FeatureType::Categorical => categorical::encode(value, spec),
        FeatureType::Text => text::encode(value, spec),
        FeatureType::Binary => binary::encode(value, spec),
    }
}

/// Parses a server-returned wire value and checks it against `spec`.
pub fn decode_feature(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    match spec.dtype() {
        FeatureType::Numeric => numeric::decode(wire, spec),
        FeatureType::Image => raster::decode(wire, spec),
        FeatureType::Categorical => categorical::decode(wire, spec),
        FeatureType::Text => text::decode(wire, spec),
        FeatureType::Binary => binary::decode(wire, spec),
    }
}

/// Encodes every feature of `specs`. Record entries the set does not declare
/// are ignored.
pub fn encode_record(record: &Record, specs: &FeatureSpecSet) -> Result<EncodedItem, EncodingError> {
    let mut row = EncodedItem::default();
    for spec in specs {
        let value = record
            .get(spec.name())
            .ok_or_else(|| EncodingError::MissingFeature {
                feature: spec.name().to_string(),
            })?;
        row.insert(spec.name(), encode_feature(value, spec)?);
    }
    Ok(row)
}

pub fn decode_record(row: &EncodedItem, specs: &FeatureSpecSet) -> Result<Record, DecodingError> {
    let mut record = Record::new();
    for spec in specs {
        let wire = row
            .get(spec.name())
            .ok_or_else(|| DecodingError::MissingFeature {
                feature: spec.name().to_string(),
            })?;
        record.insert(spec.name(), decode_feature(wire, spec)?);
    }
    Ok(record)
}

pub(crate) fn type_mismatch(spec: &FeatureSpec, expected: &'static str, value: &Value) -> EncodingError {
    EncodingError::TypeMismatch {
        feature: spec.name().to_string(),
        expected,
        actual: value.kind(),
    }
}

pub(crate) fn wire_kind(wire: &Json) -> &'static str {
    match wire {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
