use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as Json};

use super::{type_mismatch, wire_kind};
use crate::{Categorical, DecodingError, EncodingError, FeatureSpec, Value};

fn in_vocabulary(spec: &FeatureSpec, category: &str) -> bool {
    spec.vocabulary()
        .map_or(true, |v| v.iter().any(|c| c == category))
}

pub(super) fn encode(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    let Value::Categorical(categorical) = value else {
        return Err(type_mismatch(spec, "categorical", value));
    };
    let feature = || spec.name().to_string();

    match categorical {
        Categorical::Label(label) => {
            if !in_vocabulary(spec, label) {
                return Err(EncodingError::OutsideVocabulary {
                    feature: feature(),
                    category: label.clone(),
                });
            }
            Ok(Json::String(label.clone()))
        }
        Categorical::Scores(scores) => {
            let expected = spec.shape().dims()[0];
            if scores.len() != expected {
                return Err(EncodingError::CategoryCount {
                    feature: feature(),
                    expected,
                    actual: scores.len(),
                });
            }
            let mut out = Map::with_capacity(scores.len());
            for (category, score) in scores {
                if !in_vocabulary(spec, category) {
                    return Err(EncodingError::OutsideVocabulary {
                        feature: feature(),
                        category: category.clone(),
                    });
                }
                let number =
                    Number::from_f64(*score).ok_or_else(|| EncodingError::NonFinite {
                        feature: feature(),
                    })?;
                out.insert(category.clone(), Json::Number(number));
            }
            Ok(Json::Object(out))
        }
    }
}

pub(super) fn decode(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    let feature = || spec.name().to_string();
    let outside = |category: &str| DecodingError::OutsideVocabulary {
        feature: feature(),
        category: category.to_string(),
    };

    match wire {
        Json::String(label) => {
            if !in_vocabulary(spec, label) {
                return Err(outside(label));
            }
            Ok(Value::Categorical(Categorical::Label(label.clone())))
        }
        Json::Object(map) => {
            let expected = spec.shape().dims()[0];
            if map.len() != expected {
                return Err(DecodingError::CategoryCount {
                    feature: feature(),
                    expected,
                    actual: map.len(),
                });
            }
            let mut scores = BTreeMap::new();
            for (category, score) in map {
                if !in_vocabulary(spec, category) {
                    return Err(outside(category));
                }
                let score = score
                    .as_f64()
                    .ok_or_else(|| DecodingError::UnexpectedWireType {
                        feature: feature(),
                        expected: "number",
                        actual: wire_kind(score),
                    })?;
                scores.insert(category.clone(), score);
            }
            Ok(Value::Categorical(Categorical::Scores(scores)))
        }
        other => Err(DecodingError::UnexpectedWireType {
            feature: feature(),
            expected: "string or object",
            actual: wire_kind(other),
        }),
    }
}
