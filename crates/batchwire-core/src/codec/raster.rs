use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use serde_json::Value as Json;

use super::{data_url, type_mismatch, wire_kind};
use crate::{DecodingError, EncodingError, FeatureSpec, Image, PixelFormat, Shape, Value};

const PNG: &str = "image/png";
const ACCEPTED: &[&str] = &[PNG, "image/jpeg", "image/jpg"];

/// `(h, w)` specs describe single-channel images.
fn expected_shape(spec: &FeatureSpec) -> Shape {
    match spec.shape().dims() {
        [h, w] => Shape::from([*h, *w, 1]),
        _ => spec.shape().clone(),
    }
}

/// Images always travel as PNG so that pixels survive unchanged.
pub(super) fn encode(value: &Value, spec: &FeatureSpec) -> Result<Json, EncodingError> {
    let Value::Image(img) = value else {
        return Err(type_mismatch(spec, "image", value));
    };
    let expected = expected_shape(spec);
    if img.shape() != expected {
        return Err(EncodingError::ShapeMismatch {
            feature: spec.name().to_string(),
            expected,
            actual: img.shape(),
        });
    }

    let color = match img.pixel_format() {
        PixelFormat::Gray8 => ExtendedColorType::L8,
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
    };
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(img.pixels(), img.width(), img.height(), color)
        .map_err(|e| EncodingError::Image {
            feature: spec.name().to_string(),
            reason: e.to_string(),
        })?;
    Ok(Json::String(data_url::encode(PNG, &png)))
}

pub(super) fn decode(wire: &Json, spec: &FeatureSpec) -> Result<Value, DecodingError> {
    let url = wire.as_str().ok_or_else(|| DecodingError::UnexpectedWireType {
        feature: spec.name().to_string(),
        expected: "data URL string",
        actual: wire_kind(wire),
    })?;
    let (media_type, data) = data_url::decode_expecting(spec.name(), url, ACCEPTED)?;
    let format = if media_type == PNG {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };

    let dynamic = image::load(Cursor::new(data), format).map_err(|e| DecodingError::Image {
        feature: spec.name().to_string(),
        reason: e.to_string(),
    })?;
    let img = Image::from_dynamic(dynamic);

    let expected = expected_shape(spec);
    if img.shape() != expected {
        return Err(DecodingError::ShapeMismatch {
            feature: spec.name().to_string(),
            expected,
            actual: img.shape(),
        });
    }
    Ok(Value::Image(img))
}
