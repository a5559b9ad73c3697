use std::collections::BTreeMap;

use anyhow::{ensure, Context, Result};
use batchwire_core::{
    decode_record, encode_record, Blob, Categorical, EncodedItem, FeatureSpecSet, Image,
    PixelFormat, Record, Tensor, Value,
};

const SPECS: &str = r#"[
    {"name": "photo", "dtype": "image", "shape": [4, 5, 3]},
    {"name": "mask", "dtype": "image", "shape": [4, 5, 1]},
    {"name": "age", "dtype": "numeric", "shape": [1]},
    {"name": "embedding", "dtype": "numeric", "shape": [2, 4]},
    {"name": "counts", "dtype": "numeric", "shape": [3]},
    {"name": "species", "dtype": "categorical", "shape": [2], "vocabulary": ["cat", "dog"]},
    {"name": "scores", "dtype": "categorical", "shape": [2]},
    {"name": "notes", "dtype": "text", "shape": [64]},
    {"name": "attachment", "dtype": "binary", "shape": [1]}
]"#;

fn sample_record() -> Result<Record> {
    let photo: Vec<u8> = (0..60).map(|i| (i * 13 % 251) as u8).collect();
    let mask: Vec<u8> = (0..20).map(|i| if i % 3 == 0 { 255 } else { 0 }).collect();
    let embedding: Vec<f32> = vec![0.1, -0.2, 1e-7, 3.5, f32::MIN_POSITIVE, -0.0, 2.0, 1.0 / 3.0];

    let mut scores = BTreeMap::new();
    scores.insert("a".to_string(), 0.123_456_789_012_345_6);
    scores.insert("b".to_string(), 1.0 - 0.123_456_789_012_345_6);

    Ok(Record::new()
        .with("photo", Image::new(5, 4, PixelFormat::Rgb8, photo)?)
        .with("mask", Image::new(5, 4, PixelFormat::Gray8, mask)?)
        .with("age", 41.25)
        .with("embedding", Tensor::from_f32([2, 4], &embedding)?)
        .with("counts", Tensor::from_i64([3], &[0, -12, i64::MIN])?)
        .with("species", Categorical::Label("dog".into()))
        .with("scores", Categorical::Scores(scores))
        .with("notes", "exact text, with unicode: æøå ✓")
        .with("attachment", Blob::new("application/octet-stream", vec![0u8, 1, 2, 254, 255])))
}

#[test]
fn every_feature_type_round_trips_exactly() -> Result<()> {
    let specs: FeatureSpecSet = serde_json::from_str(SPECS).context("parse specs")?;
    let record = sample_record()?;

    let row = encode_record(&record, &specs)?;
    ensure!(row.0.len() == specs.len(), "one wire value per feature");

    // The row must survive a trip through JSON text, as it would over HTTP.
    let text = serde_json::to_string(&row)?;
    let row: EncodedItem = serde_json::from_str(&text)?;

    let decoded = decode_record(&row, &specs)?;
    assert_eq!(decoded, record);
    Ok(())
}

#[test]
fn decoded_values_expose_typed_accessors() -> Result<()> {
    let specs: FeatureSpecSet = serde_json::from_str(SPECS)?;
    let decoded = decode_record(&encode_record(&sample_record()?, &specs)?, &specs)?;

    let age = decoded.get("age").and_then(Value::as_number);
    assert_eq!(age, Some(41.25));

    let counts = decoded
        .get("counts")
        .and_then(Value::as_tensor)
        .context("counts is a tensor")?;
    assert_eq!(counts.to_i64_vec()?, vec![0, -12, i64::MIN]);

    let photo = decoded
        .get("photo")
        .and_then(Value::as_image)
        .context("photo is an image")?;
    ensure!(photo.width() == 5 && photo.height() == 4, "dimensions kept");
    Ok(())
}

#[test]
fn tensors_travel_under_the_npy_media_type() -> Result<()> {
    let specs: FeatureSpecSet = serde_json::from_str(SPECS).context("parse specs")?;
    let row = encode_record(&sample_record()?, &specs)?;
    let wire = row
        .get("embedding")
        .and_then(|v| v.as_str())
        .context("embedding is a data url")?;
    let prefix = format!("data:{};base64,", batchwire_core::codec::NPY_MEDIA_TYPE);
    ensure!(wire.starts_with(&prefix), "unexpected prefix in {wire:.40}");
    Ok(())
}
