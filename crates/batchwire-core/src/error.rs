//! Error types for specs, values and the codec.
//!
//! Every error is `Clone`: a single failure may have to be reported to several
//! callers.

use thiserror::Error;

use crate::{DType, FeatureType, Shape};

/// A feature specification failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("feature name must not be empty")]
    EmptyName,

    #[error("feature {feature} has an empty shape")]
    EmptyShape { feature: String },

    #[error("feature {feature} has a zero dimension in shape {shape}")]
    ZeroDimension { feature: String, shape: Shape },

    #[error("duplicate feature name: {feature}")]
    DuplicateFeature { feature: String },

    #[error("image feature {feature} needs shape (h, w) or (h, w, 1|3), got {shape}")]
    InvalidImageShape { feature: String, shape: Shape },

    #[error("feature {feature} is {dtype}; only categorical features take a vocabulary")]
    VocabularyNotAllowed { feature: String, dtype: FeatureType },

    #[error("feature {feature} lists category {category:?} more than once")]
    DuplicateCategory { feature: String, category: String },
}

/// A tensor could not be built from, or read as, the requested elements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("expected {expected} elements, got {actual}")]
    ElementCount { expected: usize, actual: usize },

    #[error("expected {expected} bytes, got {actual}")]
    ByteLength { expected: usize, actual: usize },

    #[error("tensor holds {actual}, not {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    #[error("shape {shape} is too large")]
    TooLarge { shape: Shape },
}

/// A caller-supplied value violates its feature spec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("record is missing feature: {feature}")]
    MissingFeature { feature: String },

    #[error("feature {feature} expects {expected}, got {actual}")]
    TypeMismatch {
        feature: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("feature {feature} expects shape {expected}, got {actual}")]
    ShapeMismatch {
        feature: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("feature {feature}: {category:?} is not in the declared vocabulary")]
    OutsideVocabulary { feature: String, category: String },

    #[error("feature {feature} expects {expected} category scores, got {actual}")]
    CategoryCount {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("feature {feature}: non-finite numbers cannot be encoded")]
    NonFinite { feature: String },

    #[error("feature {feature}: image encoding failed: {reason}")]
    Image { feature: String, reason: String },
}

/// A server-returned wire value could not be parsed into its feature type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodingError {
    #[error("response row is {actual}, not an object")]
    MalformedRow { actual: &'static str },

    #[error("response row is missing feature: {feature}")]
    MissingFeature { feature: String },

    #[error("feature {feature}: expected {expected} on the wire, got {actual}")]
    UnexpectedWireType {
        feature: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("feature {feature}: not a valid data URL")]
    DataUrl { feature: String },

    #[error("feature {feature}: expected media type {expected}, got {actual}")]
    MediaType {
        feature: String,
        expected: String,
        actual: String,
    },

    #[error("feature {feature}: invalid base64 payload: {reason}")]
    Base64 { feature: String, reason: String },

    #[error("feature {feature}: invalid npy payload: {reason}")]
    Npy { feature: String, reason: String },

    #[error("feature {feature}: invalid image payload: {reason}")]
    Image { feature: String, reason: String },

    #[error("feature {feature} expects shape {expected}, got {actual}")]
    ShapeMismatch {
        feature: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("feature {feature} expects {expected} category scores, got {actual}")]
    CategoryCount {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("feature {feature}: {category:?} is not in the declared vocabulary")]
    OutsideVocabulary { feature: String, category: String },
}
