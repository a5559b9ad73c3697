use std::collections::BTreeMap;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView};

use crate::{Shape, Tensor, TensorError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Uncompressed 8-bit image, row-major, channels interleaved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    pixels: Bytes,
}

impl Image {
    pub fn new(
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        pixels: impl Into<Bytes>,
    ) -> Result<Self, TensorError> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * pixel_format.channels();
        if pixels.len() != expected {
            return Err(TensorError::ByteLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixel_format,
            pixels,
        })
    }

    /// Alpha is dropped: RGBA becomes RGB and LA becomes L. Wider formats are
    /// narrowed to 8 bits per channel.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let (pixel_format, raw) = match img {
            DynamicImage::ImageLuma8(buf) => (PixelFormat::Gray8, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb8, buf.into_raw()),
            other if other.color().has_color() => (PixelFormat::Rgb8, other.to_rgb8().into_raw()),
            other => (PixelFormat::Gray8, other.to_luma8().into_raw()),
        };
        Self {
            width,
            height,
            pixel_format,
            pixels: Bytes::from(raw),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// `(height, width, channels)`, the layout feature specs declare.
    pub fn shape(&self) -> Shape {
        Shape::from([
            self.height as usize,
            self.width as usize,
            self.pixel_format.channels(),
        ])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Categorical {
    /// A single class label.
    Label(String),
    /// Per-class scores, as returned by classification models.
    Scores(BTreeMap<String, f64>),
}

/// Opaque bytes tagged with a media type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub media_type: String,
    pub data: Bytes,
}

impl Blob {
    pub fn new(media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// A typed feature value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Tensor(Tensor),
    Image(Image),
    Categorical(Categorical),
    Text(String),
    Binary(Blob),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Tensor(_) => "tensor",
            Value::Image(_) => "image",
            Value::Categorical(_) => "categorical",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Value::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl From<Image> for Value {
    fn from(i: Image) -> Self {
        Value::Image(i)
    }
}

impl From<Categorical> for Value {
    fn from(c: Categorical) -> Self {
        Value::Categorical(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Blob> for Value {
    fn from(b: Blob) -> Self {
        Value::Binary(b)
    }
}
