use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::TensorError;

/// Element type of a numeric tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
            DType::U8 => 1,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Saturates at `usize::MAX`; see [`Shape::checked_numel`].
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }
    pub fn checked_numel(&self) -> Option<usize> {
        self.0
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .map(|n| n.max(1))
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for Shape {
    fn from(d: &[usize]) -> Self {
        Self::from_slice(d)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(d: [usize; N]) -> Self {
        Self::from_slice(&d)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str(")")
    }
}

/// Dense, C-ordered numeric array with little-endian storage.
///
/// Equality compares the raw bytes, so two tensors are equal only when every
/// element is bit-identical.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    dtype: DType,
    shape: Shape,
    data: Bytes,
}

impl Tensor {
    /// Wraps little-endian bytes, checking the length against `shape`.
    pub fn from_le_bytes(dtype: DType, shape: Shape, data: Bytes) -> Result<Self, TensorError> {
        let expected = shape
            .checked_numel()
            .and_then(|n| n.checked_mul(dtype.byte_size()))
            .ok_or_else(|| TensorError::TooLarge {
                shape: shape.clone(),
            })?;
        if data.len() != expected {
            return Err(TensorError::ByteLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    pub fn from_f32(shape: impl Into<Shape>, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_elements(DType::F32, shape.into(), values, |v| v.to_le_bytes())
    }

    pub fn from_f64(shape: impl Into<Shape>, values: &[f64]) -> Result<Self, TensorError> {
        Self::from_elements(DType::F64, shape.into(), values, |v| v.to_le_bytes())
    }

    pub fn from_i32(shape: impl Into<Shape>, values: &[i32]) -> Result<Self, TensorError> {
        Self::from_elements(DType::I32, shape.into(), values, |v| v.to_le_bytes())
    }

    pub fn from_i64(shape: impl Into<Shape>, values: &[i64]) -> Result<Self, TensorError> {
        Self::from_elements(DType::I64, shape.into(), values, |v| v.to_le_bytes())
    }

    pub fn from_u8(shape: impl Into<Shape>, values: &[u8]) -> Result<Self, TensorError> {
        let shape = shape.into();
        Self::check_count(&shape, values.len())?;
        Ok(Self {
            dtype: DType::U8,
            shape,
            data: Bytes::copy_from_slice(values),
        })
    }

    fn from_elements<T: Copy, const N: usize>(
        dtype: DType,
        shape: Shape,
        values: &[T],
        to_le: impl Fn(T) -> [u8; N],
    ) -> Result<Self, TensorError> {
        Self::check_count(&shape, values.len())?;
        let mut buf = Vec::with_capacity(values.len() * N);
        for v in values {
            buf.extend_from_slice(&to_le(*v));
        }
        Ok(Self {
            dtype,
            shape,
            data: Bytes::from(buf),
        })
    }

    fn check_count(shape: &Shape, actual: usize) -> Result<(), TensorError> {
        let expected = shape.checked_numel().ok_or_else(|| TensorError::TooLarge {
            shape: shape.clone(),
        })?;
        if actual != expected {
            return Err(TensorError::ElementCount { expected, actual });
        }
        Ok(())
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Raw little-endian element bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        self.expect(DType::F32)?;
        Ok(self
            .data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn to_f64_vec(&self) -> Result<Vec<f64>, TensorError> {
        self.expect(DType::F64)?;
        Ok(self
            .data
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    pub fn to_i32_vec(&self) -> Result<Vec<i32>, TensorError> {
        self.expect(DType::I32)?;
        Ok(self
            .data
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn to_i64_vec(&self) -> Result<Vec<i64>, TensorError> {
        self.expect(DType::I64)?;
        Ok(self
            .data
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    pub fn to_u8_vec(&self) -> Result<Vec<u8>, TensorError> {
        self.expect(DType::U8)?;
        Ok(self.data.to_vec())
    }

    fn expect(&self, dtype: DType) -> Result<(), TensorError> {
        if self.dtype != dtype {
            return Err(TensorError::DTypeMismatch {
                expected: dtype,
                actual: self.dtype,
            });
        }
        Ok(())
    }
}
