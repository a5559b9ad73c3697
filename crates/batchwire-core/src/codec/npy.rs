//! Minimal reader/writer for the NumPy `.npy` container.
//!
//! Writes version 1.0 with a little-endian, C-ordered header. Reads versions
//! 1 through 3 as long as the payload is little-endian and C-ordered.

use bytes::Bytes;

use crate::{DType, Shape, Tensor};

pub const MEDIA_TYPE: &str = "application/x.peltarion.npy";

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGN: usize = 64;

fn descr(dtype: DType) -> &'static str {
    match dtype {
        DType::F32 => "<f4",
        DType::F64 => "<f8",
        DType::I32 => "<i4",
        DType::I64 => "<i8",
        DType::U8 => "|u1",
    }
}

fn parse_descr(descr: &str) -> Result<DType, String> {
    match descr {
        "<f4" => Ok(DType::F32),
        "<f8" => Ok(DType::F64),
        "<i4" => Ok(DType::I32),
        "<i8" => Ok(DType::I64),
        "|u1" | "<u1" => Ok(DType::U8),
        other => Err(format!("unsupported dtype descriptor {other:?}")),
    }
}

fn shape_tuple(shape: &Shape) -> String {
    match shape.dims() {
        [d] => format!("({d},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

pub(crate) fn write(tensor: &Tensor) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr(tensor.dtype()),
        shape_tuple(tensor.shape())
    );
    // magic + version + u16 length + header + '\n' must land on the alignment.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let data = tensor.as_bytes();
    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + data.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out
}

pub(crate) fn read(buf: &[u8]) -> Result<Tensor, String> {
    if buf.len() < MAGIC.len() + 2 || &buf[..MAGIC.len()] != MAGIC {
        return Err("missing npy magic".to_string());
    }
    let major = buf[MAGIC.len()];
    let (header_len, header_start) = match major {
        1 => {
            let at = MAGIC.len() + 2;
            let raw = buf.get(at..at + 2).ok_or("truncated header length")?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, at + 2)
        }
        2 | 3 => {
            let at = MAGIC.len() + 2;
            let raw = buf.get(at..at + 4).ok_or("truncated header length")?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                at + 4,
            )
        }
        v => return Err(format!("unsupported npy version {v}")),
    };

    let header_end = header_start + header_len;
    let header = buf
        .get(header_start..header_end)
        .ok_or("truncated header")?;
    let header = std::str::from_utf8(header).map_err(|_| "header is not utf-8")?;

    let dtype = parse_descr(quoted_value(header, "descr")?)?;
    if raw_value(header, "fortran_order")?.starts_with("True") {
        return Err("fortran-ordered arrays are not supported".to_string());
    }
    let shape = parse_shape(raw_value(header, "shape")?)?;

    let data = Bytes::copy_from_slice(&buf[header_end..]);
    Tensor::from_le_bytes(dtype, shape, data).map_err(|e| e.to_string())
}

/// Text following `'key':` in the header dict, leading whitespace removed.
fn raw_value<'a>(header: &'a str, key: &str) -> Result<&'a str, String> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        if let Some(pos) = header.find(&needle) {
            let rest = header[pos + needle.len()..].trim_start();
            let rest = rest
                .strip_prefix(':')
                .ok_or_else(|| format!("malformed header entry for {key}"))?;
            return Ok(rest.trim_start());
        }
    }
    Err(format!("header has no {key} entry"))
}

fn quoted_value<'a>(header: &'a str, key: &str) -> Result<&'a str, String> {
    let rest = raw_value(header, key)?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| format!("{key} is not a string"))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| format!("unterminated {key} string"))?;
    Ok(&body[..end])
}

fn parse_shape(raw: &str) -> Result<Shape, String> {
    let body = raw
        .strip_prefix('(')
        .and_then(|r| r.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or("shape is not a tuple")?;
    let dims = body
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| format!("invalid shape dimension {s:?}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let shape = Shape::from_slice(&dims);
    if shape.checked_numel().is_none() {
        return Err(format!("shape {shape} is too large"));
    }
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_aligned() {
        let t = Tensor::from_f32([2, 3], &[0.0; 6]).unwrap();
        let out = write(&t);
        let header_len = u16::from_le_bytes([out[8], out[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(out.len(), 10 + header_len + 24);
        let header = std::str::from_utf8(&out[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
    }

    #[test]
    fn one_dimensional_shape_keeps_trailing_comma() {
        let t = Tensor::from_u8([4], &[1, 2, 3, 4]).unwrap();
        let out = write(&t);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("'shape': (4,)"));
        assert_eq!(read(&out).unwrap(), t);
    }

    #[test]
    fn reads_version_two_header() {
        let header = "{'descr': '<i4', 'fortran_order': False, 'shape': (2,), }\n";
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&[2, 0]);
        buf.extend_from_slice(&(header.len() as u32).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&7i32.to_le_bytes());
        buf.extend_from_slice(&(-7i32).to_le_bytes());
        let t = read(&buf).unwrap();
        assert_eq!(t.to_i32_vec().unwrap(), vec![7, -7]);
    }

    fn replace_once(buf: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
        let at = buf.windows(from.len()).position(|w| w == from).unwrap();
        let mut out = buf.to_vec();
        out[at..at + to.len()].copy_from_slice(to);
        out
    }

    #[test]
    fn rejects_big_endian_and_fortran_order() {
        let t = Tensor::from_f64([1], &[1.0]).unwrap();
        let good = write(&t);

        let swapped = replace_once(&good, b"<f8", b">f8");
        assert!(read(&swapped).unwrap_err().contains("unsupported dtype"));

        let fortran = replace_once(&good, b"'fortran_order': False", b"'fortran_order': True ");
        assert!(read(&fortran).unwrap_err().contains("fortran"));
    }

    #[test]
    fn rejects_overflowing_shape() {
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (18446744073709551615, 2), }\n";
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&[0; 8]);
        assert!(read(&buf).unwrap_err().contains("too large"));
    }

    #[test]
    fn rejects_truncated_payload() {
        let t = Tensor::from_f32([4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut out = write(&t);
        out.truncate(out.len() - 1);
        assert!(read(&out).is_err());
        assert!(read(b"not npy").is_err());
    }
}
