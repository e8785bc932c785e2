//! Minimal NumPy `.npy` codec.
//!
//! Reads little-endian `f4`/`f8` feature vectors and writes the `(n, 3)`
//! `f8` score tables consumed by downstream ROC tooling.

use std::io::{self, Write};
use std::path::Path;

use crate::error::{MatchError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
}

impl Dtype {
    fn size(self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Read one feature file and flatten it to a vector.
pub fn read_vector(path: &Path) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path).map_err(|source| MatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_vector(&bytes).map_err(|reason| MatchError::Npy {
        path: path.to_path_buf(),
        reason,
    })
}

/// Decode an in-memory `.npy` payload into a flat vector.
///
/// `f4` payloads are widened exactly, `f8` payloads are kept as is.
pub fn decode_vector(bytes: &[u8]) -> std::result::Result<Vec<f64>, String> {
    let (header, offset) = parse_header(bytes)?;
    if header.fortran_order && header.shape.iter().filter(|&&d| d > 1).count() > 1 {
        return Err("fortran-ordered matrices are not feature vectors".into());
    }

    let count = element_count(&header.shape)?;
    let body = &bytes[offset..];
    let needed = payload_len(count, header.dtype)?;
    if body.len() < needed {
        return Err(format!(
            "payload holds {} bytes, shape {:?} needs {}",
            body.len(),
            header.shape,
            needed
        ));
    }

    let values = match header.dtype {
        Dtype::F32 => body[..needed]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        Dtype::F64 => body[..needed].chunks_exact(8).map(le_f64).collect(),
    };
    Ok(values)
}

fn le_f64(c: &[u8]) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(c);
    f64::from_le_bytes(b)
}

fn element_count(shape: &[usize]) -> std::result::Result<usize, String> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("shape {shape:?} overflows"))
}

fn payload_len(count: usize, dtype: Dtype) -> std::result::Result<usize, String> {
    count
        .checked_mul(dtype.size())
        .ok_or_else(|| format!("{count} elements overflow the payload size"))
}

fn parse_header(bytes: &[u8]) -> std::result::Result<(Header, usize), String> {
    if bytes.len() < 10 || !bytes.starts_with(MAGIC) {
        return Err("missing npy magic".into());
    }
    let major = bytes[6];
    let (len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated header length".into());
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        v => return Err(format!("unsupported npy version {v}")),
    };
    let end = start + len;
    if bytes.len() < end {
        return Err("truncated header".into());
    }
    let text = std::str::from_utf8(&bytes[start..end]).map_err(|e| e.to_string())?;

    let descr = dict_value(text, "descr").ok_or("header has no descr")?;
    let descr = descr.trim_matches(|c: char| c == '\'' || c == '"');
    let little = cfg!(target_endian = "little");
    let dtype = match descr {
        "<f4" => Dtype::F32,
        "<f8" => Dtype::F64,
        "=f4" | "|f4" if little => Dtype::F32,
        "=f8" | "|f8" if little => Dtype::F64,
        other => return Err(format!("unsupported dtype {other}")),
    };

    let fortran_order = match dict_value(text, "fortran_order") {
        Some("True") => true,
        Some("False") => false,
        _ => return Err("header has no fortran_order".into()),
    };

    let shape = dict_value(text, "shape").ok_or("header has no shape")?;
    let shape = shape
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("bad shape entry {s}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((
        Header {
            dtype,
            fortran_order,
            shape,
        },
        end,
    ))
}

/// Value text for `key` in the header's python dict literal.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let single = format!("'{key}'");
    let double = format!("\"{key}\"");
    let pos = text
        .find(&single)
        .map(|p| p + single.len())
        .or_else(|| text.find(&double).map(|p| p + double.len()))?;
    let rest = text[pos..].trim_start().strip_prefix(':')?.trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')')? + 1
    } else {
        rest.find(|c: char| c == ',' || c == '}').unwrap_or(rest.len())
    };
    Some(rest[..end].trim())
}

/// Write the header of a row-major `(rows, cols)` `f8` matrix.
///
/// The caller streams exactly `rows * cols` little-endian values after it.
pub fn write_f64_header<W: Write>(w: &mut W, rows: usize, cols: usize) -> io::Result<()> {
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({rows}, {cols}), }}"
    );
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((ALIGN - unpadded % ALIGN) % ALIGN));
    header.push('\n');

    let len = u16::try_from(header.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "npy header too long"))?;
    w.write_all(MAGIC)?;
    w.write_all(&[1, 0])?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(header.as_bytes())
}

/// Encode a 1-D `f4` vector, the layout feature extractors emit.
pub fn encode_vector(values: &[f32]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((ALIGN - unpadded % ALIGN) % ALIGN));
    header.push('\n');

    let mut out = Vec::with_capacity(header.len() + 10 + values.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode an `f8` vector as an `(n, 1)` column.
pub fn encode_f64_vector(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(128 + values.len() * 8);
    // writes into a Vec cannot fail
    let _ = write_f64_header(&mut out, values.len(), 1);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode a `(rows, cols)` `f8` table written after [`write_f64_header`].
pub fn decode_f64_table(bytes: &[u8]) -> std::result::Result<(usize, usize, Vec<f64>), String> {
    let (header, offset) = parse_header(bytes)?;
    if header.dtype != Dtype::F64 || header.shape.len() != 2 {
        return Err(format!("expected a 2-D f8 table, got {:?}", header));
    }
    let (rows, cols) = (header.shape[0], header.shape[1]);
    let count = element_count(&header.shape)?;
    let needed = payload_len(count, Dtype::F64)?;
    let body = &bytes[offset..];
    if body.len() < needed {
        return Err("table payload truncated".into());
    }
    Ok((rows, cols, body[..needed].chunks_exact(8).map(le_f64).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(header: &str, body: &[u8]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(body);
        out
    }

    fn table(cols: usize, data: &[f64]) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        write_f64_header(&mut buf, data.len() / cols, cols)?;
        for v in data {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Ok(buf)
    }

    #[test]
    fn test_encoded_vector_is_aligned() {
        let bytes = encode_vector(&[1.0, -2.5, 0.25]);
        assert_eq!((bytes.len() - 12) % ALIGN, 0);
        assert_eq!(decode_vector(&bytes).unwrap(), vec![1.0, -2.5, 0.25]);
    }

    #[test]
    fn test_decode_f8_row_matrix() {
        let body: Vec<u8> = [0.5f64, 1.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = with_header(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 2), }\n",
            &body,
        );
        assert_eq!(decode_vector(&bytes).unwrap(), vec![0.5, 1.5]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(decode_vector(b"not an npy file").is_err());

        let bytes = with_header(
            "{'descr': '<i8', 'fortran_order': False, 'shape': (2,), }\n",
            &[0; 16],
        );
        assert!(decode_vector(&bytes).unwrap_err().contains("dtype"));

        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (4,), }\n",
            &[0; 8],
        );
        assert!(decode_vector(&bytes).is_err());
    }

    #[test]
    fn test_overflowing_shape_is_an_error() {
        let bytes = with_header(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (18446744073709551615, 2), }\n",
            &[0; 16],
        );
        assert!(decode_vector(&bytes).unwrap_err().contains("overflow"));
        assert!(decode_f64_table(&bytes).unwrap_err().contains("overflow"));

        // product fits but the byte length does not
        let bytes = with_header(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (4611686018427387904,), }\n",
            &[0; 16],
        );
        assert!(decode_vector(&bytes).unwrap_err().contains("overflow"));
    }

    #[test]
    fn test_f8_vector_keeps_precision() {
        let values = [0.123_456_789_012_345_6f64, -1.0e-300, 1.0 + f64::EPSILON];
        assert_eq!(decode_vector(&encode_f64_vector(&values)).unwrap(), values);
    }

    #[test]
    fn test_table_header() -> io::Result<()> {
        let buf = table(3, &[0.0, 1.0, 0.5, 1.0, 2.0, -0.25])?;
        assert_eq!((buf.len() - 6 * 8) % ALIGN, 0);
        let (rows, cols, data) = decode_f64_table(&buf).unwrap();
        assert_eq!((rows, cols), (2, 3));
        assert_eq!(data[5], -0.25);
        Ok(())
    }

    #[test]
    fn test_empty_table() -> io::Result<()> {
        let buf = table(3, &[])?;
        let (rows, cols, data) = decode_f64_table(&buf).unwrap();
        assert_eq!((rows, cols), (0, 3));
        assert!(data.is_empty());
        Ok(())
    }
}
