//! Reader for NumPy `.npy` files.
//!
//! The synthetic ensembles are stored as a single three-dimensional array per
//! (design, structure) pair. Only what those files use is supported: little-endian
//! numeric dtypes in C order, format versions 1.0 to 3.0.
//!
//! Layout of a file:
//!
//! | Offset      | Size           | Contents                                      |
//! |-------------|----------------|-----------------------------------------------|
//! | 0           | 6              | Magic, `\x93NUMPY`                            |
//! | 6           | 2              | Major and minor version                       |
//! | 8           | 2 (v1) / 4     | Little-endian header length                   |
//! | 10 / 12     | header length  | Python dict literal (`descr`, `fortran_order`, `shape`) |
//! | after above | remainder      | Raw array data                                |

use ndarray::{Array2, Array3};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// First six bytes of every `.npy` file.
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Errors that can occur while reading a `.npy` file
#[derive(Error, Debug)]
pub enum NpyError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("File does not start with the NumPy magic")]
    BadMagic,

    #[error("File ends before the {0} is complete")]
    Truncated(&'static str),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Array of shape {shape:?} needs {expected} bytes of data, found {found}")]
    DataLength {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("Array has {found} dimensions, expected {expected}")]
    Dimensions { expected: usize, found: usize },
}

type Result<T> = core::result::Result<T, NpyError>;

/// Element types which can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpyDtype {
    F8,
    F4,
    I8,
    I4,
}

impl NpyDtype {
    fn parse(descr: &str) -> Result<Self> {
        match descr {
            "<f8" => Ok(Self::F8),
            "<f4" => Ok(Self::F4),
            "<i8" => Ok(Self::I8),
            "<i4" => Ok(Self::I4),
            other => Err(NpyError::Unsupported(format!("dtype '{}'", other))),
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::F8 | Self::I8 => 8,
            Self::F4 | Self::I4 => 4,
        }
    }

    fn descr(self) -> &'static str {
        match self {
            Self::F8 => "<f8",
            Self::F4 => "<f4",
            Self::I8 => "<i8",
            Self::I4 => "<i4",
        }
    }

    /// Converts packed little-endian elements of this type to `f64`.
    fn decode(self, data: &[u8]) -> Result<Vec<f64>> {
        match self {
            Self::F8 => decode_elements(data, f64::from_le_bytes),
            Self::F4 => decode_elements(data, |bytes| f32::from_le_bytes(bytes) as f64),
            Self::I8 => decode_elements(data, |bytes| i64::from_le_bytes(bytes) as f64),
            Self::I4 => decode_elements(data, |bytes| i32::from_le_bytes(bytes) as f64),
        }
    }
}

fn decode_elements<const N: usize>(data: &[u8], decode: impl Fn([u8; N]) -> f64) -> Result<Vec<f64>> {
    let elements = data.chunks_exact(N);
    if !elements.remainder().is_empty() {
        return Err(NpyError::Truncated("last element"));
    }

    elements
        .map(|element| {
            <[u8; N]>::try_from(element)
                .map(&decode)
                .map_err(|_| NpyError::Truncated("element"))
        })
        .collect()
}

/// The parsed contents of the header dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: NpyDtype,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

/// An n-dimensional array read from a `.npy` file, converted to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    /// Elements in C (row-major) order.
    pub data: Vec<f64>,
}

impl NpyArray {
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Converts into a two-dimensional array.
    pub fn into_array2(self) -> Result<Array2<f64>> {
        self.check_dimensions(2)?;
        let shape = [self.shape[0], self.shape[1]];
        Array2::from_shape_vec(shape, self.data)
            .map_err(|e| NpyError::MalformedHeader(e.to_string()))
    }

    /// Converts into a three-dimensional array.
    pub fn into_array3(self) -> Result<Array3<f64>> {
        self.check_dimensions(3)?;
        let shape = [self.shape[0], self.shape[1], self.shape[2]];
        Array3::from_shape_vec(shape, self.data)
            .map_err(|e| NpyError::MalformedHeader(e.to_string()))
    }

    fn check_dimensions(&self, expected: usize) -> Result<()> {
        if self.ndim() == expected {
            Ok(())
        } else {
            Err(NpyError::Dimensions {
                expected,
                found: self.ndim(),
            })
        }
    }
}

/// Reads a `.npy` file from disk.
pub fn read_npy(file_path: &Path) -> Result<NpyArray> {
    let bytes = fs::read(file_path)?;
    let array = parse_npy(&bytes)?;
    debug!(path = %file_path.display(), shape = ?array.shape, "Loaded NumPy array");
    Ok(array)
}

/// Parses the bytes of a `.npy` file.
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArray> {
    if bytes.len() < 8 {
        return Err(NpyError::Truncated("preamble"));
    }

    if &bytes[..6] != NPY_MAGIC {
        return Err(NpyError::BadMagic);
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => {
            let len = read_le_u16(bytes, 8).ok_or(NpyError::Truncated("header length"))?;
            (len as usize, 10)
        }
        2 | 3 => {
            let len = read_le_u32(bytes, 8).ok_or(NpyError::Truncated("header length"))?;
            (len as usize, 12)
        }
        other => {
            return Err(NpyError::Unsupported(format!(
                "format version {}.{}",
                other, bytes[7]
            )))
        }
    };

    let data_start = header_start + header_len;
    let header_bytes = bytes
        .get(header_start..data_start)
        .ok_or(NpyError::Truncated("header"))?;
    let header_text = std::str::from_utf8(header_bytes)
        .map_err(|e| NpyError::MalformedHeader(e.to_string()))?;
    let header = parse_header(header_text)?;

    if header.fortran_order {
        return Err(NpyError::Unsupported("Fortran ordered arrays".to_string()));
    }

    let count: usize = header.shape.iter().product();
    let expected = count * header.dtype.size();
    let data = &bytes[data_start..];
    if data.len() != expected {
        return Err(NpyError::DataLength {
            shape: header.shape,
            expected,
            found: data.len(),
        });
    }

    Ok(NpyArray {
        data: header.dtype.decode(data)?,
        shape: header.shape,
    })
}

/// Parses the Python dict literal describing the array.
pub fn parse_header(text: &str) -> Result<NpyHeader> {
    let descr = dict_value(text, "descr")?;
    let descr = descr
        .trim_end_matches(',')
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"');
    let dtype = NpyDtype::parse(descr)?;

    let fortran_order = match dict_value(text, "fortran_order")?.trim_end_matches(',').trim() {
        "True" => true,
        "False" => false,
        other => {
            return Err(NpyError::MalformedHeader(format!(
                "fortran_order '{}'",
                other
            )))
        }
    };

    let shape_text = dict_value(text, "shape")?;
    let open = shape_text
        .find('(')
        .ok_or_else(|| NpyError::MalformedHeader("shape is not a tuple".to_string()))?;
    let close = shape_text
        .find(')')
        .ok_or_else(|| NpyError::MalformedHeader("unterminated shape tuple".to_string()))?;
    let shape = shape_text[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("shape dimension '{}'", dim)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NpyHeader {
        dtype,
        fortran_order,
        shape,
    })
}

/// Returns the text following `'key':` up to the next key or the end of the dict.
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str> {
    let quoted = [format!("'{}'", key), format!("\"{}\"", key)];
    let key_start = quoted
        .iter()
        .find_map(|q| text.find(q.as_str()).map(|pos| pos + q.len()))
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing key '{}'", key)))?;

    let rest = &text[key_start..];
    let colon = rest
        .find(':')
        .ok_or_else(|| NpyError::MalformedHeader(format!("no value for '{}'", key)))?;
    let rest = rest[colon + 1..].trim_start();

    // The shape tuple contains commas, so it ends at its closing parenthesis.
    let end = if rest.starts_with('(') {
        rest.find(')').map(|pos| pos + 1)
    } else {
        rest.find([',', '}'])
    }
    .unwrap_or(rest.len());

    Ok(rest[..end].trim())
}

#[inline]
fn read_le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([slice[0], slice[1]]))
}

#[inline]
fn read_le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Serializes `<f8` data as a version 1.0 `.npy` file.
///
/// The header is padded with spaces so the data starts on a 64 byte boundary, like NumPy does.
pub fn encode_npy_f64(shape: &[usize], data: &[f64]) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
    let shape_text = match dims.len() {
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    };
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        NpyDtype::F8.descr(),
        shape_text
    );

    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(10 + header.len() + data.len() * 8);
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn with_header(major: u8, header: &str, data: &[u8]) -> Vec<u8> {
        let mut bytes = NPY_MAGIC.to_vec();
        bytes.extend_from_slice(&[major, 0]);
        if major == 1 {
            bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        } else {
            bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        }
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn round_trips_three_dimensional_array() {
        let data: Vec<f64> = (0..24).map(|x| x as f64 * 0.5).collect();
        let bytes = encode_npy_f64(&[2, 3, 4], &data);
        assert_eq!((bytes.len() - data.len() * 8) % 64, 0);

        let array = parse_npy(&bytes).unwrap();
        assert_eq!(array.shape, vec![2, 3, 4]);
        let array = array.into_array3().unwrap();
        assert_eq!(array[[1, 2, 3]], 11.5);
        assert_eq!(array[[0, 1, 0]], 2.0);
    }

    #[test]
    fn parses_version_two_headers() {
        let header = "{'descr': '<i4', 'fortran_order': False, 'shape': (3,), }\n";
        let data: Vec<u8> = [1i32, -2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = parse_npy(&with_header(2, header, &data)).unwrap();
        assert_eq!(array.shape, vec![3]);
        assert_eq!(array.data, vec![1.0, -2.0, 3.0]);
    }

    #[rstest]
    #[case::f4("<f4", 4)]
    #[case::i8("<i8", 8)]
    fn parses_other_dtypes(#[case] descr: &str, #[case] size: usize) {
        let header = format!("{{'descr': '{}', 'fortran_order': False, 'shape': (2, 1), }}", descr);
        let data = match size {
            4 => [1.5f32, 2.5].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>(),
            _ => [7i64, 8].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>(),
        };
        let array = parse_npy(&with_header(1, &header, &data)).unwrap();
        assert_eq!(array.shape, vec![2, 1]);
        assert_eq!(array.into_array2().unwrap().len(), 2);
    }

    #[rstest]
    #[case::f8(NpyDtype::F8, 7)]
    #[case::f4(NpyDtype::F4, 6)]
    #[case::i4(NpyDtype::I4, 9)]
    fn decode_rejects_partial_elements(#[case] dtype: NpyDtype, #[case] len: usize) {
        let data = vec![0u8; len];
        assert!(matches!(
            dtype.decode(&data),
            Err(NpyError::Truncated("last element"))
        ));
    }

    #[test]
    fn decode_converts_every_element() {
        let data: Vec<u8> = [-1i64, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(NpyDtype::I8.decode(&data).unwrap(), vec![-1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode_npy_f64(&[1], &[1.0]);
        bytes[1] = b'X';
        assert!(matches!(parse_npy(&bytes), Err(NpyError::BadMagic)));
    }

    #[test]
    fn rejects_fortran_order() {
        let header = "{'descr': '<f8', 'fortran_order': True, 'shape': (1,), }";
        let bytes = with_header(1, header, &1.0f64.to_le_bytes());
        assert!(matches!(parse_npy(&bytes), Err(NpyError::Unsupported(_))));
    }

    #[test]
    fn rejects_big_endian() {
        let header = "{'descr': '>f8', 'fortran_order': False, 'shape': (1,), }";
        let bytes = with_header(1, header, &1.0f64.to_be_bytes());
        assert!(matches!(parse_npy(&bytes), Err(NpyError::Unsupported(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut bytes = encode_npy_f64(&[4], &[1.0, 2.0, 3.0, 4.0]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            parse_npy(&bytes),
            Err(NpyError::DataLength {
                expected: 32,
                found: 29,
                ..
            })
        ));
    }

    #[test]
    fn rejects_wrong_dimensionality() {
        let array = parse_npy(&encode_npy_f64(&[2, 2], &[0.0; 4])).unwrap();
        assert!(matches!(
            array.into_array3(),
            Err(NpyError::Dimensions {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn parses_scalar_shape() {
        let header = parse_header("{'descr': '<f8', 'fortran_order': False, 'shape': (), }").unwrap();
        assert!(header.shape.is_empty());
    }

    #[test]
    fn reads_from_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), encode_npy_f64(&[1, 2], &[3.0, -999.9])).unwrap();

        let array = read_npy(file.path()).unwrap();
        assert_eq!(array.data, vec![3.0, -999.9]);
    }
}
