//! Numeric encodings shared by the codec and the document model
//!
//! Component type codes and element shapes follow the glTF 2.0 numbering, so
//! they serialize straight into the JSON chunk.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Buffer view target for vertex attribute data.
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
/// Buffer view target for index data.
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Primitive topology code for triangle lists (the glTF default).
pub const MODE_TRIANGLES: u32 = 4;

/// Scalar type of every component of an accessor element.
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    I8 = 5120,
    U8 = 5121,
    I16 = 5122,
    U16 = 5123,
    U32 = 5125,
    F32 = 5126,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Decode one little-endian component. `bytes` must hold at least [`Self::size`] bytes.
    pub fn read(self, bytes: &[u8]) -> f64 {
        match self {
            Self::I8 => bytes[0] as i8 as f64,
            Self::U8 => bytes[0] as f64,
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        }
    }
}

/// Element shape of an accessor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorType {
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorType {
    /// Number of components per element.
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// Matrix row count, `None` for scalars and vectors.
    fn matrix_rows(self) -> Option<usize> {
        match self {
            Self::Mat2 => Some(2),
            Self::Mat3 => Some(3),
            Self::Mat4 => Some(4),
            _ => None,
        }
    }

    /// Byte offset of every component inside one element.
    ///
    /// Matrix columns start on 4-byte boundaries, which only matters for
    /// 1- and 2-byte component types.
    pub fn component_offsets(self, component_type: ComponentType) -> Vec<usize> {
        let size = component_type.size();
        match self.matrix_rows() {
            None => (0..self.components()).map(|i| i * size).collect(),
            Some(rows) => {
                let column = (rows * size).next_multiple_of(4);
                (0..rows)
                    .flat_map(|c| (0..rows).map(move |r| c * column + r * size))
                    .collect()
            }
        }
    }

    /// Size of one tightly packed element in bytes.
    pub fn element_size(self, component_type: ComponentType) -> usize {
        let size = component_type.size();
        match self.matrix_rows() {
            None => self.components() * size,
            Some(rows) => rows * (rows * size).next_multiple_of(4),
        }
    }
}

/// A typed element array, written into a buffer by
/// [`Document::set_accessor_array`](crate::Document::set_accessor_array).
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorArray {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl AccessorArray {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::I8(_) => ComponentType::I8,
            Self::U8(_) => ComponentType::U8,
            Self::I16(_) => ComponentType::I16,
            Self::U16(_) => ComponentType::U16,
            Self::U32(_) => ComponentType::U32,
            Self::F32(_) => ComponentType::F32,
        }
    }

    /// Number of components (not elements).
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian encoding of one component.
    pub(crate) fn component_bytes(&self, index: usize) -> Vec<u8> {
        match self {
            Self::I8(v) => v[index].to_le_bytes().to_vec(),
            Self::U8(v) => vec![v[index]],
            Self::I16(v) => v[index].to_le_bytes().to_vec(),
            Self::U16(v) => v[index].to_le_bytes().to_vec(),
            Self::U32(v) => v[index].to_le_bytes().to_vec(),
            Self::F32(v) => v[index].to_le_bytes().to_vec(),
        }
    }

    /// Components widened to `f64`.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::I8(v) => v.iter().map(|&x| x as f64).collect(),
            Self::U8(v) => v.iter().map(|&x| x as f64).collect(),
            Self::I16(v) => v.iter().map(|&x| x as f64).collect(),
            Self::U16(v) => v.iter().map(|&x| x as f64).collect(),
            Self::U32(v) => v.iter().map(|&x| x as f64).collect(),
            Self::F32(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// Per-component bounds of a flat component list with `components` values per element.
///
/// Returns empty vectors for an empty input.
pub fn compute_bounds(values: &[f64], components: usize) -> (Vec<f64>, Vec<f64>) {
    if values.is_empty() || components == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut min = vec![f64::MAX; components];
    let mut max = vec![f64::MIN; components];

    for element in values.chunks(components) {
        for (i, &v) in element.iter().enumerate() {
            min[i] = min[i].min(v);
            max[i] = max[i].max(v);
        }
    }

    (min, max)
}

/// Round `len` up to the next multiple of 4.
pub fn align4(len: usize) -> usize {
    len.next_multiple_of(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_sizes() {
        assert_eq!(ComponentType::U8.size(), 1);
        assert_eq!(ComponentType::I16.size(), 2);
        assert_eq!(ComponentType::F32.size(), 4);
    }

    #[test]
    fn test_component_type_codes() {
        let json = serde_json::to_string(&ComponentType::U16).unwrap();
        assert_eq!(json, "5123");
        let parsed: ComponentType = serde_json::from_str("5126").unwrap();
        assert_eq!(parsed, ComponentType::F32);
        assert!(serde_json::from_str::<ComponentType>("5124").is_err());
    }

    #[test]
    fn test_accessor_type_names() {
        assert_eq!(serde_json::to_string(&AccessorType::Vec3).unwrap(), "\"VEC3\"");
        assert_eq!(AccessorType::Mat4.components(), 16);
    }

    #[test]
    fn test_matrix_column_padding() {
        // MAT2 of bytes: each 2-byte column padded to 4
        assert_eq!(AccessorType::Mat2.element_size(ComponentType::U8), 8);
        assert_eq!(
            AccessorType::Mat2.component_offsets(ComponentType::U8),
            vec![0, 1, 4, 5]
        );
        // MAT3 of shorts: 6-byte columns padded to 8
        assert_eq!(AccessorType::Mat3.element_size(ComponentType::I16), 24);
        assert_eq!(AccessorType::Mat4.element_size(ComponentType::F32), 64);
        assert_eq!(AccessorType::Vec3.element_size(ComponentType::F32), 12);
    }

    #[test]
    fn test_read_little_endian() {
        assert_eq!(ComponentType::U16.read(&[0x03, 0x00]), 3.0);
        assert_eq!(ComponentType::I8.read(&[0xFF]), -1.0);
        assert_eq!(ComponentType::F32.read(&1.5f32.to_le_bytes()), 1.5);
    }

    #[test]
    fn test_compute_bounds() {
        let values = [0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let (min, max) = compute_bounds(&values, 2);
        assert_eq!(min, vec![0.0, 0.0]);
        assert_eq!(max, vec![1.0, 1.0]);

        let (min, max) = compute_bounds(&[], 3);
        assert!(min.is_empty() && max.is_empty());
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(3), 4);
        assert_eq!(align4(12), 12);
        assert_eq!(align4(13), 16);
    }
}
