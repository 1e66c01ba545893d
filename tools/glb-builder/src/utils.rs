//! Alignment, bounds and GLB framing helpers

use serde_json::Value;

/// Per-component min/max of a list of elements
pub fn compute_bounds<T, const N: usize>(items: &[[T; N]]) -> (Vec<f64>, Vec<f64>)
where
    T: Copy + Into<f64>,
{
    let mut min = [f64::MAX; N];
    let mut max = [f64::MIN; N];

    for item in items {
        for (i, value) in item.iter().enumerate() {
            let value: f64 = (*value).into();
            min[i] = min[i].min(value);
            max[i] = max[i].max(value);
        }
    }

    (min.to_vec(), max.to_vec())
}

/// Pad a buffer with zeros to a 4-byte boundary
pub fn align_buffer(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

/// Frame a JSON document and binary payload as a GLB file.
///
/// The BIN chunk is written even when `buffer_data` is empty.
pub fn assemble_glb(root: &Value, buffer_data: &[u8]) -> Vec<u8> {
    let json_string = serde_json::to_string(root).expect("Failed to serialize GLTF JSON");
    let json_bytes = json_string.as_bytes();

    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;
    let mut glb = Vec::with_capacity(total_length);

    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.resize(glb.len() + json_padding, b' ');

    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(buffer_data);
    glb.resize(glb.len() + buffer_padding, 0);

    glb
}
