//! Vertex stream construction for one primitive

use crate::buffer::{AccessorIndex, BufferBuilder};

/// Accessor indices for a primitive
#[derive(Debug, Clone)]
pub struct MeshAccessors {
    pub positions: AccessorIndex,
    pub normals: Option<AccessorIndex>,
    pub uvs: Option<AccessorIndex>,
    pub joints: Option<AccessorIndex>,
    pub weights: Option<AccessorIndex>,
    pub indices: Option<AccessorIndex>,
}

/// Builder for primitive vertex data
#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    uvs: Option<Vec<[f32; 2]>>,
    interleave: bool,
    joints: Option<Vec<[u8; 4]>>,
    weights: Option<Vec<[f32; 4]>>,
    indices: Option<Vec<u16>>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set positions (required)
    pub fn positions(mut self, positions: &[[f32; 3]]) -> Self {
        self.positions = positions.to_vec();
        self
    }

    pub fn normals(mut self, normals: &[[f32; 3]]) -> Self {
        self.normals = Some(normals.to_vec());
        self
    }

    pub fn uvs(mut self, uvs: &[[f32; 2]]) -> Self {
        self.uvs = Some(uvs.to_vec());
        self
    }

    /// Store positions and UVs in one strided view
    pub fn interleaved(mut self) -> Self {
        self.interleave = true;
        self
    }

    /// Joint indices and weights for skinned primitives
    pub fn skinned(mut self, joints: &[[u8; 4]], weights: &[[f32; 4]]) -> Self {
        self.joints = Some(joints.to_vec());
        self.weights = Some(weights.to_vec());
        self
    }

    pub fn indices(mut self, indices: &[u16]) -> Self {
        self.indices = Some(indices.to_vec());
        self
    }

    /// Pack every stream into the buffer
    pub fn build(self, buffer: &mut BufferBuilder) -> MeshAccessors {
        let (positions, uvs) = match (&self.uvs, self.interleave) {
            (Some(uvs), true) => {
                let (positions, uvs) = buffer.pack_interleaved(&self.positions, uvs);
                (positions, Some(uvs))
            }
            (uvs, _) => (
                buffer.pack_positions(&self.positions),
                uvs.as_ref().map(|uv| buffer.pack_vec2(uv)),
            ),
        };
        let normals = self.normals.as_ref().map(|n| buffer.pack_vec3(n));
        let joints = self.joints.as_ref().map(|j| buffer.pack_joints(j));
        let weights = self.weights.as_ref().map(|w| buffer.pack_vec4(w));
        let indices = self.indices.as_ref().map(|i| buffer.pack_indices_u16(i));

        MeshAccessors {
            positions,
            normals,
            uvs,
            joints,
            weights,
            indices,
        }
    }
}
