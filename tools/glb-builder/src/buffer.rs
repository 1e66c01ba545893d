//! Binary buffer packing with automatic alignment and accessor creation

use bytemuck::Pod;
use gltf_json as json;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type};
use gltf_json::buffer::Target;
use gltf_json::validation::Checked::Valid;

use crate::utils::{align_buffer, compute_bounds};

/// Accessor index returned by buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorIndex(pub u32);

impl AccessorIndex {
    pub fn as_json_index(&self) -> json::Index<json::Accessor> {
        json::Index::new(self.0)
    }
}

/// Buffer view index, used for embedded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewIndex(pub u32);

/// Builder for the single binary buffer of a fixture
#[derive(Debug, Default)]
pub struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn views(&self) -> &[json::buffer::View] {
        &self.views
    }

    pub fn accessors(&self) -> &[json::Accessor] {
        &self.accessors
    }

    pub fn accessor_count(&self) -> u32 {
        self.accessors.len() as u32
    }

    fn push_view(
        &mut self,
        bytes: &[u8],
        stride: Option<usize>,
        target: Option<Target>,
    ) -> ViewIndex {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        align_buffer(&mut self.buffer);

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: bytes.len().into(),
            byte_offset: Some((offset as u64).into()),
            byte_stride: stride.map(json::buffer::Stride),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });
        ViewIndex(self.views.len() as u32 - 1)
    }

    fn push_accessor(
        &mut self,
        view: ViewIndex,
        byte_offset: usize,
        count: usize,
        component: ComponentType,
        type_: Type,
        bounds: Option<(Vec<f64>, Vec<f64>)>,
    ) -> AccessorIndex {
        let to_json = |values: Vec<f64>| json::Value::from(values);
        let (min, max) = match bounds {
            Some((min, max)) => (Some(to_json(min)), Some(to_json(max))),
            None => (None, None),
        };

        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(view.0)),
            byte_offset: Some((byte_offset as u64).into()),
            count: count.into(),
            component_type: Valid(GenericComponentType(component)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });
        AccessorIndex(self.accessors.len() as u32 - 1)
    }

    /// Pack tightly laid out elements into their own view.
    fn pack<T, const N: usize>(
        &mut self,
        items: &[[T; N]],
        component: ComponentType,
        type_: Type,
        target: Option<Target>,
        bounded: bool,
    ) -> AccessorIndex
    where
        T: Pod + Into<f64>,
    {
        let view = self.push_view(bytemuck::cast_slice(items), None, target);
        let bounds = bounded.then(|| compute_bounds(items));
        self.push_accessor(view, 0, items.len(), component, type_, bounds)
    }

    /// Pack Vec3 positions with bounds
    pub fn pack_positions(&mut self, positions: &[[f32; 3]]) -> AccessorIndex {
        let target = Some(Target::ArrayBuffer);
        self.pack(positions, ComponentType::F32, Type::Vec3, target, true)
    }

    /// Pack Vec3 data (normals, translations, scales)
    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> AccessorIndex {
        self.pack(data, ComponentType::F32, Type::Vec3, None, false)
    }

    /// Pack Vec2 vertex data (UVs)
    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> AccessorIndex {
        let target = Some(Target::ArrayBuffer);
        self.pack(data, ComponentType::F32, Type::Vec2, target, false)
    }

    /// Pack Vec4 vertex data (weights, colors)
    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> AccessorIndex {
        let target = Some(Target::ArrayBuffer);
        self.pack(data, ComponentType::F32, Type::Vec4, target, false)
    }

    /// Pack joint indices (Vec4<u8>)
    pub fn pack_joints(&mut self, joints: &[[u8; 4]]) -> AccessorIndex {
        let target = Some(Target::ArrayBuffer);
        self.pack(joints, ComponentType::U8, Type::Vec4, target, false)
    }

    /// Pack u16 indices with bounds
    pub fn pack_indices_u16(&mut self, indices: &[u16]) -> AccessorIndex {
        let items: &[[u16; 1]] = bytemuck::cast_slice(indices);
        let target = Some(Target::ElementArrayBuffer);
        self.pack(items, ComponentType::U16, Type::Scalar, target, true)
    }

    /// Pack Mat4 data (inverse bind matrices)
    pub fn pack_mat4(&mut self, matrices: &[[f32; 16]]) -> AccessorIndex {
        self.pack(matrices, ComponentType::F32, Type::Mat4, None, false)
    }

    /// Pack scalar f32 data with bounds (animation times)
    pub fn pack_scalars(&mut self, scalars: &[f32]) -> AccessorIndex {
        let items: &[[f32; 1]] = bytemuck::cast_slice(scalars);
        self.pack(items, ComponentType::F32, Type::Scalar, None, true)
    }

    /// Pack positions and UVs into one view with a 20-byte stride.
    ///
    /// Returns the (positions, uvs) accessors.
    pub fn pack_interleaved(
        &mut self,
        positions: &[[f32; 3]],
        uvs: &[[f32; 2]],
    ) -> (AccessorIndex, AccessorIndex) {
        assert_eq!(positions.len(), uvs.len(), "interleaved streams differ in length");
        let mut bytes = Vec::with_capacity(positions.len() * 20);
        for (position, uv) in positions.iter().zip(uvs) {
            bytes.extend_from_slice(bytemuck::cast_slice(position));
            bytes.extend_from_slice(bytemuck::cast_slice(uv));
        }

        let view = self.push_view(&bytes, Some(20), Some(Target::ArrayBuffer));
        let bounds = Some(compute_bounds(positions));
        let count = positions.len();
        let positions = self.push_accessor(view, 0, count, ComponentType::F32, Type::Vec3, bounds);
        let uvs = self.push_accessor(view, 12, count, ComponentType::F32, Type::Vec2, None);
        (positions, uvs)
    }

    /// Embed encoded image bytes in a view of their own
    pub fn pack_image(&mut self, bytes: &[u8]) -> ViewIndex {
        self.push_view(bytes, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_are_aligned() {
        let mut buffer = BufferBuilder::new();
        buffer.pack_indices_u16(&[0, 1, 2]);
        buffer.pack_positions(&[[0.0; 3]; 3]);

        assert_eq!(buffer.data().len(), 8 + 36);
        let offsets: Vec<u64> = buffer
            .views()
            .iter()
            .map(|view| view.byte_offset.unwrap().0)
            .collect();
        assert_eq!(offsets, vec![0, 8]);
        assert_eq!(buffer.views()[0].byte_length.0, 6);
    }

    #[test]
    fn test_positions_carry_bounds() {
        let mut buffer = BufferBuilder::new();
        let positions = buffer.pack_positions(&[[0.0, 1.0, 2.0], [3.0, -1.0, 0.0]]);
        let accessor = &buffer.accessors()[positions.0 as usize];
        assert_eq!(accessor.count.0, 2);
        assert_eq!(accessor.min, Some(json::Value::from(vec![0.0, -1.0, 0.0])));
        assert_eq!(accessor.max, Some(json::Value::from(vec![3.0, 1.0, 2.0])));
    }

    #[test]
    fn test_interleaved_shares_one_view() {
        let mut buffer = BufferBuilder::new();
        let (positions, uvs) = buffer.pack_interleaved(&[[1.0, 2.0, 3.0]; 2], &[[0.5, 0.5]; 2]);

        assert_eq!(buffer.views().len(), 1);
        assert_eq!(buffer.views()[0].byte_stride.map(|stride| stride.0), Some(20));
        assert_eq!(buffer.data().len(), 40);
        let uv = &buffer.accessors()[uvs.0 as usize];
        assert_eq!(uv.byte_offset.unwrap().0, 12);
        assert_eq!(positions, AccessorIndex(0));
    }

    #[test]
    fn test_image_view_has_no_accessor() {
        let mut buffer = BufferBuilder::new();
        let view = buffer.pack_image(&[0x89, b'P', b'N', b'G', 1]);
        assert_eq!(view, ViewIndex(0));
        assert_eq!(buffer.accessor_count(), 0);
        assert_eq!(buffer.data().len(), 8);
    }
}
