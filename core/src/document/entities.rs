//! Entity payloads
//!
//! Reference fields are crate-private: they change only through
//! [`Document`](super::Document) operations, which keep the reverse-reference
//! index in step.

use std::collections::BTreeMap;

use serde_json::value::RawValue;

use super::ids::{AccessorKey, BufferKey, MaterialKey, MeshKey, NodeKey, PrimitiveKey, SkinKey, TextureKey};
use crate::extensions::ExtensionMap;
use crate::types::{AccessorType, ComponentType, MODE_TRIANGLES};

/// Application-specific data, kept as exact JSON text.
pub type Extras = Option<Box<RawValue>>;

/// Document-level `asset` metadata.
#[derive(Debug, Clone, Default)]
pub struct Asset {
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub min_version: Option<String>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub name: Option<String>,
    pub(crate) data: Vec<u8>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Buffer {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_length(&self) -> usize {
        self.data.len()
    }
}

/// A typed view over a region of one buffer.
#[derive(Debug, Clone)]
pub struct Accessor {
    pub name: Option<String>,
    pub(crate) buffer: Option<BufferKey>,
    pub(crate) byte_offset: usize,
    pub(crate) byte_stride: Option<usize>,
    pub(crate) component_type: ComponentType,
    pub(crate) accessor_type: AccessorType,
    pub(crate) count: usize,
    pub normalized: bool,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Default for Accessor {
    fn default() -> Self {
        Self {
            name: None,
            buffer: None,
            byte_offset: 0,
            byte_stride: None,
            component_type: ComponentType::F32,
            accessor_type: AccessorType::Scalar,
            count: 0,
            normalized: false,
            min: None,
            max: None,
            extras: None,
            extensions: ExtensionMap::new(),
        }
    }
}

impl Accessor {
    /// Backing buffer; `None` means the elements are implicitly zero.
    pub fn buffer(&self) -> Option<BufferKey> {
        self.buffer
    }

    /// Offset of the first element within the buffer.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Explicit element stride, `None` when tightly packed.
    pub fn byte_stride(&self) -> Option<usize> {
        self.byte_stride
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn accessor_type(&self) -> AccessorType {
        self.accessor_type
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element_size(&self) -> usize {
        self.accessor_type.element_size(self.component_type)
    }

    /// Distance between the starts of consecutive elements.
    pub fn effective_stride(&self) -> usize {
        self.byte_stride.unwrap_or_else(|| self.element_size())
    }

    /// Bytes from the first element's start to the last element's end.
    pub fn byte_span(&self) -> usize {
        match self.count {
            0 => 0,
            n => (n - 1) * self.effective_stride() + self.element_size(),
        }
    }
}

/// One drawable unit.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub(crate) attributes: BTreeMap<String, AccessorKey>,
    pub(crate) indices: Option<AccessorKey>,
    pub(crate) material: Option<MaterialKey>,
    pub(crate) targets: Vec<BTreeMap<String, AccessorKey>>,
    pub mode: u32,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Default for Primitive {
    fn default() -> Self {
        Self {
            attributes: BTreeMap::new(),
            indices: None,
            material: None,
            targets: Vec::new(),
            mode: MODE_TRIANGLES,
            extras: None,
            extensions: ExtensionMap::new(),
        }
    }
}

impl Primitive {
    pub fn attributes(&self) -> &BTreeMap<String, AccessorKey> {
        &self.attributes
    }

    pub fn attribute(&self, semantic: &str) -> Option<AccessorKey> {
        self.attributes.get(semantic).copied()
    }

    pub fn indices(&self) -> Option<AccessorKey> {
        self.indices
    }

    pub fn material(&self) -> Option<MaterialKey> {
        self.material
    }

    /// Morph targets.
    pub fn targets(&self) -> &[BTreeMap<String, AccessorKey>] {
        &self.targets
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub(crate) primitives: Vec<PrimitiveKey>,
    pub weights: Option<Vec<f64>>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Mesh {
    pub fn primitives(&self) -> &[PrimitiveKey] {
        &self.primitives
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,
    pub(crate) mesh: Option<MeshKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) skin: Option<SkinKey>,
    /// Index into the pass-through camera list.
    pub camera: Option<u32>,
    pub translation: Option<[f64; 3]>,
    pub rotation: Option<[f64; 4]>,
    pub scale: Option<[f64; 3]>,
    pub matrix: Option<[f64; 16]>,
    pub weights: Option<Vec<f64>>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Node {
    pub fn mesh(&self) -> Option<MeshKey> {
        self.mesh
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn skin(&self) -> Option<SkinKey> {
        self.skin
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub(crate) nodes: Vec<NodeKey>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Scene {
    /// Root nodes.
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }
}

/// A material. Everything except name, extras and extensions is kept as the
/// exact JSON text it was decoded from (texture references inside point at
/// texture bindings, which are never renumbered).
#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: Option<String>,
    pub properties: BTreeMap<String, Box<RawValue>>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

/// Image data. Owns its bytes, so it survives disposal of every buffer.
#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    /// Embedded image bytes; empty when the image is referenced by `uri`.
    pub data: Vec<u8>,
    pub uri: Option<String>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

/// A glTF `textures` entry: an image paired with a sampler.
#[derive(Debug, Clone, Default)]
pub struct TextureBinding {
    pub name: Option<String>,
    /// Index into the pass-through sampler list.
    pub sampler: Option<u32>,
    pub(crate) source: Option<TextureKey>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl TextureBinding {
    pub fn new(source: Option<TextureKey>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<TextureKey> {
        self.source
    }
}

#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: Option<String>,
    pub(crate) joints: Vec<NodeKey>,
    pub(crate) skeleton: Option<NodeKey>,
    pub(crate) inverse_bind_matrices: Option<AccessorKey>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Skin {
    pub fn joints(&self) -> &[NodeKey] {
        &self.joints
    }

    pub fn skeleton(&self) -> Option<NodeKey> {
        self.skeleton
    }

    pub fn inverse_bind_matrices(&self) -> Option<AccessorKey> {
        self.inverse_bind_matrices
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationSampler {
    pub(crate) input: Option<AccessorKey>,
    pub(crate) output: Option<AccessorKey>,
    pub interpolation: Option<String>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl AnimationSampler {
    pub fn input(&self) -> Option<AccessorKey> {
        self.input
    }

    pub fn output(&self) -> Option<AccessorKey> {
        self.output
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationChannel {
    pub(crate) sampler: usize,
    pub(crate) node: Option<NodeKey>,
    /// Animated property: `translation`, `rotation`, `scale` or `weights`.
    pub path: String,
    pub extras: Extras,
    pub extensions: ExtensionMap,
    pub target_extras: Extras,
    pub target_extensions: ExtensionMap,
}

impl AnimationChannel {
    pub fn sampler(&self) -> usize {
        self.sampler
    }

    pub fn node(&self) -> Option<NodeKey> {
        self.node
    }
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: Option<String>,
    pub(crate) channels: Vec<AnimationChannel>,
    pub(crate) samplers: Vec<AnimationSampler>,
    pub extras: Extras,
    pub extensions: ExtensionMap,
}

impl Animation {
    pub fn channels(&self) -> &[AnimationChannel] {
        &self.channels
    }

    pub fn samplers(&self) -> &[AnimationSampler] {
        &self.samplers
    }
}
