//! In-memory scene document
//!
//! A [`Document`] exclusively owns every entity. Entities live in
//! creation-ordered slot maps and refer to each other by key; the document
//! keeps a reverse-reference index (target → referrers) so that
//! [`Document::dispose`] can clear every inbound reference before dropping an
//! entity. Reference fields are only mutated through document operations,
//! which keep that index exact.

mod entities;
mod ids;
mod pool;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use hashbrown::{HashMap, HashSet};
use serde_json::value::RawValue;

use crate::extensions::ExtensionMap;
use crate::types::{AccessorArray, AccessorType, ComponentType, align4, compute_bounds};

pub use entities::{
    Accessor, Animation, AnimationChannel, AnimationSampler, Asset, Buffer, Extras, Material,
    Mesh, Node, Primitive, Scene, Skin, Texture, TextureBinding,
};
pub use ids::{
    AccessorKey, AnimationKey, BufferKey, EntityId, MaterialKey, MeshKey, NodeKey, PrimitiveKey,
    SceneKey, SkinKey, TextureKey,
};

use pool::Pool;

/// Placement of an accessor's elements inside its buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AccessorLayout {
    pub byte_offset: usize,
    pub byte_stride: Option<usize>,
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    pub count: usize,
}

/// Number of live entities of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub buffers: usize,
    pub accessors: usize,
    pub primitives: usize,
    pub meshes: usize,
    pub nodes: usize,
    pub scenes: usize,
    pub materials: usize,
    pub textures: usize,
    pub skins: usize,
    pub animations: usize,
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buffers, {} accessors, {} primitives, {} meshes, {} nodes, {} scenes, \
             {} materials, {} textures, {} skins, {} animations",
            self.buffers,
            self.accessors,
            self.primitives,
            self.meshes,
            self.nodes,
            self.scenes,
            self.materials,
            self.textures,
            self.skins,
            self.animations
        )
    }
}

/// Root aggregate of a decoded scene.
#[derive(Debug, Clone)]
pub struct Document {
    pub asset: Asset,
    pub extras: Extras,
    /// Root-level extensions.
    pub extensions: ExtensionMap,
    /// Pass-through `samplers` array.
    pub samplers: Vec<Box<RawValue>>,
    /// Pass-through `cameras` array.
    pub cameras: Vec<Box<RawValue>>,
    /// Declared extensions that were never attached to a decoded entity, i.e.
    /// ones living inside opaque payloads such as material texture infos.
    pub(crate) nested_extensions: BTreeSet<String>,
    pub(crate) required_extensions: BTreeSet<String>,
    texture_bindings: Vec<TextureBinding>,
    default_scene: Option<SceneKey>,

    buffers: Pool<BufferKey, Buffer>,
    accessors: Pool<AccessorKey, Accessor>,
    primitives: Pool<PrimitiveKey, Primitive>,
    meshes: Pool<MeshKey, Mesh>,
    nodes: Pool<NodeKey, Node>,
    scenes: Pool<SceneKey, Scene>,
    materials: Pool<MaterialKey, Material>,
    textures: Pool<TextureKey, Texture>,
    skins: Pool<SkinKey, Skin>,
    animations: Pool<AnimationKey, Animation>,

    /// Target → every entity holding a reference to it.
    referrers: HashMap<EntityId, HashSet<EntityId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! entity_operations {
    ($($pool:ident: $key:ident => $ty:ident { $create:ident, $list:ident, $get:ident, $get_mut:ident }),* $(,)?) => {
        impl Document {
            $(
                #[doc = concat!("Create an empty [`", stringify!($ty), "`] owned by this document.")]
                pub fn $create(&mut self) -> $key {
                    self.$pool.insert($ty::default())
                }

                #[doc = concat!("Live [`", stringify!($ty), "`] keys in creation order.")]
                pub fn $list(&self) -> &[$key] {
                    self.$pool.keys()
                }

                pub fn $get(&self, key: $key) -> Option<&$ty> {
                    self.$pool.get(key)
                }

                pub fn $get_mut(&mut self, key: $key) -> Option<&mut $ty> {
                    self.$pool.get_mut(key)
                }
            )*
        }
    };
}

entity_operations! {
    buffers: BufferKey => Buffer { create_buffer, list_buffers, buffer, buffer_mut },
    accessors: AccessorKey => Accessor { create_accessor, list_accessors, accessor, accessor_mut },
    primitives: PrimitiveKey => Primitive { create_primitive, list_primitives, primitive, primitive_mut },
    meshes: MeshKey => Mesh { create_mesh, list_meshes, mesh, mesh_mut },
    nodes: NodeKey => Node { create_node, list_nodes, node, node_mut },
    scenes: SceneKey => Scene { create_scene, list_scenes, scene, scene_mut },
    materials: MaterialKey => Material { create_material, list_materials, material, material_mut },
    textures: TextureKey => Texture { create_texture, list_textures, texture, texture_mut },
    skins: SkinKey => Skin { create_skin, list_skins, skin, skin_mut },
    animations: AnimationKey => Animation { create_animation, list_animations, animation, animation_mut },
}

impl Document {
    pub fn new() -> Self {
        Self {
            asset: Asset::default(),
            extras: None,
            extensions: ExtensionMap::new(),
            samplers: Vec::new(),
            cameras: Vec::new(),
            nested_extensions: BTreeSet::new(),
            required_extensions: BTreeSet::new(),
            texture_bindings: Vec::new(),
            default_scene: None,
            buffers: Pool::new(),
            accessors: Pool::new(),
            primitives: Pool::new(),
            meshes: Pool::new(),
            nodes: Pool::new(),
            scenes: Pool::new(),
            materials: Pool::new(),
            textures: Pool::new(),
            skins: Pool::new(),
            animations: Pool::new(),
            referrers: HashMap::new(),
        }
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            buffers: self.buffers.len(),
            accessors: self.accessors.len(),
            primitives: self.primitives.len(),
            meshes: self.meshes.len(),
            nodes: self.nodes.len(),
            scenes: self.scenes.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
            skins: self.skins.len(),
            animations: self.animations.len(),
        }
    }

    pub fn contains(&self, id: impl Into<EntityId>) -> bool {
        match id.into() {
            EntityId::Buffer(k) => self.buffers.contains(k),
            EntityId::Accessor(k) => self.accessors.contains(k),
            EntityId::Primitive(k) => self.primitives.contains(k),
            EntityId::Mesh(k) => self.meshes.contains(k),
            EntityId::Node(k) => self.nodes.contains(k),
            EntityId::Scene(k) => self.scenes.contains(k),
            EntityId::Material(k) => self.materials.contains(k),
            EntityId::Texture(k) => self.textures.contains(k),
            EntityId::Skin(k) => self.skins.contains(k),
            EntityId::Animation(k) => self.animations.contains(k),
        }
    }

    pub fn default_scene(&self) -> Option<SceneKey> {
        self.default_scene
    }

    pub fn set_default_scene(&mut self, scene: Option<SceneKey>) -> bool {
        if scene.is_some_and(|s| !self.scenes.contains(s)) {
            return false;
        }
        self.default_scene = scene;
        true
    }

    pub fn texture_bindings(&self) -> &[TextureBinding] {
        &self.texture_bindings
    }

    /// Append a texture binding and return its index. A stale source is dropped.
    pub fn add_texture_binding(&mut self, mut binding: TextureBinding) -> usize {
        if binding.source.is_some_and(|t| !self.textures.contains(t)) {
            binding.source = None;
        }
        self.texture_bindings.push(binding);
        self.texture_bindings.len() - 1
    }

    /// Entities currently holding a reference to `target`.
    pub fn referrers(&self, target: impl Into<EntityId>) -> Vec<EntityId> {
        self.referrers
            .get(&target.into())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Reference operations
    // ========================================================================

    /// Re-point an accessor at another buffer, keeping its offset and layout.
    ///
    /// `None` detaches it; its elements then read as zeros.
    pub fn set_accessor_buffer(&mut self, accessor: AccessorKey, buffer: Option<BufferKey>) -> bool {
        if !self.accessors.contains(accessor) || buffer.is_some_and(|b| !self.buffers.contains(b)) {
            return false;
        }
        self.relink(accessor.into(), |doc| {
            if let Some(a) = doc.accessors.get_mut(accessor) {
                a.buffer = buffer;
            }
        });
        true
    }

    /// Set or clear one attribute of a primitive.
    pub fn set_attribute(
        &mut self,
        primitive: PrimitiveKey,
        semantic: &str,
        accessor: Option<AccessorKey>,
    ) -> bool {
        if !self.primitives.contains(primitive)
            || accessor.is_some_and(|a| !self.accessors.contains(a))
        {
            return false;
        }
        self.relink(primitive.into(), |doc| {
            if let Some(p) = doc.primitives.get_mut(primitive) {
                match accessor {
                    Some(a) => p.attributes.insert(semantic.to_string(), a),
                    None => p.attributes.remove(semantic),
                };
            }
        });
        true
    }

    pub fn set_indices(&mut self, primitive: PrimitiveKey, accessor: Option<AccessorKey>) -> bool {
        if !self.primitives.contains(primitive)
            || accessor.is_some_and(|a| !self.accessors.contains(a))
        {
            return false;
        }
        self.relink(primitive.into(), |doc| {
            if let Some(p) = doc.primitives.get_mut(primitive) {
                p.indices = accessor;
            }
        });
        true
    }

    pub fn set_material(&mut self, primitive: PrimitiveKey, material: Option<MaterialKey>) -> bool {
        if !self.primitives.contains(primitive)
            || material.is_some_and(|m| !self.materials.contains(m))
        {
            return false;
        }
        self.relink(primitive.into(), |doc| {
            if let Some(p) = doc.primitives.get_mut(primitive) {
                p.material = material;
            }
        });
        true
    }

    /// Append a morph target. Stale accessors are skipped.
    pub fn add_target(
        &mut self,
        primitive: PrimitiveKey,
        target: BTreeMap<String, AccessorKey>,
    ) -> bool {
        if !self.primitives.contains(primitive) {
            return false;
        }
        let target: BTreeMap<_, _> = target
            .into_iter()
            .filter(|(_, a)| self.accessors.contains(*a))
            .collect();
        self.relink(primitive.into(), |doc| {
            if let Some(p) = doc.primitives.get_mut(primitive) {
                p.targets.push(target);
            }
        });
        true
    }

    pub fn add_primitive(&mut self, mesh: MeshKey, primitive: PrimitiveKey) -> bool {
        if !self.meshes.contains(mesh) || !self.primitives.contains(primitive) {
            return false;
        }
        self.relink(mesh.into(), |doc| {
            if let Some(m) = doc.meshes.get_mut(mesh) {
                m.primitives.push(primitive);
            }
        });
        true
    }

    pub fn remove_primitive(&mut self, mesh: MeshKey, primitive: PrimitiveKey) -> bool {
        if !self.meshes.contains(mesh) {
            return false;
        }
        self.relink(mesh.into(), |doc| {
            if let Some(m) = doc.meshes.get_mut(mesh) {
                m.primitives.retain(|p| *p != primitive);
            }
        });
        true
    }

    pub fn set_mesh(&mut self, node: NodeKey, mesh: Option<MeshKey>) -> bool {
        if !self.nodes.contains(node) || mesh.is_some_and(|m| !self.meshes.contains(m)) {
            return false;
        }
        self.relink(node.into(), |doc| {
            if let Some(n) = doc.nodes.get_mut(node) {
                n.mesh = mesh;
            }
        });
        true
    }

    pub fn set_skin(&mut self, node: NodeKey, skin: Option<SkinKey>) -> bool {
        if !self.nodes.contains(node) || skin.is_some_and(|s| !self.skins.contains(s)) {
            return false;
        }
        self.relink(node.into(), |doc| {
            if let Some(n) = doc.nodes.get_mut(node) {
                n.skin = skin;
            }
        });
        true
    }

    /// Parent of a node, if any.
    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.referrers.get(&EntityId::Node(node))?.iter().find_map(|id| match id {
            EntityId::Node(parent)
                if self
                    .nodes
                    .get(*parent)
                    .is_some_and(|p| p.children.contains(&node)) =>
            {
                Some(*parent)
            }
            _ => None,
        })
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent.
    ///
    /// Refuses to create a cycle.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        if !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return false;
        }
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return false;
            }
            ancestor = self.parent(node);
        }

        if let Some(previous) = self.parent(child) {
            self.relink(previous.into(), |doc| {
                if let Some(p) = doc.nodes.get_mut(previous) {
                    p.children.retain(|c| *c != child);
                }
            });
        }
        self.relink(parent.into(), |doc| {
            if let Some(p) = doc.nodes.get_mut(parent) {
                p.children.push(child);
            }
        });
        true
    }

    /// Append a root node to a scene.
    pub fn add_root(&mut self, scene: SceneKey, node: NodeKey) -> bool {
        if !self.scenes.contains(scene) || !self.nodes.contains(node) {
            return false;
        }
        self.relink(scene.into(), |doc| {
            if let Some(s) = doc.scenes.get_mut(scene) {
                if !s.nodes.contains(&node) {
                    s.nodes.push(node);
                }
            }
        });
        true
    }

    pub fn add_joint(&mut self, skin: SkinKey, node: NodeKey) -> bool {
        if !self.skins.contains(skin) || !self.nodes.contains(node) {
            return false;
        }
        self.relink(skin.into(), |doc| {
            if let Some(s) = doc.skins.get_mut(skin) {
                s.joints.push(node);
            }
        });
        true
    }

    pub fn set_skeleton(&mut self, skin: SkinKey, node: Option<NodeKey>) -> bool {
        if !self.skins.contains(skin) || node.is_some_and(|n| !self.nodes.contains(n)) {
            return false;
        }
        self.relink(skin.into(), |doc| {
            if let Some(s) = doc.skins.get_mut(skin) {
                s.skeleton = node;
            }
        });
        true
    }

    pub fn set_inverse_bind_matrices(
        &mut self,
        skin: SkinKey,
        accessor: Option<AccessorKey>,
    ) -> bool {
        if !self.skins.contains(skin) || accessor.is_some_and(|a| !self.accessors.contains(a)) {
            return false;
        }
        self.relink(skin.into(), |doc| {
            if let Some(s) = doc.skins.get_mut(skin) {
                s.inverse_bind_matrices = accessor;
            }
        });
        true
    }

    /// Append a sampler and return its index within the animation.
    pub fn add_sampler(
        &mut self,
        animation: AnimationKey,
        input: Option<AccessorKey>,
        output: Option<AccessorKey>,
        interpolation: Option<String>,
    ) -> Option<usize> {
        if !self.animations.contains(animation) {
            return None;
        }
        let input = input.filter(|a| self.accessors.contains(*a));
        let output = output.filter(|a| self.accessors.contains(*a));
        self.relink(animation.into(), |doc| {
            let a = doc.animations.get_mut(animation)?;
            a.samplers.push(AnimationSampler {
                input,
                output,
                interpolation,
                ..AnimationSampler::default()
            });
            Some(a.samplers.len() - 1)
        })
    }

    /// Append a channel driving `path` of `node` from sampler `sampler`.
    pub fn add_channel(
        &mut self,
        animation: AnimationKey,
        sampler: usize,
        node: Option<NodeKey>,
        path: &str,
    ) -> Option<usize> {
        let samplers = self.animations.get(animation)?.samplers.len();
        if sampler >= samplers || node.is_some_and(|n| !self.nodes.contains(n)) {
            return None;
        }
        self.relink(animation.into(), |doc| {
            let a = doc.animations.get_mut(animation)?;
            a.channels.push(AnimationChannel {
                sampler,
                node,
                path: path.to_string(),
                ..AnimationChannel::default()
            });
            Some(a.channels.len() - 1)
        })
    }

    // ========================================================================
    // Accessor data
    // ========================================================================

    /// Append `array` to `buffer` (4-byte aligned) and point `accessor` at it.
    ///
    /// `stride`, when larger than the element size, pads every element to that
    /// many bytes. Bounds are not recomputed; see [`Self::update_bounds`].
    pub fn set_accessor_array(
        &mut self,
        accessor: AccessorKey,
        buffer: BufferKey,
        accessor_type: AccessorType,
        array: &AccessorArray,
        stride: Option<usize>,
    ) -> bool {
        if !self.accessors.contains(accessor) || !self.buffers.contains(buffer) {
            return false;
        }
        let component_type = array.component_type();
        let components = accessor_type.components();
        if array.len() % components != 0 {
            return false;
        }
        let count = array.len() / components;
        let element_size = accessor_type.element_size(component_type);
        if stride.is_some_and(|s| s < element_size || s % 4 != 0) {
            return false;
        }
        let byte_stride = stride.filter(|&s| s != element_size);
        let effective = byte_stride.unwrap_or(element_size);
        let offsets = accessor_type.component_offsets(component_type);

        let Some(target) = self.buffers.get_mut(buffer) else {
            return false;
        };
        let byte_offset = align4(target.data.len());
        target.data.resize(byte_offset + count * effective, 0);
        for element in 0..count {
            let base = byte_offset + element * effective;
            for (component, offset) in offsets.iter().enumerate() {
                let bytes = array.component_bytes(element * components + component);
                let start = base + offset;
                target.data[start..start + bytes.len()].copy_from_slice(&bytes);
            }
        }

        self.attach_accessor(
            accessor,
            Some(buffer),
            AccessorLayout {
                byte_offset,
                byte_stride,
                component_type,
                accessor_type,
                count,
            },
        );
        true
    }

    /// Point an accessor at bytes that already sit in `buffer`.
    pub(crate) fn attach_accessor(
        &mut self,
        accessor: AccessorKey,
        buffer: Option<BufferKey>,
        layout: AccessorLayout,
    ) {
        let buffer = buffer.filter(|b| self.buffers.contains(*b));
        self.relink(accessor.into(), |doc| {
            if let Some(a) = doc.accessors.get_mut(accessor) {
                a.buffer = buffer;
                a.byte_offset = layout.byte_offset;
                a.byte_stride = layout.byte_stride;
                a.component_type = layout.component_type;
                a.accessor_type = layout.accessor_type;
                a.count = layout.count;
            }
        });
    }

    pub(crate) fn buffer_data_mut(&mut self, buffer: BufferKey) -> Option<&mut Vec<u8>> {
        self.buffers.get_mut(buffer).map(|b| &mut b.data)
    }

    /// Element components as `f64`, element-major. Buffer-less accessors read as zeros.
    pub fn read_accessor(&self, accessor: AccessorKey) -> Option<Vec<f64>> {
        let a = self.accessors.get(accessor)?;
        let components = a.accessor_type.components();
        let Some(buffer) = a.buffer.and_then(|b| self.buffers.get(b)) else {
            return Some(vec![0.0; a.count * components]);
        };

        let size = a.component_type.size();
        let stride = a.effective_stride();
        let offsets = a.accessor_type.component_offsets(a.component_type);
        let mut values = Vec::with_capacity(a.count * components);
        for element in 0..a.count {
            let base = a.byte_offset + element * stride;
            for offset in &offsets {
                let start = base + offset;
                let bytes = buffer.data.get(start..start + size)?;
                values.push(a.component_type.read(bytes));
            }
        }
        Some(values)
    }

    /// Recompute min/max from the accessor's current elements.
    pub fn update_bounds(&mut self, accessor: AccessorKey) -> bool {
        let Some(values) = self.read_accessor(accessor) else {
            return false;
        };
        let Some(a) = self.accessors.get_mut(accessor) else {
            return false;
        };
        let (min, max) = compute_bounds(&values, a.accessor_type.components());
        a.min = Some(min);
        a.max = Some(max);
        true
    }

    // ========================================================================
    // Disposal
    // ========================================================================

    /// Remove an entity, first clearing every reference other entities hold to it.
    ///
    /// Disposing a mesh also disposes its primitives. Disposing an entity that
    /// is already gone does nothing.
    pub fn dispose(&mut self, id: impl Into<EntityId>) {
        let id = id.into();
        if !self.contains(id) {
            tracing::trace!(?id, "dispose of stale entity ignored");
            return;
        }

        if let EntityId::Mesh(mesh) = id {
            let owned = self
                .meshes
                .get(mesh)
                .map(|m| m.primitives.clone())
                .unwrap_or_default();
            for primitive in owned {
                self.dispose(primitive);
            }
        }

        let inbound = self.referrers.remove(&id).unwrap_or_default();
        tracing::trace!(?id, referrers = inbound.len(), "disposing");
        for referrer in inbound {
            self.unlink(referrer, id);
        }

        match id {
            EntityId::Scene(scene) if self.default_scene == Some(scene) => {
                self.default_scene = None;
            }
            EntityId::Texture(texture) => {
                for binding in &mut self.texture_bindings {
                    if binding.source == Some(texture) {
                        binding.source = None;
                    }
                }
            }
            _ => {}
        }

        for target in self.outbound(id) {
            if let Some(set) = self.referrers.get_mut(&target) {
                set.remove(&id);
            }
        }

        self.remove(id);
    }

    /// Every (referrer, target) pair whose target is no longer owned.
    pub fn dangling_references(&self) -> Vec<(EntityId, EntityId)> {
        self.entity_ids()
            .into_iter()
            .flat_map(|id| {
                self.outbound(id)
                    .into_iter()
                    .filter(|target| !self.contains(*target))
                    .map(move |target| (id, target))
            })
            .collect()
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids = Vec::new();
        ids.extend(self.buffers.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.accessors.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.primitives.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.meshes.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.nodes.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.scenes.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.materials.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.textures.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.skins.keys().iter().map(|&k| EntityId::from(k)));
        ids.extend(self.animations.keys().iter().map(|&k| EntityId::from(k)));
        ids
    }

    /// Entities referenced by `id`.
    fn outbound(&self, id: EntityId) -> HashSet<EntityId> {
        let mut out = HashSet::new();
        match id {
            EntityId::Accessor(k) => {
                if let Some(a) = self.accessors.get(k) {
                    out.extend(a.buffer.map(EntityId::from));
                }
            }
            EntityId::Primitive(k) => {
                if let Some(p) = self.primitives.get(k) {
                    out.extend(p.attributes.values().map(|&a| EntityId::from(a)));
                    out.extend(p.indices.map(EntityId::from));
                    out.extend(p.material.map(EntityId::from));
                    for target in &p.targets {
                        out.extend(target.values().map(|&a| EntityId::from(a)));
                    }
                }
            }
            EntityId::Mesh(k) => {
                if let Some(m) = self.meshes.get(k) {
                    out.extend(m.primitives.iter().map(|&p| EntityId::from(p)));
                }
            }
            EntityId::Node(k) => {
                if let Some(n) = self.nodes.get(k) {
                    out.extend(n.mesh.map(EntityId::from));
                    out.extend(n.skin.map(EntityId::from));
                    out.extend(n.children.iter().map(|&c| EntityId::from(c)));
                }
            }
            EntityId::Scene(k) => {
                if let Some(s) = self.scenes.get(k) {
                    out.extend(s.nodes.iter().map(|&n| EntityId::from(n)));
                }
            }
            EntityId::Skin(k) => {
                if let Some(s) = self.skins.get(k) {
                    out.extend(s.joints.iter().map(|&n| EntityId::from(n)));
                    out.extend(s.skeleton.map(EntityId::from));
                    out.extend(s.inverse_bind_matrices.map(EntityId::from));
                }
            }
            EntityId::Animation(k) => {
                if let Some(a) = self.animations.get(k) {
                    for sampler in &a.samplers {
                        out.extend(sampler.input.map(EntityId::from));
                        out.extend(sampler.output.map(EntityId::from));
                    }
                    out.extend(a.channels.iter().filter_map(|c| c.node).map(EntityId::from));
                }
            }
            EntityId::Buffer(_) | EntityId::Material(_) | EntityId::Texture(_) => {}
        }
        out
    }

    /// Apply `mutate`, then bring the reverse index for `referrer` up to date.
    fn relink<R>(&mut self, referrer: EntityId, mutate: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.outbound(referrer);
        let result = mutate(self);
        let after = self.outbound(referrer);

        for target in before.difference(&after) {
            if let Some(set) = self.referrers.get_mut(target) {
                set.remove(&referrer);
            }
        }
        for target in after {
            self.referrers.entry(target).or_default().insert(referrer);
        }
        result
    }

    /// Drop every reference `referrer` holds to `target`.
    fn unlink(&mut self, referrer: EntityId, target: EntityId) {
        match referrer {
            EntityId::Accessor(k) => {
                if let (Some(a), EntityId::Buffer(buffer)) = (self.accessors.get_mut(k), target) {
                    if a.buffer == Some(buffer) {
                        a.buffer = None;
                        a.byte_offset = 0;
                        a.byte_stride = None;
                    }
                }
            }
            EntityId::Primitive(k) => {
                let Some(p) = self.primitives.get_mut(k) else {
                    return;
                };
                match target {
                    EntityId::Accessor(accessor) => {
                        p.attributes.retain(|_, a| *a != accessor);
                        if p.indices == Some(accessor) {
                            p.indices = None;
                        }
                        for morph in &mut p.targets {
                            morph.retain(|_, a| *a != accessor);
                        }
                    }
                    EntityId::Material(material) if p.material == Some(material) => {
                        p.material = None;
                    }
                    _ => {}
                }
            }
            EntityId::Mesh(k) => {
                if let (Some(m), EntityId::Primitive(primitive)) = (self.meshes.get_mut(k), target) {
                    m.primitives.retain(|p| *p != primitive);
                }
            }
            EntityId::Node(k) => {
                let Some(n) = self.nodes.get_mut(k) else {
                    return;
                };
                match target {
                    EntityId::Mesh(mesh) if n.mesh == Some(mesh) => n.mesh = None,
                    EntityId::Skin(skin) if n.skin == Some(skin) => n.skin = None,
                    EntityId::Node(child) => n.children.retain(|c| *c != child),
                    _ => {}
                }
            }
            EntityId::Scene(k) => {
                if let (Some(s), EntityId::Node(node)) = (self.scenes.get_mut(k), target) {
                    s.nodes.retain(|n| *n != node);
                }
            }
            EntityId::Skin(k) => {
                let Some(s) = self.skins.get_mut(k) else {
                    return;
                };
                match target {
                    EntityId::Node(node) => {
                        s.joints.retain(|j| *j != node);
                        if s.skeleton == Some(node) {
                            s.skeleton = None;
                        }
                    }
                    EntityId::Accessor(accessor) if s.inverse_bind_matrices == Some(accessor) => {
                        s.inverse_bind_matrices = None;
                    }
                    _ => {}
                }
            }
            EntityId::Animation(k) => {
                let Some(a) = self.animations.get_mut(k) else {
                    return;
                };
                match target {
                    EntityId::Accessor(accessor) => {
                        for sampler in &mut a.samplers {
                            if sampler.input == Some(accessor) {
                                sampler.input = None;
                            }
                            if sampler.output == Some(accessor) {
                                sampler.output = None;
                            }
                        }
                    }
                    EntityId::Node(node) => {
                        for channel in &mut a.channels {
                            if channel.node == Some(node) {
                                channel.node = None;
                            }
                        }
                    }
                    _ => {}
                }
            }
            EntityId::Buffer(_) | EntityId::Material(_) | EntityId::Texture(_) => {}
        }
    }

    fn remove(&mut self, id: EntityId) {
        match id {
            EntityId::Buffer(k) => drop(self.buffers.remove(k)),
            EntityId::Accessor(k) => drop(self.accessors.remove(k)),
            EntityId::Primitive(k) => drop(self.primitives.remove(k)),
            EntityId::Mesh(k) => drop(self.meshes.remove(k)),
            EntityId::Node(k) => drop(self.nodes.remove(k)),
            EntityId::Scene(k) => drop(self.scenes.remove(k)),
            EntityId::Material(k) => drop(self.materials.remove(k)),
            EntityId::Texture(k) => drop(self.textures.remove(k)),
            EntityId::Skin(k) => drop(self.skins.remove(k)),
            EntityId::Animation(k) => drop(self.animations.remove(k)),
        }
    }
}
