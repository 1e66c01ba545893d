//! GLB decoding
//!
//! Decoding is all-or-nothing: the document is only handed back once every
//! chunk, index and byte range has been validated.

use std::borrow::Cow;
use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use super::header::{CHUNK_BIN, CHUNK_JSON, ChunkHeader, GlbHeader, MAGIC, VERSION};
use super::schema;
use crate::document::{
    AccessorKey, AccessorLayout, Asset, BufferKey, Document, MaterialKey, MeshKey, NodeKey,
    SkinKey, TextureBinding, TextureKey,
};
use crate::error::{FormatError, Result};
use crate::extensions::{ExtensionMap, ExtensionRegistry, ExtensionTarget, RawExtensions};
use crate::types::{MODE_TRIANGLES, align4};

/// Payloads of a GLB container with JSON padding removed.
#[derive(Debug)]
pub(crate) struct Chunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Validate the container framing and locate the JSON and BIN payloads.
pub(crate) fn split_chunks(bytes: &[u8]) -> Result<Chunks<'_>> {
    let Some(header) = GlbHeader::from_bytes(bytes) else {
        if let Some(magic) = bytes.get(..4) {
            let found = u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]);
            if found != MAGIC {
                return Err(FormatError::BadMagic { found });
            }
        }
        return Err(FormatError::Truncated {
            offset: 0,
            needed: GlbHeader::SIZE,
            available: bytes.len(),
        });
    };

    if header.magic != MAGIC {
        return Err(FormatError::BadMagic {
            found: header.magic,
        });
    }
    if header.version != VERSION {
        return Err(FormatError::UnsupportedVersion(header.version));
    }

    let total = header.length as usize;
    if total > bytes.len() || total < GlbHeader::SIZE {
        return Err(FormatError::LengthMismatch {
            declared: total,
            actual: bytes.len(),
        });
    }
    if bytes.len() > total {
        tracing::warn!(
            trailing = bytes.len() - total,
            "ignoring bytes past declared length"
        );
    }
    let data = &bytes[..total];

    let mut chunks = Vec::new();
    let mut offset = GlbHeader::SIZE;
    while offset < total {
        let chunk =
            ChunkHeader::from_bytes(&data[offset..]).ok_or(FormatError::Truncated {
                offset,
                needed: ChunkHeader::SIZE,
                available: total - offset,
            })?;
        let start = offset + ChunkHeader::SIZE;
        let end = start + chunk.length as usize;
        if end > total {
            return Err(FormatError::ChunkOverrun { offset, end, total });
        }
        chunks.push((chunk.kind, &data[start..end]));
        offset = end;
    }

    let mut chunks = chunks.into_iter();
    let (kind, json) = chunks.next().ok_or(FormatError::Truncated {
        offset: GlbHeader::SIZE,
        needed: ChunkHeader::SIZE,
        available: 0,
    })?;
    if kind != CHUNK_JSON {
        return Err(FormatError::MissingJsonChunk { found: kind });
    }

    let mut bin = None;
    for (kind, payload) in chunks {
        if kind == CHUNK_BIN && bin.is_none() {
            bin = Some(payload);
        } else {
            tracing::debug!(kind, len = payload.len(), "skipping chunk");
        }
    }

    Ok(Chunks {
        json: strip_json_padding(json),
        bin,
    })
}

fn strip_json_padding(json: &[u8]) -> &[u8] {
    let end = json
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    if json[end..].contains(&0) {
        tracing::warn!("JSON chunk padded with NUL bytes instead of spaces");
    }
    &json[..end]
}

/// Decode a `data:` URI with a base64 payload.
pub(crate) fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| FormatError::DataUri(format!("not a data URI: {uri:.32}")))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FormatError::DataUri("missing ',' separator".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(FormatError::DataUri(format!(
            "unsupported encoding {meta:?}, expected base64"
        )));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| FormatError::DataUri(e.to_string()))
}

/// Bytes backing one glTF buffer.
fn buffer_bytes<'a>(
    index: usize,
    buffer: &schema::Buffer,
    bin: Option<&'a [u8]>,
) -> Result<Cow<'a, [u8]>> {
    let needed = buffer.byte_length;
    match buffer.uri.as_deref() {
        None if index == 0 => {
            let bin = bin.unwrap_or_default();
            if bin.len() < needed {
                return Err(FormatError::MissingBinaryChunk {
                    needed,
                    available: bin.len(),
                });
            }
            if bin.len() > align4(needed) {
                tracing::warn!(
                    declared = needed,
                    chunk = bin.len(),
                    "BIN chunk longer than buffer 0"
                );
            }
            Ok(Cow::Borrowed(&bin[..needed]))
        }
        None => Err(FormatError::MissingBinaryChunk {
            needed,
            available: 0,
        }),
        Some(uri) if uri.starts_with("data:") => {
            let mut data = decode_data_uri(uri)?;
            if data.len() < needed {
                return Err(FormatError::DataUri(format!(
                    "buffer {index} declares {needed} bytes, URI holds {}",
                    data.len()
                )));
            }
            data.truncate(needed);
            Ok(Cow::Owned(data))
        }
        Some(uri) => Err(FormatError::ExternalResource {
            index,
            uri: uri.to_string(),
        }),
    }
}

/// A validated buffer view.
struct View<'a> {
    bytes: &'a [u8],
    buffer: usize,
    stride: Option<usize>,
}

fn view_at<'v, 'a>(views: &'v [View<'a>], index: u32) -> Result<&'v View<'a>> {
    views.get(index as usize).ok_or(FormatError::InvalidIndex {
        kind: "buffer view",
        index: index as usize,
        len: views.len(),
    })
}

fn resolve<K: Copy>(keys: &[K], kind: &'static str, index: u32) -> Result<K> {
    keys.get(index as usize)
        .copied()
        .ok_or(FormatError::InvalidIndex {
            kind,
            index: index as usize,
            len: keys.len(),
        })
}

fn check_index(kind: &'static str, index: Option<u32>, len: usize) -> Result<Option<u32>> {
    match index {
        Some(i) if i as usize >= len => Err(FormatError::InvalidIndex {
            kind,
            index: i as usize,
            len,
        }),
        other => Ok(other),
    }
}

/// Bytes from the first element's start to the last element's end.
fn span(count: usize, stride: usize, element_size: usize) -> Option<usize> {
    match count {
        0 => Some(0),
        n => (n - 1).checked_mul(stride)?.checked_add(element_size),
    }
}

/// Append `bytes` to a document buffer at a 4-byte boundary; returns the offset.
fn append(doc: &mut Document, buffer: BufferKey, bytes: &[u8]) -> usize {
    let Some(data) = doc.buffer_data_mut(buffer) else {
        return 0;
    };
    let base = align4(data.len());
    data.resize(base, 0);
    data.extend_from_slice(bytes);
    base
}

/// Check that `count` elements spaced `stride` apart, starting at `offset`,
/// fit in `available` bytes.
fn check_span(
    accessor: usize,
    offset: usize,
    count: usize,
    stride: usize,
    element_size: usize,
    available: usize,
) -> Result<()> {
    let needed = span(count, stride, element_size)
        .and_then(|s| s.checked_add(offset))
        .unwrap_or(usize::MAX);
    if needed > available {
        return Err(FormatError::AccessorOutOfBounds {
            accessor,
            needed,
            available,
        });
    }
    Ok(())
}

/// Expand a sparse accessor into tightly packed elements.
///
/// Returns the glTF buffer the substituted values came from and the dense bytes.
fn densify(
    index: usize,
    accessor: &schema::Accessor,
    sparse: &schema::Sparse,
    views: &[View<'_>],
) -> Result<(usize, Vec<u8>)> {
    let element_size = accessor.accessor_type.element_size(accessor.component_type);
    if sparse.count > accessor.count {
        return Err(FormatError::InvalidIndex {
            kind: "sparse count",
            index: sparse.count,
            len: accessor.count,
        });
    }

    // Every byte range is validated before the dense copy is allocated
    let base = accessor.buffer_view.map(|v| view_at(views, v)).transpose()?;
    if let Some(view) = base {
        let stride = view.stride.unwrap_or(element_size);
        check_span(
            index,
            accessor.byte_offset,
            accessor.count,
            stride,
            element_size,
            view.bytes.len(),
        )?;
    }
    let indices = view_at(views, sparse.indices.buffer_view)?;
    let values = view_at(views, sparse.values.buffer_view)?;
    let index_size = sparse.indices.component_type.size();
    check_span(
        index,
        sparse.indices.byte_offset,
        sparse.count,
        index_size,
        index_size,
        indices.bytes.len(),
    )?;
    check_span(
        index,
        sparse.values.byte_offset,
        sparse.count,
        element_size,
        element_size,
        values.bytes.len(),
    )?;

    let total = accessor
        .count
        .checked_mul(element_size)
        .ok_or(FormatError::AccessorOutOfBounds {
            accessor: index,
            needed: usize::MAX,
            available: 0,
        })?;
    let mut dense = Vec::new();
    dense
        .try_reserve_exact(total)
        .map_err(|_| FormatError::AccessorOutOfBounds {
            accessor: index,
            needed: total,
            available: 0,
        })?;
    dense.resize(total, 0);

    if let Some(view) = base {
        let stride = view.stride.unwrap_or(element_size);
        for element in 0..accessor.count {
            let start = accessor.byte_offset + element * stride;
            dense[element * element_size..][..element_size]
                .copy_from_slice(&view.bytes[start..start + element_size]);
        }
    }

    for i in 0..sparse.count {
        let start = sparse.indices.byte_offset + i * index_size;
        let raw = &indices.bytes[start..start + index_size];
        let target = sparse.indices.component_type.read(raw) as usize;
        if target >= accessor.count {
            return Err(FormatError::InvalidIndex {
                kind: "sparse element",
                index: target,
                len: accessor.count,
            });
        }

        let start = sparse.values.byte_offset + i * element_size;
        dense[target * element_size..][..element_size]
            .copy_from_slice(&values.bytes[start..start + element_size]);
    }

    Ok((values.buffer, dense))
}

/// Resolves extension payloads and remembers which names ended up attached.
struct ExtensionDecoder<'a> {
    registry: &'a ExtensionRegistry,
    attached: BTreeSet<String>,
}

impl ExtensionDecoder<'_> {
    fn decode(&mut self, target: ExtensionTarget, raw: Option<RawExtensions>) -> Result<ExtensionMap> {
        let map = self.registry.decode_map(target, raw)?;
        self.attached.extend(map.keys().cloned());
        Ok(map)
    }
}

/// Decode a GLB file into a new [`Document`].
pub(crate) fn decode(bytes: &[u8], registry: &ExtensionRegistry) -> Result<Document> {
    let chunks = split_chunks(bytes)?;
    let root: schema::Root = serde_json::from_slice(chunks.json)?;

    let major = root.asset.version.split('.').next();
    if major != Some("2") {
        return Err(FormatError::UnsupportedAssetVersion(root.asset.version));
    }

    let schema::Root {
        asset,
        extensions_used,
        extensions_required,
        accessors,
        animations,
        buffers,
        buffer_views,
        cameras,
        images,
        materials,
        meshes,
        nodes,
        samplers,
        scene,
        scenes,
        skins,
        textures,
        extensions,
        extras,
    } = root;

    let mut ext = ExtensionDecoder {
        registry,
        attached: BTreeSet::new(),
    };
    let mut doc = Document::new();

    doc.asset = Asset {
        copyright: asset.copyright,
        generator: asset.generator,
        min_version: asset.min_version,
        extras: asset.extras,
        extensions: ext.decode(ExtensionTarget::Root, asset.extensions)?,
    };
    doc.extras = extras;
    doc.extensions = ext.decode(ExtensionTarget::Root, extensions)?;
    doc.samplers = samplers;
    doc.cameras = cameras;

    // Buffers and views

    let data = buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| buffer_bytes(index, buffer, chunks.bin))
        .collect::<Result<Vec<_>>>()?;

    let views = buffer_views
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let buffer = view.buffer as usize;
            let bytes = data.get(buffer).ok_or(FormatError::InvalidIndex {
                kind: "buffer",
                index: buffer,
                len: data.len(),
            })?;
            let start = view.byte_offset;
            let end = start.saturating_add(view.byte_length);
            let bytes = bytes.get(start..end).ok_or(FormatError::ViewOutOfBounds {
                view: index,
                buffer,
                start,
                end,
                len: bytes.len(),
            })?;
            Ok(View {
                bytes,
                buffer,
                stride: view.byte_stride,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut buffer_keys: Vec<BufferKey> = Vec::with_capacity(buffers.len());
    for buffer in buffers {
        let extensions = ext.decode(ExtensionTarget::Buffer, buffer.extensions)?;
        let key = doc.create_buffer();
        if let Some(b) = doc.buffer_mut(key) {
            b.name = buffer.name;
            b.extras = buffer.extras;
            b.extensions = extensions;
        }
        buffer_keys.push(key);
    }

    // Images and texture bindings

    let mut texture_keys: Vec<TextureKey> = Vec::with_capacity(images.len());
    for image in images {
        let data = match image.buffer_view {
            Some(v) => view_at(&views, v)?.bytes.to_vec(),
            None => Vec::new(),
        };
        let extensions = ext.decode(ExtensionTarget::Texture, image.extensions)?;
        let key = doc.create_texture();
        if let Some(t) = doc.texture_mut(key) {
            t.name = image.name;
            t.mime_type = image.mime_type;
            t.data = data;
            t.uri = image.uri;
            t.extras = image.extras;
            t.extensions = extensions;
        }
        texture_keys.push(key);
    }

    for texture in textures {
        let source = texture
            .source
            .map(|s| resolve(&texture_keys, "image", s))
            .transpose()?;
        let binding = TextureBinding {
            name: texture.name,
            sampler: check_index("sampler", texture.sampler, doc.samplers.len())?,
            extras: texture.extras,
            extensions: ext.decode(ExtensionTarget::TextureBinding, texture.extensions)?,
            ..TextureBinding::new(source)
        };
        doc.add_texture_binding(binding);
    }

    // Materials

    let mut material_keys: Vec<MaterialKey> = Vec::with_capacity(materials.len());
    for material in materials {
        let extensions = ext.decode(ExtensionTarget::Material, material.extensions)?;
        let key = doc.create_material();
        if let Some(m) = doc.material_mut(key) {
            m.name = material.name;
            m.properties = material.properties;
            m.extras = material.extras;
            m.extensions = extensions;
        }
        material_keys.push(key);
    }

    // Accessors, compacted into their document buffers

    let mut placed: HashMap<usize, (BufferKey, usize)> = HashMap::new();
    let mut accessor_keys: Vec<AccessorKey> = Vec::with_capacity(accessors.len());
    for (index, accessor) in accessors.into_iter().enumerate() {
        let element_size = accessor.accessor_type.element_size(accessor.component_type);
        let mut layout = AccessorLayout {
            byte_offset: 0,
            byte_stride: None,
            component_type: accessor.component_type,
            accessor_type: accessor.accessor_type,
            count: accessor.count,
        };

        let key = doc.create_accessor();
        let buffer = match (&accessor.sparse, accessor.buffer_view) {
            (Some(sparse), _) => {
                let (source, dense) = densify(index, &accessor, sparse, &views)?;
                let buffer = buffer_keys[source];
                layout.byte_offset = append(&mut doc, buffer, &dense);
                Some(buffer)
            }
            (None, Some(v)) => {
                let view = view_at(&views, v)?;
                check_span(
                    index,
                    accessor.byte_offset,
                    accessor.count,
                    view.stride.unwrap_or(element_size),
                    element_size,
                    view.bytes.len(),
                )?;

                let (buffer, base) = match placed.entry(v as usize) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let buffer = buffer_keys[view.buffer];
                        let base = append(&mut doc, buffer, view.bytes);
                        *entry.insert((buffer, base))
                    }
                };
                layout.byte_offset = base + accessor.byte_offset;
                layout.byte_stride = view.stride;
                Some(buffer)
            }
            (None, None) => None,
        };
        doc.attach_accessor(key, buffer, layout);

        let extensions = ext.decode(ExtensionTarget::Accessor, accessor.extensions)?;
        if let Some(a) = doc.accessor_mut(key) {
            a.name = accessor.name;
            a.normalized = accessor.normalized;
            a.min = accessor.min;
            a.max = accessor.max;
            a.extras = accessor.extras;
            a.extensions = extensions;
        }
        accessor_keys.push(key);
    }

    // Meshes

    let mut mesh_keys: Vec<MeshKey> = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        let key = doc.create_mesh();
        for primitive in mesh.primitives {
            let p = doc.create_primitive();
            for (semantic, index) in &primitive.attributes {
                let accessor = resolve(&accessor_keys, "accessor", *index)?;
                doc.set_attribute(p, semantic, Some(accessor));
            }
            let indices = primitive
                .indices
                .map(|i| resolve(&accessor_keys, "accessor", i))
                .transpose()?;
            doc.set_indices(p, indices);
            let material = primitive
                .material
                .map(|i| resolve(&material_keys, "material", i))
                .transpose()?;
            doc.set_material(p, material);
            for target in &primitive.targets {
                let target = target
                    .iter()
                    .map(|(semantic, index)| {
                        Ok((semantic.clone(), resolve(&accessor_keys, "accessor", *index)?))
                    })
                    .collect::<Result<_>>()?;
                doc.add_target(p, target);
            }

            let extensions = ext.decode(ExtensionTarget::Primitive, primitive.extensions)?;
            if let Some(prim) = doc.primitive_mut(p) {
                prim.mode = primitive.mode.unwrap_or(MODE_TRIANGLES);
                prim.extras = primitive.extras;
                prim.extensions = extensions;
            }
            doc.add_primitive(key, p);
        }

        let extensions = ext.decode(ExtensionTarget::Mesh, mesh.extensions)?;
        if let Some(m) = doc.mesh_mut(key) {
            m.name = mesh.name;
            m.weights = mesh.weights;
            m.extras = mesh.extras;
            m.extensions = extensions;
        }
        mesh_keys.push(key);
    }

    // Nodes and skins

    let node_keys: Vec<NodeKey> = nodes.iter().map(|_| doc.create_node()).collect();
    let mut links = Vec::with_capacity(nodes.len());
    for (&key, node) in node_keys.iter().zip(nodes) {
        let mesh = node
            .mesh
            .map(|i| resolve(&mesh_keys, "mesh", i))
            .transpose()?;
        doc.set_mesh(key, mesh);

        let extensions = ext.decode(ExtensionTarget::Node, node.extensions)?;
        let camera = check_index("camera", node.camera, doc.cameras.len())?;
        if let Some(n) = doc.node_mut(key) {
            n.name = node.name;
            n.camera = camera;
            n.translation = node.translation;
            n.rotation = node.rotation;
            n.scale = node.scale;
            n.matrix = node.matrix;
            n.weights = node.weights;
            n.extras = node.extras;
            n.extensions = extensions;
        }
        links.push((key, node.skin, node.children));
    }

    let mut skin_keys: Vec<SkinKey> = Vec::with_capacity(skins.len());
    for skin in skins {
        let key = doc.create_skin();
        for joint in skin.joints {
            doc.add_joint(key, resolve(&node_keys, "node", joint)?);
        }
        let skeleton = skin
            .skeleton
            .map(|i| resolve(&node_keys, "node", i))
            .transpose()?;
        doc.set_skeleton(key, skeleton);
        let matrices = skin
            .inverse_bind_matrices
            .map(|i| resolve(&accessor_keys, "accessor", i))
            .transpose()?;
        doc.set_inverse_bind_matrices(key, matrices);

        let extensions = ext.decode(ExtensionTarget::Skin, skin.extensions)?;
        if let Some(s) = doc.skin_mut(key) {
            s.name = skin.name;
            s.extras = skin.extras;
            s.extensions = extensions;
        }
        skin_keys.push(key);
    }

    for (key, skin, children) in links {
        let skin = skin.map(|i| resolve(&skin_keys, "skin", i)).transpose()?;
        doc.set_skin(key, skin);
        for child in children {
            let child = resolve(&node_keys, "node", child)?;
            if !doc.add_child(key, child) {
                tracing::warn!(?key, ?child, "ignoring child link that would form a cycle");
            }
        }
    }

    // Scenes

    let mut scene_keys = Vec::with_capacity(scenes.len());
    for scene in scenes {
        let key = doc.create_scene();
        for node in scene.nodes {
            doc.add_root(key, resolve(&node_keys, "node", node)?);
        }
        let extensions = ext.decode(ExtensionTarget::Scene, scene.extensions)?;
        if let Some(s) = doc.scene_mut(key) {
            s.name = scene.name;
            s.extras = scene.extras;
            s.extensions = extensions;
        }
        scene_keys.push(key);
    }
    let default_scene = scene
        .map(|i| resolve(&scene_keys, "scene", i))
        .transpose()?;
    doc.set_default_scene(default_scene);

    // Animations

    for animation in animations {
        let key = doc.create_animation();
        let sampler_count = animation.samplers.len();
        for sampler in animation.samplers {
            let input = sampler
                .input
                .map(|i| resolve(&accessor_keys, "accessor", i))
                .transpose()?;
            let output = sampler
                .output
                .map(|i| resolve(&accessor_keys, "accessor", i))
                .transpose()?;
            let extensions = ext.decode(ExtensionTarget::Animation, sampler.extensions)?;
            if let Some(slot) = doc.add_sampler(key, input, output, sampler.interpolation) {
                if let Some(s) = doc.animation_mut(key).and_then(|a| a.samplers.get_mut(slot)) {
                    s.extras = sampler.extras;
                    s.extensions = extensions;
                }
            }
        }

        for channel in animation.channels {
            let sampler = check_index("animation sampler", Some(channel.sampler), sampler_count)?
                .unwrap_or_default() as usize;
            let node = channel
                .target
                .node
                .map(|i| resolve(&node_keys, "node", i))
                .transpose()?;
            let extensions = ext.decode(ExtensionTarget::Animation, channel.extensions)?;
            let target_extensions =
                ext.decode(ExtensionTarget::Animation, channel.target.extensions)?;
            if let Some(slot) = doc.add_channel(key, sampler, node, &channel.target.path) {
                if let Some(c) = doc.animation_mut(key).and_then(|a| a.channels.get_mut(slot)) {
                    c.extras = channel.extras;
                    c.extensions = extensions;
                    c.target_extras = channel.target.extras;
                    c.target_extensions = target_extensions;
                }
            }
        }

        let extensions = ext.decode(ExtensionTarget::Animation, animation.extensions)?;
        if let Some(a) = doc.animation_mut(key) {
            a.name = animation.name;
            a.extras = animation.extras;
            a.extensions = extensions;
        }
    }

    doc.nested_extensions = extensions_used
        .into_iter()
        .filter(|name| !ext.attached.contains(name))
        .collect();
    doc.required_extensions = extensions_required.into_iter().collect();

    tracing::debug!(counts = %doc.counts(), "decoded document");
    Ok(doc)
}
