//! GLB encoding
//!
//! The JSON chunk is rebuilt from the document on every encode: entities are
//! numbered by creation order, all buffers are merged into the single BIN
//! chunk and every accessor gets its own buffer view.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;

use hashbrown::HashMap;

use super::header::{CHUNK_BIN, CHUNK_JSON, ChunkHeader, GlbHeader};
use super::schema;
use crate::document::{Accessor, AccessorKey, BufferKey, Document};
use crate::extensions::ExtensionMap;
use crate::types::{MODE_TRIANGLES, TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER};

/// `asset.generator` written into every encoded file.
pub const GENERATOR: &str = concat!("glbmin ", env!("CARGO_PKG_VERSION"));

/// Pad to a 4-byte boundary with zeros.
fn align(buffer: &mut Vec<u8>) {
    buffer.resize(buffer.len().next_multiple_of(4), 0);
}

/// How the document uses an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Vertex,
    Index,
    /// Skin matrices and animation keyframes
    Other,
}

impl Usage {
    fn target(self) -> Option<u32> {
        match self {
            Usage::Vertex => Some(TARGET_ARRAY_BUFFER),
            Usage::Index => Some(TARGET_ELEMENT_ARRAY_BUFFER),
            Usage::Other => None,
        }
    }
}

fn index_map<K: Copy + Eq + Hash>(keys: &[K]) -> HashMap<K, u32> {
    keys.iter()
        .enumerate()
        .map(|(i, &k)| (k, i as u32))
        .collect()
}

fn extensions(map: &ExtensionMap) -> Option<ExtensionMap> {
    (!map.is_empty()).then(|| map.clone())
}

/// Guess an image MIME type from its signature.
pub fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const KTX2: &[u8] = &[0xAB, b'K', b'T', b'X', b' ', b'2', b'0', 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];

    if data.starts_with(PNG) {
        Some("image/png")
    } else if data.starts_with(JPEG) {
        Some("image/jpeg")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else if data.starts_with(KTX2) {
        Some("image/ktx2")
    } else {
        None
    }
}

/// Elements of a strided accessor copied out tightly packed.
fn packed_elements(data: &[u8], accessor: &Accessor) -> Vec<u8> {
    let element_size = accessor.element_size();
    let stride = accessor.effective_stride();
    let mut packed = Vec::with_capacity(accessor.count() * element_size);
    for element in 0..accessor.count() {
        let start = accessor.byte_offset() + element * stride;
        match data.get(start..start + element_size) {
            Some(bytes) => packed.extend_from_slice(bytes),
            None => packed.resize(packed.len() + element_size, 0),
        }
    }
    packed
}

/// Frame a JSON payload and a BIN payload as a GLB file.
///
/// The BIN chunk is omitted when `bin` is empty.
pub fn assemble(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let json_chunk_length = json.len().next_multiple_of(4);
    let bin_chunk_length = bin.len().next_multiple_of(4);

    let mut total_length = GlbHeader::SIZE + ChunkHeader::SIZE + json_chunk_length;
    if !bin.is_empty() {
        total_length += ChunkHeader::SIZE + bin_chunk_length;
    }

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(&GlbHeader::new(total_length as u32).to_bytes());

    glb.extend_from_slice(
        &ChunkHeader {
            length: json_chunk_length as u32,
            kind: CHUNK_JSON,
        }
        .to_bytes(),
    );
    glb.extend_from_slice(json);
    glb.resize(glb.len() + json_chunk_length - json.len(), b' ');

    if !bin.is_empty() {
        glb.extend_from_slice(
            &ChunkHeader {
                length: bin_chunk_length as u32,
                kind: CHUNK_BIN,
            }
            .to_bytes(),
        );
        glb.extend_from_slice(bin);
        glb.resize(glb.len() + bin_chunk_length - bin.len(), 0);
    }

    glb
}

/// Encode a document as a GLB file.
pub(crate) fn encode(doc: &Document) -> Vec<u8> {
    let mut bin = Vec::new();
    let mut buffer_base: HashMap<BufferKey, usize> = HashMap::new();
    for &key in doc.list_buffers() {
        if let Some(buffer) = doc.buffer(key) {
            align(&mut bin);
            buffer_base.insert(key, bin.len());
            bin.extend_from_slice(buffer.data());
        }
    }

    let accessor_index = index_map(doc.list_accessors());
    let material_index = index_map(doc.list_materials());
    let mesh_index = index_map(doc.list_meshes());
    let node_index = index_map(doc.list_nodes());
    let skin_index = index_map(doc.list_skins());
    let texture_index = index_map(doc.list_textures());

    // How each accessor is used decides its view target and stride
    let mut usage: HashMap<AccessorKey, Usage> = HashMap::new();
    for &mesh in doc.list_meshes() {
        let Some(mesh) = doc.mesh(mesh) else { continue };
        for primitive in mesh.primitives().iter().filter_map(|&p| doc.primitive(p)) {
            let vertex = primitive
                .attributes()
                .values()
                .chain(primitive.targets().iter().flat_map(|t| t.values()));
            for &accessor in vertex {
                usage.entry(accessor).or_insert(Usage::Vertex);
            }
            if let Some(indices) = primitive.indices() {
                usage.insert(indices, Usage::Index);
            }
        }
    }
    let other = doc
        .list_skins()
        .iter()
        .filter_map(|&s| doc.skin(s)?.inverse_bind_matrices())
        .chain(
            doc.list_animations()
                .iter()
                .filter_map(|&a| doc.animation(a))
                .flat_map(|a| a.samplers().iter().flat_map(|s| [s.input(), s.output()]))
                .flatten(),
        );
    for accessor in other {
        if usage.get(&accessor) != Some(&Usage::Index) {
            usage.insert(accessor, Usage::Other);
        }
    }

    let mut buffer_views: Vec<schema::BufferView<ExtensionMap>> = Vec::new();
    let mut accessors = Vec::with_capacity(doc.list_accessors().len());
    for &key in doc.list_accessors() {
        let Some(a) = doc.accessor(key) else { continue };
        let usage = usage.get(&key).copied();
        let source = a
            .buffer()
            .and_then(|b| Some((doc.buffer(b)?, *buffer_base.get(&b)?)));

        let buffer_view = match source {
            Some((buffer, base)) if a.count() > 0 => {
                // Only vertex views may carry a stride; unused accessors keep their layout
                let strided = matches!(usage, None | Some(Usage::Vertex));
                let (byte_offset, byte_stride) = if a.byte_stride().is_some() && !strided {
                    align(&mut bin);
                    let offset = bin.len();
                    bin.extend_from_slice(&packed_elements(buffer.data(), a));
                    (offset, None)
                } else {
                    (base + a.byte_offset(), a.byte_stride())
                };
                // A strided view covers the trailing padding of the last element when it fits
                let byte_length = match byte_stride {
                    Some(stride) => (a.count() * stride)
                        .min(buffer.byte_length().saturating_sub(a.byte_offset()))
                        .max(a.byte_span()),
                    None => a.count() * a.element_size(),
                };
                buffer_views.push(schema::BufferView {
                    buffer: 0,
                    byte_offset,
                    byte_length,
                    byte_stride,
                    target: usage.and_then(Usage::target),
                    name: None,
                    extensions: None,
                    extras: None,
                });
                Some(buffer_views.len() as u32 - 1)
            }
            _ => None,
        };

        accessors.push(schema::Accessor {
            buffer_view,
            byte_offset: 0,
            component_type: a.component_type(),
            normalized: a.normalized,
            count: a.count(),
            accessor_type: a.accessor_type(),
            max: a.max.clone(),
            min: a.min.clone(),
            sparse: None,
            name: a.name.clone(),
            extensions: extensions(&a.extensions),
            extras: a.extras.clone(),
        });
    }

    let mut images = Vec::with_capacity(doc.list_textures().len());
    for texture in doc.list_textures().iter().filter_map(|&t| doc.texture(t)) {
        let (buffer_view, uri, mime_type) = if texture.data.is_empty() {
            (None, texture.uri.clone(), texture.mime_type.clone())
        } else {
            align(&mut bin);
            buffer_views.push(schema::BufferView {
                buffer: 0,
                byte_offset: bin.len(),
                byte_length: texture.data.len(),
                byte_stride: None,
                target: None,
                name: None,
                extensions: None,
                extras: None,
            });
            bin.extend_from_slice(&texture.data);
            let mime_type = texture
                .mime_type
                .clone()
                .or_else(|| sniff_mime_type(&texture.data).map(str::to_string));
            (Some(buffer_views.len() as u32 - 1), None, mime_type)
        };
        images.push(schema::Image {
            uri,
            mime_type,
            buffer_view,
            name: texture.name.clone(),
            extensions: extensions(&texture.extensions),
            extras: texture.extras.clone(),
        });
    }

    // The merged buffer inherits the metadata of the first document buffer
    let first = doc.list_buffers().first().and_then(|&b| doc.buffer(b));
    let buffers = if bin.is_empty() {
        Vec::new()
    } else {
        vec![schema::Buffer {
            byte_length: bin.len(),
            uri: None,
            name: first.and_then(|b| b.name.clone()),
            extensions: first.and_then(|b| extensions(&b.extensions)),
            extras: first.and_then(|b| b.extras.clone()),
        }]
    };

    let textures = doc
        .texture_bindings()
        .iter()
        .map(|binding| schema::Texture {
            sampler: binding.sampler,
            source: binding
                .source()
                .and_then(|t| texture_index.get(&t).copied()),
            name: binding.name.clone(),
            extensions: extensions(&binding.extensions),
            extras: binding.extras.clone(),
        })
        .collect();

    let materials = doc
        .list_materials()
        .iter()
        .filter_map(|&m| doc.material(m))
        .map(|material| schema::Material {
            name: material.name.clone(),
            properties: material.properties.clone(),
            extensions: extensions(&material.extensions),
            extras: material.extras.clone(),
        })
        .collect();

    let accessor_refs = |map: &BTreeMap<String, AccessorKey>| -> schema::Attributes {
        map.iter()
            .filter_map(|(semantic, a)| Some((semantic.clone(), *accessor_index.get(a)?)))
            .collect()
    };

    let meshes = doc
        .list_meshes()
        .iter()
        .filter_map(|&m| doc.mesh(m))
        .map(|mesh| schema::Mesh {
            primitives: mesh
                .primitives()
                .iter()
                .filter_map(|&p| doc.primitive(p))
                .map(|p| schema::Primitive {
                    attributes: accessor_refs(p.attributes()),
                    indices: p.indices().and_then(|a| accessor_index.get(&a).copied()),
                    material: p.material().and_then(|m| material_index.get(&m).copied()),
                    mode: (p.mode != MODE_TRIANGLES).then_some(p.mode),
                    targets: p.targets().iter().map(&accessor_refs).collect(),
                    extensions: extensions(&p.extensions),
                    extras: p.extras.clone(),
                })
                .collect(),
            weights: mesh.weights.clone(),
            name: mesh.name.clone(),
            extensions: extensions(&mesh.extensions),
            extras: mesh.extras.clone(),
        })
        .collect();

    let nodes = doc
        .list_nodes()
        .iter()
        .filter_map(|&n| doc.node(n))
        .map(|node| schema::Node {
            camera: node.camera,
            children: node
                .children()
                .iter()
                .filter_map(|c| node_index.get(c).copied())
                .collect(),
            skin: node.skin().and_then(|s| skin_index.get(&s).copied()),
            matrix: node.matrix,
            mesh: node.mesh().and_then(|m| mesh_index.get(&m).copied()),
            rotation: node.rotation,
            scale: node.scale,
            translation: node.translation,
            weights: node.weights.clone(),
            name: node.name.clone(),
            extensions: extensions(&node.extensions),
            extras: node.extras.clone(),
        })
        .collect();

    let scene_keys = doc.list_scenes();
    let scenes = scene_keys
        .iter()
        .filter_map(|&s| doc.scene(s))
        .map(|scene| schema::Scene {
            nodes: scene
                .nodes()
                .iter()
                .filter_map(|n| node_index.get(n).copied())
                .collect(),
            name: scene.name.clone(),
            extensions: extensions(&scene.extensions),
            extras: scene.extras.clone(),
        })
        .collect();
    let scene = doc
        .default_scene()
        .and_then(|s| scene_keys.iter().position(|&k| k == s))
        .map(|i| i as u32);

    let skins = doc
        .list_skins()
        .iter()
        .filter_map(|&s| doc.skin(s))
        .map(|skin| schema::Skin {
            inverse_bind_matrices: skin
                .inverse_bind_matrices()
                .and_then(|a| accessor_index.get(&a).copied()),
            skeleton: skin.skeleton().and_then(|n| node_index.get(&n).copied()),
            joints: skin
                .joints()
                .iter()
                .filter_map(|n| node_index.get(n).copied())
                .collect(),
            name: skin.name.clone(),
            extensions: extensions(&skin.extensions),
            extras: skin.extras.clone(),
        })
        .collect();

    let animations = doc
        .list_animations()
        .iter()
        .filter_map(|&a| doc.animation(a))
        .map(|animation| schema::Animation {
            channels: animation
                .channels()
                .iter()
                .map(|channel| schema::Channel {
                    sampler: channel.sampler() as u32,
                    target: schema::ChannelTarget {
                        node: channel.node().and_then(|n| node_index.get(&n).copied()),
                        path: channel.path.clone(),
                        extensions: extensions(&channel.target_extensions),
                        extras: channel.target_extras.clone(),
                    },
                    extensions: extensions(&channel.extensions),
                    extras: channel.extras.clone(),
                })
                .collect(),
            samplers: animation
                .samplers()
                .iter()
                .map(|sampler| schema::AnimationSampler {
                    input: sampler.input().and_then(|a| accessor_index.get(&a).copied()),
                    interpolation: sampler.interpolation.clone(),
                    output: sampler.output().and_then(|a| accessor_index.get(&a).copied()),
                    extensions: extensions(&sampler.extensions),
                    extras: sampler.extras.clone(),
                })
                .collect(),
            name: animation.name.clone(),
            extensions: extensions(&animation.extensions),
            extras: animation.extras.clone(),
        })
        .collect();

    let used = extensions_used(doc);
    let required = doc
        .required_extensions
        .iter()
        .filter(|name| used.contains(*name))
        .cloned()
        .collect();

    let root: schema::Root<ExtensionMap> = schema::Root {
        asset: schema::Asset {
            version: "2.0".to_string(),
            copyright: doc.asset.copyright.clone(),
            generator: Some(GENERATOR.to_string()),
            min_version: doc.asset.min_version.clone(),
            extensions: extensions(&doc.asset.extensions),
            extras: doc.asset.extras.clone(),
        },
        extensions_used: used.into_iter().collect(),
        extensions_required: required,
        accessors,
        animations,
        buffers,
        buffer_views,
        cameras: doc.cameras.clone(),
        images,
        materials,
        meshes,
        nodes,
        samplers: doc.samplers.clone(),
        scene,
        scenes,
        skins,
        textures,
        extensions: extensions(&doc.extensions),
        extras: doc.extras.clone(),
    };

    let json = serde_json::to_vec(&root).expect("Failed to serialize glTF JSON");
    tracing::debug!(json = json.len(), bin = bin.len(), "encoded document");
    assemble(&json, &bin)
}

/// Extension names attached to live entities, plus declared names that live
/// inside opaque payloads.
fn extensions_used(doc: &Document) -> BTreeSet<String> {
    let mut used = doc.nested_extensions.clone();
    let mut add = |map: &ExtensionMap| used.extend(map.keys().cloned());

    add(&doc.extensions);
    add(&doc.asset.extensions);
    for b in doc.list_buffers().iter().filter_map(|&k| doc.buffer(k)) {
        add(&b.extensions);
    }
    for a in doc.list_accessors().iter().filter_map(|&k| doc.accessor(k)) {
        add(&a.extensions);
    }
    for m in doc.list_meshes().iter().filter_map(|&k| doc.mesh(k)) {
        add(&m.extensions);
        for p in m.primitives().iter().filter_map(|&k| doc.primitive(k)) {
            add(&p.extensions);
        }
    }
    for n in doc.list_nodes().iter().filter_map(|&k| doc.node(k)) {
        add(&n.extensions);
    }
    for s in doc.list_scenes().iter().filter_map(|&k| doc.scene(k)) {
        add(&s.extensions);
    }
    for m in doc.list_materials().iter().filter_map(|&k| doc.material(k)) {
        add(&m.extensions);
    }
    for t in doc.list_textures().iter().filter_map(|&k| doc.texture(k)) {
        add(&t.extensions);
    }
    for binding in doc.texture_bindings() {
        add(&binding.extensions);
    }
    for s in doc.list_skins().iter().filter_map(|&k| doc.skin(k)) {
        add(&s.extensions);
    }
    for a in doc.list_animations().iter().filter_map(|&k| doc.animation(k)) {
        add(&a.extensions);
        for c in a.channels() {
            add(&c.extensions);
            add(&c.target_extensions);
        }
        for s in a.samplers() {
            add(&s.extensions);
        }
    }
    used
}
