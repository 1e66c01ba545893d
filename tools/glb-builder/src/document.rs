//! Fixture document construction
//!
//! Geometry, hierarchy, skins and animations are built as typed `gltf-json`
//! values. Materials, images, textures and extension payloads are injected as
//! raw JSON so fixtures can carry anything, including extensions no parser
//! knows about.

use std::collections::BTreeMap;

use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use serde_json::{Map, Value};

use crate::buffer::{AccessorIndex, BufferBuilder, ViewIndex};
use crate::mesh::MeshAccessors;
use crate::utils::assemble_glb;

/// Where an injected extension payload is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionSite {
    Root,
    Material(u32),
    Mesh(u32),
    Node(u32),
    Texture(u32),
}

impl ExtensionSite {
    fn locate(self, root: &mut Value) -> Option<&mut Value> {
        match self {
            Self::Root => Some(root),
            Self::Material(i) => root.get_mut("materials")?.get_mut(i as usize),
            Self::Mesh(i) => root.get_mut("meshes")?.get_mut(i as usize),
            Self::Node(i) => root.get_mut("nodes")?.get_mut(i as usize),
            Self::Texture(i) => root.get_mut("textures")?.get_mut(i as usize),
        }
    }
}

fn node(name: &str) -> json::Node {
    json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: Some(name.to_string()),
        rotation: None,
        scale: None,
        skin: None,
        translation: None,
        weights: None,
    }
}

fn primitive(accessors: &MeshAccessors, material: Option<u32>) -> json::mesh::Primitive {
    use json::mesh::Semantic;

    let mut attributes = BTreeMap::new();
    attributes.insert(Valid(Semantic::Positions), accessors.positions.as_json_index());
    let optional = [
        (Semantic::Normals, accessors.normals),
        (Semantic::TexCoords(0), accessors.uvs),
        (Semantic::Joints(0), accessors.joints),
        (Semantic::Weights(0), accessors.weights),
    ];
    for (semantic, accessor) in optional {
        if let Some(accessor) = accessor {
            attributes.insert(Valid(semantic), accessor.as_json_index());
        }
    }

    json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: accessors.indices.map(|i| i.as_json_index()),
        material: material.map(json::Index::new),
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    }
}

/// Builder for complete fixture files
#[derive(Debug, Default)]
pub struct GltfBuilder {
    nodes: Vec<json::Node>,
    meshes: Vec<json::Mesh>,
    skins: Vec<json::Skin>,
    animations: Vec<json::Animation>,
    scenes: Vec<json::Scene>,
    materials: Vec<Value>,
    images: Vec<Value>,
    textures: Vec<Value>,
    extensions: Vec<(ExtensionSite, String, Value)>,
    extensions_required: Vec<String>,
    copyright: Option<String>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copyright(&mut self, text: &str) -> &mut Self {
        self.copyright = Some(text.to_string());
        self
    }

    pub fn add_material(&mut self, name: &str) -> u32 {
        self.add_raw_material(serde_json::json!({ "name": name }))
    }

    /// Material sampling `texture` as its base color
    pub fn add_textured_material(&mut self, name: &str, texture: u32) -> u32 {
        self.add_raw_material(serde_json::json!({
            "name": name,
            "pbrMetallicRoughness": { "baseColorTexture": { "index": texture } }
        }))
    }

    /// Material given as a raw JSON object
    pub fn add_raw_material(&mut self, material: Value) -> u32 {
        self.materials.push(material);
        self.materials.len() as u32 - 1
    }

    /// Image embedded in a buffer view
    pub fn add_image(&mut self, view: ViewIndex, mime_type: Option<&str>) -> u32 {
        let mut image = Map::new();
        image.insert("bufferView".into(), view.0.into());
        if let Some(mime_type) = mime_type {
            image.insert("mimeType".into(), mime_type.into());
        }
        self.images.push(Value::Object(image));
        self.images.len() as u32 - 1
    }

    /// Image referenced by URI only
    pub fn add_image_uri(&mut self, uri: &str) -> u32 {
        self.images.push(serde_json::json!({ "uri": uri }));
        self.images.len() as u32 - 1
    }

    pub fn add_texture(&mut self, image: u32) -> u32 {
        self.textures.push(serde_json::json!({ "source": image }));
        self.textures.len() as u32 - 1
    }

    /// Mesh with a single primitive
    pub fn add_mesh(&mut self, name: &str, accessors: &MeshAccessors, material: Option<u32>) -> u32 {
        self.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name.to_string()),
            primitives: vec![primitive(accessors, material)],
            weights: None,
        });
        self.meshes.len() as u32 - 1
    }

    /// Append another primitive to an existing mesh
    pub fn add_primitive(&mut self, mesh: u32, accessors: &MeshAccessors, material: Option<u32>) {
        self.meshes[mesh as usize]
            .primitives
            .push(primitive(accessors, material));
    }

    pub fn add_node(&mut self, name: &str, mesh: Option<u32>) -> u32 {
        let mut node = node(name);
        node.mesh = mesh.map(json::Index::new);
        self.nodes.push(node);
        self.nodes.len() as u32 - 1
    }

    pub fn set_children(&mut self, parent: u32, children: &[u32]) {
        let children = children.iter().map(|&c| json::Index::new(c)).collect();
        self.nodes[parent as usize].children = Some(children);
    }

    pub fn set_translation(&mut self, node: u32, translation: [f32; 3]) {
        self.nodes[node as usize].translation = Some(translation);
    }

    /// Skin over `joints`, rooted at the first joint
    pub fn add_skin(
        &mut self,
        name: &str,
        joints: &[u32],
        inverse_bind_matrices: AccessorIndex,
    ) -> u32 {
        self.skins.push(json::Skin {
            extensions: Default::default(),
            extras: Default::default(),
            inverse_bind_matrices: Some(inverse_bind_matrices.as_json_index()),
            joints: joints.iter().map(|&j| json::Index::new(j)).collect(),
            name: Some(name.to_string()),
            skeleton: joints.first().map(|&j| json::Index::new(j)),
        });
        self.skins.len() as u32 - 1
    }

    pub fn set_skin(&mut self, node: u32, skin: u32) {
        self.nodes[node as usize].skin = Some(json::Index::new(skin));
    }

    /// Animation with one linear translation track per node
    pub fn add_animation(
        &mut self,
        name: &str,
        times: AccessorIndex,
        tracks: &[(u32, AccessorIndex)],
    ) -> u32 {
        let mut samplers = Vec::new();
        let mut channels = Vec::new();

        for &(node, translations) in tracks {
            samplers.push(json::animation::Sampler {
                input: times.as_json_index(),
                interpolation: Valid(json::animation::Interpolation::Linear),
                output: translations.as_json_index(),
                extensions: Default::default(),
                extras: Default::default(),
            });
            channels.push(json::animation::Channel {
                sampler: json::Index::new(samplers.len() as u32 - 1),
                target: json::animation::Target {
                    node: json::Index::new(node),
                    path: Valid(json::animation::Property::Translation),
                    extensions: Default::default(),
                    extras: Default::default(),
                },
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        self.animations.push(json::Animation {
            channels,
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name.to_string()),
            samplers,
        });
        self.animations.len() as u32 - 1
    }

    pub fn add_scene(&mut self, name: &str, root_nodes: &[u32]) -> u32 {
        self.scenes.push(json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name.to_string()),
            nodes: root_nodes.iter().map(|&n| json::Index::new(n)).collect(),
        });
        self.scenes.len() as u32 - 1
    }

    /// Attach a raw extension payload and declare it in `extensionsUsed`
    pub fn add_extension(&mut self, site: ExtensionSite, name: &str, payload: Value) -> &mut Self {
        self.extensions.push((site, name.to_string(), payload));
        self
    }

    pub fn require_extension(&mut self, name: &str) -> &mut Self {
        self.extensions_required.push(name.to_string());
        self
    }

    /// Build the JSON chunk for `buffer`'s data
    pub fn build(&self, buffer: &BufferBuilder, generator: &str) -> Value {
        let buffers = if buffer.data().is_empty() {
            Vec::new()
        } else {
            vec![json::Buffer {
                byte_length: buffer.data().len().into(),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            }]
        };

        let root = json::Root {
            accessors: buffer.accessors().to_vec(),
            animations: self.animations.clone(),
            asset: json::Asset {
                copyright: self.copyright.clone(),
                extensions: Default::default(),
                extras: Default::default(),
                generator: Some(generator.to_string()),
                min_version: None,
                version: "2.0".to_string(),
            },
            buffers,
            buffer_views: buffer.views().to_vec(),
            cameras: Vec::new(),
            extensions: Default::default(),
            extensions_required: Vec::new(),
            extensions_used: Vec::new(),
            extras: Default::default(),
            images: Vec::new(),
            materials: Vec::new(),
            meshes: self.meshes.clone(),
            nodes: self.nodes.clone(),
            samplers: Vec::new(),
            scene: (!self.scenes.is_empty()).then(|| json::Index::new(0)),
            scenes: self.scenes.clone(),
            skins: self.skins.clone(),
            textures: Vec::new(),
        };

        let mut out = serde_json::to_value(&root).expect("Failed to serialize GLTF JSON");
        for (key, items) in [
            ("materials", &self.materials),
            ("images", &self.images),
            ("textures", &self.textures),
        ] {
            if !items.is_empty() {
                out[key] = Value::Array(items.clone());
            }
        }

        let mut used: Vec<String> = Vec::new();
        for (site, name, payload) in &self.extensions {
            let target = site
                .locate(&mut out)
                .unwrap_or_else(|| panic!("no {site:?} to attach {name} to"));
            target["extensions"][name.as_str()] = payload.clone();
            if !used.contains(name) {
                used.push(name.clone());
            }
        }
        if !used.is_empty() {
            out["extensionsUsed"] = serde_json::json!(used);
        }
        if !self.extensions_required.is_empty() {
            out["extensionsRequired"] = serde_json::json!(self.extensions_required);
        }
        out
    }

    /// Build a complete GLB file
    pub fn build_glb(&self, buffer: &BufferBuilder, generator: &str) -> Vec<u8> {
        assemble_glb(&self.build(buffer, generator), buffer.data())
    }
}
