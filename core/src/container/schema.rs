//! JSON chunk schema
//!
//! Only the properties the document model tracks are typed. Every struct is
//! generic over its extension payload type: decoding reads raw payloads
//! ([`RawExtensions`]) and encoding writes resolved ones
//! ([`ExtensionMap`](crate::extensions::ExtensionMap)).

use std::collections::BTreeMap;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::extensions::RawExtensions;
use crate::types::{AccessorType, ComponentType};

pub type Extras = Option<Box<RawValue>>;

/// A JSON object kept as raw property values.
pub type RawObject = BTreeMap<String, Box<RawValue>>;

pub type Attributes = BTreeMap<String, u32>;

fn is_zero(value: &usize) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "X: DeserializeOwned + Default"))]
pub struct Root<X = RawExtensions> {
    pub asset: Asset<X>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skins: Vec<Skin<X>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture<X>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset<X = RawExtensions> {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer<X = RawExtensions> {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView<X = RawExtensions> {
    pub buffer: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<u32>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<Sparse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

/// Sparse substitution block. Only read; encoded accessors are always dense.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: u32,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: ComponentType,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: u32,
    #[serde(default)]
    pub byte_offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh<X = RawExtensions> {
    #[serde(default)]
    pub primitives: Vec<Primitive<X>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive<X = RawExtensions> {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f64; 16]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_bind_matrices: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<u32>,
    #[serde(default)]
    pub joints: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation<X = RawExtensions> {
    #[serde(default)]
    pub channels: Vec<Channel<X>>,
    #[serde(default)]
    pub samplers: Vec<AnimationSampler<X>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel<X = RawExtensions> {
    pub sampler: u32,
    pub target: ChannelTarget<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTarget<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSampler<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

/// A glTF `textures` entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture<X = RawExtensions> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<X>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Extras,
}

/// A material: name, extras and extensions split out, every other property raw.
#[derive(Debug)]
pub struct Material<X = RawExtensions> {
    pub name: Option<String>,
    pub properties: RawObject,
    pub extensions: Option<X>,
    pub extras: Extras,
}

impl<'de, X: DeserializeOwned> Deserialize<'de> for Material<X> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut properties = RawObject::deserialize(deserializer)?;
        let name = properties
            .remove("name")
            .map(|raw| serde_json::from_str::<Option<String>>(raw.get()))
            .transpose()
            .map_err(de::Error::custom)?
            .flatten();
        let extensions = properties
            .remove("extensions")
            .map(|raw| serde_json::from_str::<X>(raw.get()))
            .transpose()
            .map_err(de::Error::custom)?;
        let extras = properties.remove("extras");
        Ok(Self {
            name,
            properties,
            extensions,
            extras,
        })
    }
}

impl<X: Serialize> Serialize for Material<X> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        for (key, value) in &self.properties {
            map.serialize_entry(key, value)?;
        }
        if let Some(extensions) = &self.extensions {
            map.serialize_entry("extensions", extensions)?;
        }
        if let Some(extras) = &self.extras {
            map.serialize_entry("extras", extras)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_keeps_raw_properties() {
        let text = r#"{"name":"Red","pbrMetallicRoughness":{"baseColorFactor":[1,0,0,1]},"doubleSided":true,"extras":{"id":7}}"#;
        let material: Material = serde_json::from_str(text).unwrap();
        assert_eq!(material.name.as_deref(), Some("Red"));
        assert_eq!(
            material.properties["pbrMetallicRoughness"].get(),
            r#"{"baseColorFactor":[1,0,0,1]}"#
        );
        assert_eq!(material.extras.as_ref().unwrap().get(), r#"{"id":7}"#);
        assert!(material.extensions.is_none());

        let json = serde_json::to_string(&material).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Red","doubleSided":true,"pbrMetallicRoughness":{"baseColorFactor":[1,0,0,1]},"extras":{"id":7}}"#
        );
    }

    #[test]
    fn test_accessor_defaults() {
        let accessor: Accessor =
            serde_json::from_str(r#"{"componentType":5123,"count":6,"type":"SCALAR"}"#).unwrap();
        assert_eq!(accessor.component_type, ComponentType::U16);
        assert_eq!(accessor.byte_offset, 0);
        assert!(accessor.buffer_view.is_none());
        assert!(!accessor.normalized);

        let json = serde_json::to_string(&accessor).unwrap();
        assert_eq!(json, r#"{"componentType":5123,"count":6,"type":"SCALAR"}"#);
    }

    #[test]
    fn test_unknown_properties_are_ignored() {
        let root: Root = serde_json::from_str(
            r#"{"asset":{"version":"2.0"},"futureThing":[1,2,3],"nodes":[{"name":"a"}]}"#,
        )
        .unwrap();
        assert_eq!(root.nodes.len(), 1);
        assert_eq!(root.nodes[0].name.as_deref(), Some("a"));
    }
}
