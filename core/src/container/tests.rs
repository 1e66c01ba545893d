use serde_json::Value;

use super::*;
use crate::error::FormatError;
use crate::extensions::{Extension, KHR_MATERIALS_EMISSIVE_STRENGTH};
use crate::types::{AccessorArray, AccessorType};

fn registry() -> ExtensionRegistry {
    ExtensionRegistry::khronos()
}

fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    assemble(json.as_bytes(), bin)
}

/// JSON chunk of an encoded file.
fn json_of(bytes: &[u8]) -> Value {
    let chunk = ChunkHeader::from_bytes(&bytes[GlbHeader::SIZE..]).unwrap();
    assert_eq!(chunk.kind, CHUNK_JSON);
    let start = GlbHeader::SIZE + ChunkHeader::SIZE;
    serde_json::from_slice(&bytes[start..start + chunk.length as usize]).unwrap()
}

fn json_text(bytes: &[u8]) -> String {
    let chunk = ChunkHeader::from_bytes(&bytes[GlbHeader::SIZE..]).unwrap();
    let start = GlbHeader::SIZE + ChunkHeader::SIZE;
    String::from_utf8(bytes[start..start + chunk.length as usize].to_vec()).unwrap()
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Indices [0,1,2], padding, three positions, then four unreferenced bytes.
fn triangle_bin() -> Vec<u8> {
    let mut bin: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    bin.extend_from_slice(&[0, 0]);
    bin.extend(f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]));
    bin.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    bin
}

const TRIANGLE: &str = r#"{
    "asset": {"version": "2.0", "generator": "hand written", "copyright": "nobody"},
    "buffers": [{"byteLength": 48}],
    "bufferViews": [
        {"buffer": 0, "byteOffset": 0, "byteLength": 6, "target": 34963},
        {"buffer": 0, "byteOffset": 8, "byteLength": 36, "target": 34962},
        {"buffer": 0, "byteOffset": 44, "byteLength": 4}
    ],
    "accessors": [
        {"bufferView": 0, "componentType": 5123, "count": 3, "type": "SCALAR", "min": [0], "max": [2]},
        {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0]}
    ],
    "materials": [{"name": "Red", "doubleSided": true}],
    "meshes": [{"primitives": [{"attributes": {"POSITION": 1}, "indices": 0, "material": 0}]}],
    "nodes": [{"mesh": 0, "translation": [1, 2, 3]}],
    "scenes": [{"nodes": [0]}],
    "scene": 0
}"#;

fn triangle() -> Vec<u8> {
    glb(TRIANGLE, &triangle_bin())
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_bad_magic() {
    let mut bytes = triangle();
    bytes[0..4].copy_from_slice(b"GLTF");
    let err = GlbCodec::new(&registry()).decode(&bytes).unwrap_err();
    assert!(matches!(err, FormatError::BadMagic { .. }));

    let err = GlbCodec::new(&registry()).decode(b"PK\x03\x04").unwrap_err();
    assert!(matches!(err, FormatError::BadMagic { .. }));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = triangle();
    bytes[4..8].copy_from_slice(&1u32.to_le_bytes());
    let err = GlbCodec::new(&registry()).decode(&bytes).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedVersion(1)));
}

#[test]
fn test_truncated_file() {
    let bytes = triangle();
    let err = GlbCodec::new(&registry())
        .decode(&bytes[..bytes.len() - 4])
        .unwrap_err();
    assert!(matches!(err, FormatError::LengthMismatch { .. }));

    let err = GlbCodec::new(&registry()).decode(b"glTF\x02").unwrap_err();
    assert!(matches!(err, FormatError::Truncated { .. }));
}

#[test]
fn test_chunk_overrun() {
    let mut bytes = triangle();
    let json_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    bytes[12..16].copy_from_slice(&(json_len + 4096).to_le_bytes());
    let err = GlbCodec::new(&registry()).decode(&bytes).unwrap_err();
    assert!(matches!(err, FormatError::ChunkOverrun { offset: 12, .. }));
}

#[test]
fn test_first_chunk_must_be_json() {
    let mut bytes = triangle();
    bytes[16..20].copy_from_slice(&CHUNK_BIN.to_le_bytes());
    let err = GlbCodec::new(&registry()).decode(&bytes).unwrap_err();
    assert!(matches!(err, FormatError::MissingJsonChunk { found: CHUNK_BIN }));
}

#[test]
fn test_invalid_json() {
    let err = GlbCodec::new(&registry())
        .decode(&glb("{\"asset\":", &[]))
        .unwrap_err();
    assert!(matches!(err, FormatError::Json(_)));
}

#[test]
fn test_asset_version_must_be_2() {
    let err = GlbCodec::new(&registry())
        .decode(&glb(r#"{"asset":{"version":"1.0"}}"#, &[]))
        .unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedAssetVersion(v) if v == "1.0"));
}

#[test]
fn test_nul_padded_json_is_accepted() {
    let json = r#"{"asset":{"version":"2.0"}}"#;
    assert_eq!(json.len() % 4, 3);
    let mut bytes = glb(json, &[]);
    let pad = GlbHeader::SIZE + ChunkHeader::SIZE + json.len();
    bytes[pad] = 0;
    let doc = GlbCodec::new(&registry()).decode(&bytes).unwrap();
    assert_eq!(doc.counts().nodes, 0);
}

#[test]
fn test_missing_bin_chunk() {
    let err = GlbCodec::new(&registry())
        .decode(&glb(r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4}]}"#, &[]))
        .unwrap_err();
    assert!(matches!(
        err,
        FormatError::MissingBinaryChunk {
            needed: 4,
            available: 0
        }
    ));
}

// ============================================================================
// Buffers and accessors
// ============================================================================

#[test]
fn test_decode_compacts_unreferenced_views() {
    let doc = GlbCodec::new(&registry()).decode(&triangle()).unwrap();
    let buffers = doc.list_buffers();
    assert_eq!(buffers.len(), 1);
    // The trailing 4-byte view has no accessor and is dropped
    assert_eq!(doc.buffer(buffers[0]).unwrap().byte_length(), 44);

    let accessors = doc.list_accessors();
    assert_eq!(doc.read_accessor(accessors[0]).unwrap(), vec![0.0, 1.0, 2.0]);
    let positions = doc.accessor(accessors[1]).unwrap();
    assert_eq!(positions.byte_offset(), 8);
    assert_eq!(positions.max.as_deref(), Some(&[1.0, 1.0, 0.0][..]));
}

#[test]
fn test_decode_links_graph() {
    let doc = GlbCodec::new(&registry()).decode(&triangle()).unwrap();
    let scene = doc.default_scene().unwrap();
    let node = doc.scene(scene).unwrap().nodes()[0];
    let node = doc.node(node).unwrap();
    assert_eq!(node.translation, Some([1.0, 2.0, 3.0]));
    let mesh = doc.mesh(node.mesh().unwrap()).unwrap();
    let primitive = doc.primitive(mesh.primitives()[0]).unwrap();
    assert_eq!(primitive.material(), Some(doc.list_materials()[0]));
    assert_eq!(primitive.indices(), Some(doc.list_accessors()[0]));
    assert_eq!(primitive.attribute("POSITION"), Some(doc.list_accessors()[1]));
}

#[test]
fn test_invalid_index() {
    let json = TRIANGLE.replace(r#""material": 0"#, r#""material": 5"#);
    let err = GlbCodec::new(&registry())
        .decode(&glb(&json, &triangle_bin()))
        .unwrap_err();
    assert!(matches!(
        err,
        FormatError::InvalidIndex {
            kind: "material",
            index: 5,
            len: 1
        }
    ));
}

#[test]
fn test_accessor_out_of_bounds() {
    let json = TRIANGLE.replace(r#""count": 3, "type": "VEC3""#, r#""count": 10, "type": "VEC3""#);
    let err = GlbCodec::new(&registry())
        .decode(&glb(&json, &triangle_bin()))
        .unwrap_err();
    assert!(matches!(
        err,
        FormatError::AccessorOutOfBounds {
            accessor: 1,
            needed: 120,
            available: 36
        }
    ));
}

#[test]
fn test_view_out_of_bounds() {
    let json = TRIANGLE.replace(r#""byteOffset": 44, "byteLength": 4"#, r#""byteOffset": 44, "byteLength": 8"#);
    let err = GlbCodec::new(&registry())
        .decode(&glb(&json, &triangle_bin()))
        .unwrap_err();
    assert!(matches!(err, FormatError::ViewOutOfBounds { view: 2, .. }));
}

#[test]
fn test_external_buffer_is_rejected() {
    let json = r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4,"uri":"geometry.bin"}]}"#;
    let err = GlbCodec::new(&registry()).decode(&glb(json, &[])).unwrap_err();
    assert!(matches!(err, FormatError::ExternalResource { index: 0, ref uri } if uri == "geometry.bin"));
}

#[test]
fn test_data_uri_buffer() {
    // 1.5f32 little-endian
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 4, "uri": "data:application/octet-stream;base64,AADAPw=="}],
        "bufferViews": [{"buffer": 0, "byteLength": 4}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 1, "type": "SCALAR"}]
    }"#;
    let doc = GlbCodec::new(&registry()).decode(&glb(json, &[])).unwrap();
    assert_eq!(doc.read_accessor(doc.list_accessors()[0]).unwrap(), vec![1.5]);

    let bad = json.replace(";base64,", ",");
    let err = GlbCodec::new(&registry()).decode(&glb(&bad, &[])).unwrap_err();
    assert!(matches!(err, FormatError::DataUri(_)));
}

#[test]
fn test_sparse_accessor_is_densified() {
    let mut bin = vec![2, 0, 0, 0];
    bin.extend(f32_bytes(&[7.0]));
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 8}],
        "bufferViews": [
            {"buffer": 0, "byteLength": 1},
            {"buffer": 0, "byteOffset": 4, "byteLength": 4}
        ],
        "accessors": [{
            "componentType": 5126, "count": 4, "type": "SCALAR",
            "sparse": {
                "count": 1,
                "indices": {"bufferView": 0, "componentType": 5121},
                "values": {"bufferView": 1}
            }
        }]
    }"#;
    let doc = GlbCodec::new(&registry()).decode(&glb(json, &bin)).unwrap();
    let accessor = doc.list_accessors()[0];
    assert!(doc.accessor(accessor).unwrap().buffer().is_some());
    assert_eq!(doc.read_accessor(accessor).unwrap(), vec![0.0, 0.0, 7.0, 0.0]);
}

#[test]
fn test_sparse_accessor_with_huge_count_is_rejected() {
    let mut bin = vec![2, 0, 0, 0];
    bin.extend(f32_bytes(&[7.0; 16]));
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 68}],
        "bufferViews": [
            {"buffer": 0, "byteLength": 1},
            {"buffer": 0, "byteOffset": 4, "byteLength": 64}
        ],
        "accessors": [{
            "componentType": 5126, "count": 4000000000000000, "type": "MAT4",
            "sparse": {
                "count": 1,
                "indices": {"bufferView": 0, "componentType": 5121},
                "values": {"bufferView": 1}
            }
        }]
    }"#;
    let err = GlbCodec::new(&registry()).decode(&glb(json, &bin)).unwrap_err();
    assert!(matches!(err, FormatError::AccessorOutOfBounds { accessor: 0, .. }));

    // Same count, but backed by a view that cannot hold it
    let backed = json.replace(r#""componentType": 5126, "count""#, r#""bufferView": 1, "componentType": 5126, "count""#);
    let err = GlbCodec::new(&registry()).decode(&glb(&backed, &bin)).unwrap_err();
    assert!(matches!(
        err,
        FormatError::AccessorOutOfBounds {
            accessor: 0,
            available: 64,
            ..
        }
    ));
}

#[test]
fn test_sparse_ranges_are_checked() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 8}],
        "bufferViews": [
            {"buffer": 0, "byteLength": 1},
            {"buffer": 0, "byteOffset": 4, "byteLength": 4}
        ],
        "accessors": [{
            "componentType": 5126, "count": 4, "type": "SCALAR",
            "sparse": {
                "count": 2,
                "indices": {"bufferView": 0, "componentType": 5121},
                "values": {"bufferView": 1}
            }
        }]
    }"#;
    let mut bin = vec![2, 0, 0, 0];
    bin.extend(f32_bytes(&[7.0]));
    let err = GlbCodec::new(&registry()).decode(&glb(json, &bin)).unwrap_err();
    assert!(matches!(
        err,
        FormatError::AccessorOutOfBounds {
            accessor: 0,
            needed: 2,
            available: 1
        }
    ));

    let offset = json.replace(
        r#""values": {"bufferView": 1}"#,
        r#""values": {"bufferView": 1, "byteOffset": 18446744073709551615}"#,
    );
    let offset = offset.replace(r#""count": 2,"#, r#""count": 1,"#);
    let err = GlbCodec::new(&registry()).decode(&glb(&offset, &bin)).unwrap_err();
    assert!(matches!(err, FormatError::AccessorOutOfBounds { accessor: 0, .. }));

    let too_many = json.replace(r#""count": 2,"#, r#""count": 5,"#);
    let err = GlbCodec::new(&registry()).decode(&glb(&too_many, &bin)).unwrap_err();
    assert!(matches!(
        err,
        FormatError::InvalidIndex {
            kind: "sparse count",
            index: 5,
            len: 4
        }
    ));
}

#[test]
fn test_interleaved_stride_survives_round_trip() {
    // Two vertices of position (12 bytes) + uv (8 bytes)
    let bin = f32_bytes(&[0.0, 0.0, 0.0, 0.25, 0.75, 1.0, 2.0, 3.0, 0.5, 0.5]);
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 40}],
        "bufferViews": [{"buffer": 0, "byteLength": 40, "byteStride": 20, "target": 34962}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 2, "type": "VEC2"}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "TEXCOORD_0": 1}}]}]
    }"#;
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&glb(json, &bin)).unwrap();
    let [pos, uv] = [doc.list_accessors()[0], doc.list_accessors()[1]];
    assert_eq!(doc.accessor(uv).unwrap().byte_stride(), Some(20));
    assert_eq!(doc.read_accessor(uv).unwrap(), vec![0.25, 0.75, 0.5, 0.5]);

    let again = codec.decode(&codec.encode(&doc)).unwrap();
    let [pos2, uv2] = [again.list_accessors()[0], again.list_accessors()[1]];
    assert_eq!(again.read_accessor(pos2), doc.read_accessor(pos));
    assert_eq!(again.read_accessor(uv2), doc.read_accessor(uv));
    assert_eq!(again.accessor(pos2).unwrap().byte_stride(), Some(20));
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encoded_framing_is_consistent() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&triangle()).unwrap();
    let bytes = codec.encode(&doc);

    let header = GlbHeader::from_bytes(&bytes).unwrap();
    assert_eq!(header, GlbHeader::new(bytes.len() as u32));
    assert_eq!(bytes.len() % 4, 0);

    let json = ChunkHeader::from_bytes(&bytes[12..]).unwrap();
    assert_eq!(json.length % 4, 0);
    let bin_at = 20 + json.length as usize;
    let bin = ChunkHeader::from_bytes(&bytes[bin_at..]).unwrap();
    assert_eq!(bin.kind, CHUNK_BIN);
    assert_eq!(bin_at + 8 + bin.length as usize, bytes.len());

    let text = json_text(&bytes);
    assert!(text.trim_end_matches(' ').ends_with('}'));
}

#[test]
fn test_encode_rewrites_generator_only() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&triangle()).unwrap();
    let json = json_of(&codec.encode(&doc));
    assert_eq!(json["asset"]["generator"], GENERATOR);
    assert_eq!(json["asset"]["copyright"], "nobody");
    assert_eq!(json["asset"]["version"], "2.0");
    assert_eq!(json["buffers"].as_array().unwrap().len(), 1);
    assert_eq!(json["buffers"][0]["byteLength"], 44);
    assert_eq!(json["bufferViews"][0]["target"], 34963);
    assert_eq!(json["bufferViews"][1]["target"], 34962);
    assert_eq!(json["materials"][0]["doubleSided"], true);
    assert_eq!(json["scene"], 0);
}

#[test]
fn test_empty_document_has_no_bin_chunk() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let bytes = codec.encode(&Document::new());
    let json = ChunkHeader::from_bytes(&bytes[12..]).unwrap();
    assert_eq!(20 + json.length as usize, bytes.len());
    assert!(codec.decode(&bytes).is_ok());
}

#[test]
fn test_unused_strided_accessors_keep_their_layout() {
    let mut doc = Document::new();
    crate::transform::minimize(&mut doc);

    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let bytes = codec.encode(&doc);
    let json = json_of(&bytes);
    assert_eq!(json["buffers"][0]["byteLength"], 108);
    let views = json["bufferViews"].as_array().unwrap();
    assert_eq!(views.len(), 3);
    assert_eq!(views[2]["byteOffset"], 60);
    assert_eq!(views[2]["byteStride"], 12);

    let again = codec.decode(&bytes).unwrap();
    assert_eq!(again.buffer(again.list_buffers()[0]).unwrap().byte_length(), 108);
    for (a, b) in doc.list_accessors().iter().zip(again.list_accessors()) {
        assert_eq!(doc.read_accessor(*a), again.read_accessor(*b));
    }
}

#[test]
fn test_strided_animation_data_is_repacked() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let times = doc.create_accessor();
    doc.set_accessor_array(
        times,
        buffer,
        AccessorType::Scalar,
        &AccessorArray::F32(vec![0.0, 1.0]),
        Some(8),
    );
    let animation = doc.create_animation();
    doc.add_sampler(animation, Some(times), Some(times), None);

    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let bytes = codec.encode(&doc);
    let json = json_of(&bytes);
    let view = &json["bufferViews"][0];
    assert!(view.get("byteStride").is_none());
    assert!(view.get("target").is_none());
    assert_eq!(view["byteLength"], 8);

    let again = codec.decode(&bytes).unwrap();
    assert_eq!(
        again.read_accessor(again.list_accessors()[0]).unwrap(),
        vec![0.0, 1.0]
    );
}

#[test]
fn test_image_survives_with_sniffed_mime_type() {
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 8}],
        "bufferViews": [{"buffer": 0, "byteLength": 8}],
        "images": [{"bufferView": 0, "name": "albedo"}],
        "samplers": [{"magFilter": 9729}],
        "textures": [{"source": 0, "sampler": 0}]
    }"#;
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&glb(json, &png)).unwrap();
    let texture = doc.texture(doc.list_textures()[0]).unwrap();
    assert_eq!(texture.data, png);
    // Image-only bytes are not kept in any buffer
    assert_eq!(doc.buffer(doc.list_buffers()[0]).unwrap().byte_length(), 0);

    let bytes = codec.encode(&doc);
    let out = json_of(&bytes);
    assert_eq!(out["images"][0]["mimeType"], "image/png");
    assert_eq!(out["images"][0]["name"], "albedo");
    assert_eq!(out["textures"][0]["source"], 0);
    assert_eq!(out["samplers"][0]["magFilter"], 9729);

    let again = codec.decode(&bytes).unwrap();
    assert_eq!(again.texture(again.list_textures()[0]).unwrap().data, png);
}

#[test]
fn test_sniff_mime_type() {
    assert_eq!(sniff_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
    assert_eq!(sniff_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
    assert_eq!(sniff_mime_type(b"GIF89a"), None);
}

// ============================================================================
// Extensions
// ============================================================================

const EXTENDED: &str = r#"{
    "asset": {"version": "2.0"},
    "extensionsUsed": ["EXT_custom", "KHR_texture_transform", "KHR_materials_emissive_strength"],
    "extensionsRequired": ["EXT_custom"],
    "materials": [{
        "pbrMetallicRoughness": {"baseColorTexture": {"index": 0, "extensions": {"KHR_texture_transform": {"scale": [2, 2]}}}},
        "extensions": {"KHR_materials_emissive_strength": {"emissiveStrength": 3}}
    }],
    "nodes": [{"extensions": {"EXT_custom": { "keep" : [1, 2] }}, "extras": {"tag": "x"}}]
}"#;

#[test]
fn test_opaque_extension_is_verbatim() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&glb(EXTENDED, &[])).unwrap();
    let node = doc.node(doc.list_nodes()[0]).unwrap();
    assert_eq!(node.extensions["EXT_custom"].as_opaque(), Some(r#"{ "keep" : [1, 2] }"#));

    let bytes = codec.encode(&doc);
    let text = json_text(&bytes);
    assert!(text.contains(r#""EXT_custom":{ "keep" : [1, 2] }"#));
    assert!(text.contains(r#""extras":{"tag": "x"}"#));

    let json = json_of(&bytes);
    assert_eq!(
        json["extensionsUsed"],
        serde_json::json!(["EXT_custom", "KHR_materials_emissive_strength", "KHR_texture_transform"])
    );
    assert_eq!(json["extensionsRequired"], serde_json::json!(["EXT_custom"]));
}

#[test]
fn test_known_extension_is_typed() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&glb(EXTENDED, &[])).unwrap();
    let material = doc.material(doc.list_materials()[0]).unwrap();
    match &material.extensions[KHR_MATERIALS_EMISSIVE_STRENGTH] {
        Extension::EmissiveStrength(ext) => assert_eq!(ext.emissive_strength, 3.0),
        other => panic!("expected typed payload, got {other:?}"),
    }

    let json = json_of(&codec.encode(&doc));
    assert_eq!(
        json["materials"][0]["extensions"][KHR_MATERIALS_EMISSIVE_STRENGTH]["emissiveStrength"],
        3.0
    );
}

#[test]
fn test_known_extension_keeps_unmodeled_fields() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "materials": [{"extensions": {"KHR_materials_ior": {"ior": 1.4, "extras": {"tag": "keep me"}}}}]
    }"#;
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let doc = codec.decode(&glb(json, &[])).unwrap();
    let material = doc.material(doc.list_materials()[0]).unwrap();
    assert!(matches!(material.extensions["KHR_materials_ior"], Extension::Ior(_)));

    let out = json_of(&codec.encode(&doc));
    assert_eq!(
        out["materials"][0]["extensions"]["KHR_materials_ior"],
        serde_json::json!({"ior": 1.4, "extras": {"tag": "keep me"}})
    );
}

#[test]
fn test_disabled_registry_keeps_payload_opaque() {
    let registry = ExtensionRegistry::new();
    let doc = GlbCodec::new(&registry).decode(&glb(EXTENDED, &[])).unwrap();
    let material = doc.material(doc.list_materials()[0]).unwrap();
    assert_eq!(
        material.extensions[KHR_MATERIALS_EMISSIVE_STRENGTH].as_opaque(),
        Some(r#"{"emissiveStrength": 3}"#)
    );
}

#[test]
fn test_extensions_used_follow_live_entities() {
    let registry = registry();
    let codec = GlbCodec::new(&registry);
    let mut doc = codec.decode(&glb(EXTENDED, &[])).unwrap();
    let node = doc.list_nodes()[0];
    doc.dispose(node);

    let json = json_of(&codec.encode(&doc));
    let used = json["extensionsUsed"].as_array().unwrap();
    assert!(!used.iter().any(|name| name == "EXT_custom"));
    // Still referenced from inside the material payload
    assert!(used.iter().any(|name| name == "KHR_texture_transform"));
    assert!(json.get("extensionsRequired").is_none());
}
