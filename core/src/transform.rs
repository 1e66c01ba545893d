//! Material-preserving minimization
//!
//! Replaces all geometry and scene structure with a single unit quad, drawn
//! once per material. Materials, textures and texture bindings are left
//! untouched, so every material slot of the input is still present.

use crate::document::{Document, EntityId, MaterialKey};
use crate::types::{AccessorArray, AccessorType};

/// Two triangles covering the quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

pub const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [0.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Element stride shared by the position and UV accessors.
pub const VERTEX_STRIDE: usize = 12;

fn dispose_all<K: Into<EntityId> + Copy>(doc: &mut Document, list: fn(&Document) -> &[K]) {
    for key in list(doc).to_vec() {
        doc.dispose(key);
    }
}

/// Minimize `doc` in place. Cannot fail.
///
/// Afterwards the document holds one buffer, three accessors (indices,
/// positions, UVs), one mesh with a primitive per material in material order,
/// one node and one scene. With no materials the mesh has no primitives.
pub fn minimize(doc: &mut Document) {
    let before = doc.counts();
    let materials: Vec<MaterialKey> = doc.list_materials().to_vec();

    dispose_all(doc, Document::list_skins);
    dispose_all(doc, Document::list_animations);
    dispose_all(doc, Document::list_meshes);
    dispose_all(doc, Document::list_nodes);
    dispose_all(doc, Document::list_scenes);
    dispose_all(doc, Document::list_accessors);
    dispose_all(doc, Document::list_buffers);
    // Primitives only live inside meshes; any strays go too
    dispose_all(doc, Document::list_primitives);
    tracing::trace!(counts = %doc.counts(), "cleared geometry");

    let buffer = doc.create_buffer();

    let indices = doc.create_accessor();
    doc.set_accessor_array(
        indices,
        buffer,
        AccessorType::Scalar,
        &AccessorArray::U16(QUAD_INDICES.to_vec()),
        None,
    );
    let positions = doc.create_accessor();
    doc.set_accessor_array(
        positions,
        buffer,
        AccessorType::Vec3,
        &AccessorArray::F32(QUAD_POSITIONS.as_flattened().to_vec()),
        Some(VERTEX_STRIDE),
    );
    let uvs = doc.create_accessor();
    doc.set_accessor_array(
        uvs,
        buffer,
        AccessorType::Vec2,
        &AccessorArray::F32(QUAD_UVS.as_flattened().to_vec()),
        Some(VERTEX_STRIDE),
    );
    for accessor in [indices, positions, uvs] {
        doc.update_bounds(accessor);
    }

    let mesh = doc.create_mesh();
    for material in materials {
        let primitive = doc.create_primitive();
        doc.set_attribute(primitive, "POSITION", Some(positions));
        doc.set_attribute(primitive, "TEXCOORD_0", Some(uvs));
        doc.set_indices(primitive, Some(indices));
        doc.set_material(primitive, Some(material));
        doc.add_primitive(mesh, primitive);
    }

    let node = doc.create_node();
    doc.set_mesh(node, Some(mesh));
    let scene = doc.create_scene();
    doc.add_root(scene, node);

    tracing::debug!(before = %before, after = %doc.counts(), "minimized document");
}
