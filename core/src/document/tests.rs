use super::*;

fn triangle(doc: &mut Document, buffer: BufferKey) -> AccessorKey {
    let accessor = doc.create_accessor();
    let positions = AccessorArray::F32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    assert!(doc.set_accessor_array(accessor, buffer, AccessorType::Vec3, &positions, None));
    accessor
}

/// Scene → node → mesh → primitive → accessor → buffer, with a material.
struct Chain {
    buffer: BufferKey,
    accessor: AccessorKey,
    primitive: PrimitiveKey,
    mesh: MeshKey,
    node: NodeKey,
    scene: SceneKey,
    material: MaterialKey,
}

fn chain(doc: &mut Document) -> Chain {
    let buffer = doc.create_buffer();
    let accessor = triangle(doc, buffer);
    let material = doc.create_material();
    let primitive = doc.create_primitive();
    doc.set_attribute(primitive, "POSITION", Some(accessor));
    doc.set_material(primitive, Some(material));
    let mesh = doc.create_mesh();
    doc.add_primitive(mesh, primitive);
    let node = doc.create_node();
    doc.set_mesh(node, Some(mesh));
    let scene = doc.create_scene();
    doc.add_root(scene, node);
    doc.set_default_scene(Some(scene));
    Chain {
        buffer,
        accessor,
        primitive,
        mesh,
        node,
        scene,
        material,
    }
}

#[test]
fn test_create_and_list_in_order() {
    let mut doc = Document::new();
    let a = doc.create_node();
    let b = doc.create_node();
    let c = doc.create_node();
    doc.dispose(b);
    assert_eq!(doc.list_nodes(), &[a, c]);
    assert_eq!(doc.counts().nodes, 2);
}

#[test]
fn test_set_accessor_array_aligns_and_reads_back() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();

    let indices = doc.create_accessor();
    let idx = AccessorArray::U16(vec![0, 1, 2]);
    assert!(doc.set_accessor_array(indices, buffer, AccessorType::Scalar, &idx, None));
    assert_eq!(doc.buffer(buffer).unwrap().byte_length(), 6);

    let positions = triangle(&mut doc, buffer);
    let acc = doc.accessor(positions).unwrap();
    assert_eq!(acc.byte_offset(), 8);
    assert_eq!(acc.count(), 3);
    assert_eq!(doc.buffer(buffer).unwrap().byte_length(), 8 + 36);
    assert_eq!(doc.read_accessor(indices).unwrap(), vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_padded_stride_layout() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let uvs = doc.create_accessor();
    let data = AccessorArray::F32(vec![0.0, 1.0, 1.0, 0.0]);
    assert!(doc.set_accessor_array(uvs, buffer, AccessorType::Vec2, &data, Some(12)));

    let acc = doc.accessor(uvs).unwrap();
    assert_eq!(acc.byte_stride(), Some(12));
    assert_eq!(acc.byte_span(), 20);
    assert_eq!(doc.buffer(buffer).unwrap().byte_length(), 24);
    assert_eq!(doc.read_accessor(uvs).unwrap(), vec![0.0, 1.0, 1.0, 0.0]);

    // Stride narrower than an element is rejected
    let bad = doc.create_accessor();
    assert!(!doc.set_accessor_array(bad, buffer, AccessorType::Vec2, &data, Some(4)));
}

#[test]
fn test_update_bounds() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessor = triangle(&mut doc, buffer);
    assert!(doc.update_bounds(accessor));
    let acc = doc.accessor(accessor).unwrap();
    assert_eq!(acc.min.as_deref(), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(acc.max.as_deref(), Some(&[1.0, 1.0, 0.0][..]));
}

#[test]
fn test_bufferless_accessor_reads_zeros() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessor = triangle(&mut doc, buffer);
    doc.dispose(buffer);

    let acc = doc.accessor(accessor).unwrap();
    assert_eq!(acc.buffer(), None);
    assert_eq!(doc.read_accessor(accessor).unwrap(), vec![0.0; 9]);
}

#[test]
fn test_dispose_accessor_clears_primitive() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    doc.set_indices(c.primitive, Some(c.accessor));

    doc.dispose(c.accessor);

    let prim = doc.primitive(c.primitive).unwrap();
    assert_eq!(prim.attribute("POSITION"), None);
    assert_eq!(prim.indices(), None);
    assert!(doc.referrers(c.buffer).is_empty());
    assert!(doc.dangling_references().is_empty());
}

#[test]
fn test_dispose_material_clears_primitive() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    doc.dispose(c.material);
    assert_eq!(doc.primitive(c.primitive).unwrap().material(), None);
    assert!(doc.dangling_references().is_empty());
}

#[test]
fn test_dispose_mesh_takes_primitives() {
    let mut doc = Document::new();
    let c = chain(&mut doc);

    doc.dispose(c.mesh);

    assert!(!doc.contains(c.primitive));
    assert_eq!(doc.node(c.node).unwrap().mesh(), None);
    // Accessor and material survive, without referrers
    assert!(doc.referrers(c.accessor).is_empty());
    assert!(doc.referrers(c.material).is_empty());
    assert!(doc.dangling_references().is_empty());
}

#[test]
fn test_dispose_node_clears_every_holder() {
    let mut doc = Document::new();
    let c = chain(&mut doc);

    let parent = doc.create_node();
    assert!(doc.add_child(parent, c.node));

    let skin = doc.create_skin();
    doc.add_joint(skin, c.node);
    doc.set_skeleton(skin, Some(c.node));

    let animation = doc.create_animation();
    let sampler = doc
        .add_sampler(animation, Some(c.accessor), Some(c.accessor), None)
        .unwrap();
    doc.add_channel(animation, sampler, Some(c.node), "translation")
        .unwrap();

    doc.dispose(c.node);

    assert!(doc.scene(c.scene).unwrap().nodes().is_empty());
    assert!(doc.node(parent).unwrap().children().is_empty());
    let skin = doc.skin(skin).unwrap();
    assert!(skin.joints().is_empty());
    assert_eq!(skin.skeleton(), None);
    assert_eq!(doc.animation(animation).unwrap().channels()[0].node(), None);
    assert!(doc.dangling_references().is_empty());
}

#[test]
fn test_dispose_scene_clears_default() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    assert_eq!(doc.default_scene(), Some(c.scene));
    doc.dispose(c.scene);
    assert_eq!(doc.default_scene(), None);
    // The node is no longer held by anything
    assert!(doc.referrers(c.node).is_empty());
}

#[test]
fn test_dispose_texture_clears_bindings() {
    let mut doc = Document::new();
    let texture = doc.create_texture();
    let index = doc.add_texture_binding(TextureBinding::new(Some(texture)));
    doc.dispose(texture);
    assert_eq!(doc.texture_bindings()[index].source(), None);
}

#[test]
fn test_dispose_skin_clears_node() {
    let mut doc = Document::new();
    let node = doc.create_node();
    let skin = doc.create_skin();
    doc.set_skin(node, Some(skin));
    doc.dispose(skin);
    assert_eq!(doc.node(node).unwrap().skin(), None);
}

#[test]
fn test_dispose_is_idempotent() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    doc.dispose(c.buffer);
    let before = doc.counts();
    doc.dispose(c.buffer);
    assert_eq!(doc.counts(), before);
    assert!(!doc.contains(c.buffer));
}

#[test]
fn test_stale_key_setters_are_noops() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    doc.dispose(c.material);

    assert!(!doc.set_material(c.primitive, Some(c.material)));
    assert!(doc.material_mut(c.material).is_none());

    doc.dispose(c.scene);
    assert!(!doc.set_default_scene(Some(c.scene)));
    assert!(!doc.add_root(c.scene, c.node));
}

#[test]
fn test_add_child_moves_and_refuses_cycles() {
    let mut doc = Document::new();
    let a = doc.create_node();
    let b = doc.create_node();
    let c = doc.create_node();

    assert!(doc.add_child(a, c));
    assert!(doc.add_child(b, c));
    assert!(doc.node(a).unwrap().children().is_empty());
    assert_eq!(doc.parent(c), Some(b));

    assert!(!doc.add_child(c, b));
    assert!(!doc.add_child(a, a));
}

#[test]
fn test_texture_outlives_buffers() {
    let mut doc = Document::new();
    let c = chain(&mut doc);
    let texture = doc.create_texture();
    doc.texture_mut(texture).unwrap().data = vec![0x89, b'P', b'N', b'G'];

    doc.dispose(c.buffer);

    assert_eq!(doc.texture(texture).unwrap().data, vec![0x89, b'P', b'N', b'G']);
}
