//! Stable entity identifiers

use slotmap::new_key_type;

new_key_type! {
    pub struct BufferKey;
    pub struct AccessorKey;
    pub struct PrimitiveKey;
    pub struct MeshKey;
    pub struct NodeKey;
    pub struct SceneKey;
    pub struct MaterialKey;
    pub struct TextureKey;
    pub struct SkinKey;
    pub struct AnimationKey;
}

/// Any entity owned by a [`Document`](super::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Buffer(BufferKey),
    Accessor(AccessorKey),
    Primitive(PrimitiveKey),
    Mesh(MeshKey),
    Node(NodeKey),
    Scene(SceneKey),
    Material(MaterialKey),
    Texture(TextureKey),
    Skin(SkinKey),
    Animation(AnimationKey),
}

macro_rules! entity_from_key {
    ($($key:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$key> for EntityId {
                fn from(key: $key) -> Self {
                    EntityId::$variant(key)
                }
            }
        )*
    };
}

entity_from_key! {
    BufferKey => Buffer,
    AccessorKey => Accessor,
    PrimitiveKey => Primitive,
    MeshKey => Mesh,
    NodeKey => Node,
    SceneKey => Scene,
    MaterialKey => Material,
    TextureKey => Texture,
    SkinKey => Skin,
    AnimationKey => Animation,
}
