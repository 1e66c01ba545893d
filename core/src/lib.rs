//! glbmin core - binary glTF minimization
//!
//! Decodes a GLB file into an in-memory scene document, replaces its geometry
//! with a unit quad drawn once per material, and encodes the result back into
//! a valid GLB file.
//!
//! # Architecture
//!
//! - [`GlbCodec`] - Container decoding and encoding, bound to an [`ExtensionRegistry`]
//! - [`Document`] - Entity pools with a reverse-reference index and cascading disposal
//! - [`minimize`] - The material-preserving transform
//! - [`minimize_glb`] - Bytes in, bytes out

pub mod container;
pub mod document;
pub mod error;
pub mod extensions;
mod pipeline;
pub mod transform;
pub mod types;

// Re-export the document model
pub use document::{
    Accessor, AccessorKey, Animation, AnimationChannel, AnimationKey, AnimationSampler, Asset,
    Buffer, BufferKey, Document, EntityCounts, EntityId, Extras, Material, MaterialKey, Mesh,
    MeshKey, Node, NodeKey, Primitive, PrimitiveKey, Scene, SceneKey, Skin, SkinKey, Texture,
    TextureBinding, TextureKey,
};

// Re-export codec and error types
pub use container::{GENERATOR, GlbCodec};
pub use error::{FormatError, Result};

// Re-export extension types
pub use extensions::{Extension, ExtensionKind, ExtensionMap, ExtensionRegistry, UnknownExtension};

pub use pipeline::minimize_glb;
pub use transform::minimize;
pub use types::{AccessorArray, AccessorType, ComponentType};
