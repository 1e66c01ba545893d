//! GLB fixture construction for glbmin tests
//!
//! Builds input files independently of the glbmin codec, so decoder and
//! encoder tests never validate themselves against their own output:
//! - BufferBuilder: Pack binary data with automatic alignment
//! - MeshBuilder: Vertex streams for one primitive, optionally interleaved
//! - GltfBuilder: Materials, meshes, hierarchy, skins, animations, images and
//!   raw extension payloads
//!
//! # Example
//!
//! ```
//! use glb_builder::*;
//!
//! let mut buffer = BufferBuilder::new();
//! let triangle = MeshBuilder::new()
//!     .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
//!     .indices(&[0, 1, 2])
//!     .build(&mut buffer);
//!
//! let mut gltf = GltfBuilder::new();
//! let material = gltf.add_material("Red");
//! let mesh = gltf.add_mesh("Triangle", &triangle, Some(material));
//! let node = gltf.add_node("Triangle", Some(mesh));
//! gltf.add_scene("Scene", &[node]);
//!
//! let glb_bytes = gltf.build_glb(&buffer, "glb-builder");
//! assert_eq!(&glb_bytes[0..4], b"glTF");
//! ```

pub mod buffer;
pub mod document;
pub mod mesh;
pub mod utils;

pub use buffer::{AccessorIndex, BufferBuilder, ViewIndex};
pub use document::{ExtensionSite, GltfBuilder};
pub use mesh::{MeshAccessors, MeshBuilder};
pub use utils::{align_buffer, assemble_glb, compute_bounds};

pub use gltf_json as json;
