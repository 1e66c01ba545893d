//! Binary glTF (GLB) container codec
//!
//! A GLB file is a 12-byte header followed by chunks: a JSON scene
//! description, then an optional BIN chunk of packed binary data. The codec
//! turns such a file into a [`Document`] and back.

mod header;
mod read;
mod schema;
mod write;

#[cfg(test)]
mod tests;

use crate::document::Document;
use crate::error::Result;
use crate::extensions::ExtensionRegistry;

pub use header::{CHUNK_BIN, CHUNK_JSON, ChunkHeader, GlbHeader, MAGIC, VERSION};
pub use write::{GENERATOR, assemble, sniff_mime_type};

/// Decoder and encoder bound to one extension registry.
#[derive(Debug, Clone, Copy)]
pub struct GlbCodec<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> GlbCodec<'a> {
    pub fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a ExtensionRegistry {
        self.registry
    }

    /// Parse a GLB file. Fails without producing a partial document.
    pub fn decode(&self, bytes: &[u8]) -> Result<Document> {
        read::decode(bytes, self.registry)
    }

    /// Serialize a document. Header and chunk lengths are always consistent.
    pub fn encode(&self, doc: &Document) -> Vec<u8> {
        write::encode(doc)
    }
}
