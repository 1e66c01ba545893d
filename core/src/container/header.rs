//! GLB file and chunk headers

/// `glTF` read as a little-endian u32.
pub const MAGIC: u32 = 0x4654_6C67;
/// The only container version this codec reads and writes.
pub const VERSION: u32 = 2;
/// Chunk tag for the scene description.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// Chunk tag for packed binary data.
pub const CHUNK_BIN: u32 = 0x004E_4942;

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// File header (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub magic: u32,
    pub version: u32,
    /// Total file length including this header.
    pub length: u32,
}

impl GlbHeader {
    pub const SIZE: usize = 12;

    pub fn new(length: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            length,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.length.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: read_u32(bytes, 0),
            version: read_u32(bytes, 4),
            length: read_u32(bytes, 8),
        })
    }
}

/// Chunk header (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Payload length, padding included.
    pub length: u32,
    pub kind: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.length.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.kind.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            length: read_u32(bytes, 0),
            kind: read_u32(bytes, 4),
        })
    }
}
