//! Error types for container decoding
//!
//! Decoding is the only fallible stage of the pipeline. Every malformation is
//! reported as a [`FormatError`] and no partial [`Document`](crate::Document)
//! is ever returned.

use thiserror::Error;

/// Result alias used by the codec.
pub type Result<T> = std::result::Result<T, FormatError>;

/// A malformed or unsupported binary container.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The first four bytes are not `glTF`.
    #[error("invalid magic {found:#010x}, expected glTF")]
    BadMagic { found: u32 },

    /// Container version other than 2.
    #[error("unsupported container version {0}, expected 2")]
    UnsupportedVersion(u32),

    /// Input ends before a structure it must contain.
    #[error("truncated input: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The header declares more bytes than the input holds.
    #[error("header declares {declared} bytes but input is {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    /// A chunk's declared length runs past the declared file length.
    #[error("chunk at offset {offset} ends at {end}, past declared length {total}")]
    ChunkOverrun {
        offset: usize,
        end: usize,
        total: usize,
    },

    /// The first chunk is not tagged JSON.
    #[error("first chunk must be JSON, found tag {found:#010x}")]
    MissingJsonChunk { found: u32 },

    /// Scene description text is not valid JSON for the expected schema.
    #[error("invalid scene description: {0}")]
    Json(#[from] serde_json::Error),

    /// `asset.version` is not a 2.x version.
    #[error("unsupported asset version {0:?}")]
    UnsupportedAssetVersion(String),

    /// A cross-reference points outside its target array.
    #[error("{kind} index {index} out of range (len {len})")]
    InvalidIndex {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// Buffer 0 has no URI but the file carries no BIN chunk, or the chunk is short.
    #[error("buffer needs {needed} bytes from the BIN chunk, found {available}")]
    MissingBinaryChunk { needed: usize, available: usize },

    /// A buffer references data outside the container.
    #[error("buffer {index} references external resource {uri:?}")]
    ExternalResource { index: usize, uri: String },

    /// A `data:` URI that cannot be decoded.
    #[error("invalid data URI: {0}")]
    DataUri(String),

    /// A buffer view extends past the end of its buffer.
    #[error("buffer view {view} [{start}, {end}) exceeds buffer {buffer} of {len} bytes")]
    ViewOutOfBounds {
        view: usize,
        buffer: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    /// An accessor extends past the end of its buffer view.
    #[error("accessor {accessor} needs {needed} bytes but its view holds {available}")]
    AccessorOutOfBounds {
        accessor: usize,
        needed: usize,
        available: usize,
    },

    /// A registered extension carries a payload that does not match its schema.
    #[error("extension {name}: {source}")]
    Extension {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
