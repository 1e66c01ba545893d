//! Decode, minimize, encode

use crate::container::GlbCodec;
use crate::error::Result;
use crate::extensions::ExtensionRegistry;
use crate::transform::minimize;

/// Minimize a GLB file.
///
/// Malformed input is the only failure; the transform and the encoder cannot
/// fail once a document has been decoded.
pub fn minimize_glb(bytes: &[u8], registry: &ExtensionRegistry) -> Result<Vec<u8>> {
    let codec = GlbCodec::new(registry);
    let mut doc = codec.decode(bytes)?;
    minimize(&mut doc);
    let out = codec.encode(&doc);
    tracing::debug!(input = bytes.len(), output = out.len(), "minimized container");
    Ok(out)
}
