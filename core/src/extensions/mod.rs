//! Extension registry and per-entity extension payloads
//!
//! The registry is an immutable value built once at startup and passed by
//! reference into the codec. Payloads of enabled, known extensions decode into
//! typed shapes; every other payload is kept as the exact JSON text it arrived
//! as and written back verbatim.

mod khr;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;

use crate::error::{FormatError, Result};

pub use khr::{
    EmissiveStrength, Ior, LightType, LightsPunctual, NodeLight, PunctualLight, Spot, Unlit,
};

pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";
pub const KHR_MATERIALS_EMISSIVE_STRENGTH: &str = "KHR_materials_emissive_strength";
pub const KHR_MATERIALS_IOR: &str = "KHR_materials_ior";
pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";

/// Raw extension payloads as they appear in the JSON chunk.
pub(crate) type RawExtensions = BTreeMap<String, Box<RawValue>>;

/// Extensions attached to one entity, keyed by extension name.
pub type ExtensionMap = BTreeMap<String, Extension>;

/// The closed set of extensions with a typed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionKind {
    MaterialsUnlit,
    MaterialsEmissiveStrength,
    MaterialsIor,
    LightsPunctual,
}

impl ExtensionKind {
    pub const ALL: [ExtensionKind; 4] = [
        Self::MaterialsUnlit,
        Self::MaterialsEmissiveStrength,
        Self::MaterialsIor,
        Self::LightsPunctual,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MaterialsUnlit => KHR_MATERIALS_UNLIT,
            Self::MaterialsEmissiveStrength => KHR_MATERIALS_EMISSIVE_STRENGTH,
            Self::MaterialsIor => KHR_MATERIALS_IOR,
            Self::LightsPunctual => KHR_LIGHTS_PUNCTUAL,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Decode a payload found on `target`.
    ///
    /// Returns `Ok(None)` when this extension has no typed shape at that
    /// attachment point; the caller keeps the payload opaque.
    fn decode(
        self,
        target: ExtensionTarget,
        raw: &RawValue,
    ) -> serde_json::Result<Option<Extension>> {
        let text = raw.get();
        let ext = match (self, target) {
            (Self::MaterialsUnlit, ExtensionTarget::Material) => {
                Extension::Unlit(serde_json::from_str(text)?)
            }
            (Self::MaterialsEmissiveStrength, ExtensionTarget::Material) => {
                Extension::EmissiveStrength(serde_json::from_str(text)?)
            }
            (Self::MaterialsIor, ExtensionTarget::Material) => {
                Extension::Ior(serde_json::from_str(text)?)
            }
            (Self::LightsPunctual, ExtensionTarget::Root) => {
                Extension::Lights(serde_json::from_str(text)?)
            }
            (Self::LightsPunctual, ExtensionTarget::Node) => {
                Extension::NodeLight(serde_json::from_str(text)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(ext))
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where in the document an extension payload is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionTarget {
    Root,
    Buffer,
    Accessor,
    Primitive,
    Mesh,
    Node,
    Scene,
    Material,
    Texture,
    TextureBinding,
    Skin,
    Animation,
}

/// One extension payload.
#[derive(Debug, Clone)]
pub enum Extension {
    Unlit(Unlit),
    EmissiveStrength(EmissiveStrength),
    Ior(Ior),
    Lights(LightsPunctual),
    NodeLight(NodeLight),
    /// Anything outside the enabled registry, kept as exact JSON text.
    Opaque(Box<RawValue>),
}

impl Extension {
    /// The verbatim payload of an opaque extension.
    pub fn as_opaque(&self) -> Option<&str> {
        match self {
            Self::Opaque(raw) => Some(raw.get()),
            _ => None,
        }
    }
}

impl Serialize for Extension {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Unlit(ext) => ext.serialize(serializer),
            Self::EmissiveStrength(ext) => ext.serialize(serializer),
            Self::Ior(ext) => ext.serialize(serializer),
            Self::Lights(ext) => ext.serialize(serializer),
            Self::NodeLight(ext) => ext.serialize(serializer),
            Self::Opaque(raw) => raw.serialize(serializer),
        }
    }
}

/// A configured extension name that the registry does not know.
#[derive(Debug, Error)]
#[error("unknown extension {0:?}")]
pub struct UnknownExtension(pub String);

/// Process-wide, read-only set of extensions decoded into typed shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRegistry {
    enabled: BTreeSet<ExtensionKind>,
}

impl ExtensionRegistry {
    /// A registry with nothing enabled: every payload stays opaque.
    pub fn new() -> Self {
        Self {
            enabled: BTreeSet::new(),
        }
    }

    /// A registry with every known extension enabled.
    pub fn khronos() -> Self {
        Self {
            enabled: ExtensionKind::ALL.into_iter().collect(),
        }
    }

    pub fn with(mut self, kind: ExtensionKind) -> Self {
        self.enabled.insert(kind);
        self
    }

    /// Build a registry from extension names, rejecting any name without a typed shape.
    pub fn from_names<I, S>(names: I) -> std::result::Result<Self, UnknownExtension>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            let kind =
                ExtensionKind::from_name(name).ok_or_else(|| UnknownExtension(name.to_string()))?;
            registry.enabled.insert(kind);
        }
        Ok(registry)
    }

    pub fn is_enabled(&self, kind: ExtensionKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ExtensionKind> + '_ {
        self.enabled.iter().copied()
    }

    /// Decode the raw extension object of one entity.
    pub(crate) fn decode_map(
        &self,
        target: ExtensionTarget,
        raw: Option<RawExtensions>,
    ) -> Result<ExtensionMap> {
        let mut map = ExtensionMap::new();
        for (name, payload) in raw.unwrap_or_default() {
            let kind = ExtensionKind::from_name(&name).filter(|kind| self.is_enabled(*kind));
            let typed = match kind {
                Some(kind) => kind
                    .decode(target, &payload)
                    .map_err(|source| FormatError::Extension {
                        name: name.clone(),
                        source,
                    })?,
                None => None,
            };
            map.insert(name, typed.unwrap_or(Extension::Opaque(payload)));
        }
        Ok(map)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::khronos()
    }
}
