//! Typed payloads of the Khronos extensions the registry knows about
//!
//! Properties a payload does not model, including its own `extras` and
//! `extensions`, are kept in `rest` and written back on encode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload properties outside the typed fields.
pub type Rest = Map<String, Value>;

/// `KHR_materials_unlit` (material). Carries no properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unlit {
    #[serde(flatten)]
    pub rest: Rest,
}

/// `KHR_materials_emissive_strength` (material).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissiveStrength {
    #[serde(default = "default_emissive_strength")]
    pub emissive_strength: f64,
    #[serde(flatten)]
    pub rest: Rest,
}

fn default_emissive_strength() -> f64 {
    1.0
}

/// `KHR_materials_ior` (material).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ior {
    #[serde(default = "default_ior")]
    pub ior: f64,
    #[serde(flatten)]
    pub rest: Rest,
}

fn default_ior() -> f64 {
    1.5
}

/// `KHR_lights_punctual` at the document root: the light list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LightsPunctual {
    #[serde(default)]
    pub lights: Vec<PunctualLight>,
    #[serde(flatten)]
    pub rest: Rest,
}

/// `KHR_lights_punctual` on a node: index into the root light list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLight {
    pub light: u32,
    #[serde(flatten)]
    pub rest: Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunctualLight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: LightType,
    #[serde(default = "default_color")]
    pub color: [f64; 3],
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot: Option<Spot>,
    #[serde(flatten)]
    pub rest: Rest,
}

fn default_color() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn default_intensity() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    #[serde(default)]
    pub inner_cone_angle: f64,
    #[serde(default = "default_outer_cone_angle")]
    pub outer_cone_angle: f64,
    #[serde(flatten)]
    pub rest: Rest,
}

fn default_outer_cone_angle() -> f64 {
    std::f64::consts::FRAC_PI_4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmodeled_properties_survive() {
        let text = r#"{"ior":1.4,"extras":{"tag":"keep me"}}"#;
        let ior: Ior = serde_json::from_str(text).unwrap();
        assert_eq!(ior.ior, 1.4);
        assert_eq!(ior.rest["extras"]["tag"], "keep me");
        assert_eq!(serde_json::to_string(&ior).unwrap(), text);

        let unlit: Unlit = serde_json::from_str(r#"{"extensions":{"EXT_x":{}}}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&unlit).unwrap(),
            r#"{"extensions":{"EXT_x":{}}}"#
        );
    }

    #[test]
    fn test_light_keeps_extras() {
        let text = r#"{"lights":[{"type":"point","intensity":2.0,"extras":{"id":3}}]}"#;
        let lights: LightsPunctual = serde_json::from_str(text).unwrap();
        let light = &lights.lights[0];
        assert_eq!(light.kind, LightType::Point);
        assert_eq!(light.rest["extras"]["id"], 3);

        let json: Value = serde_json::to_value(&lights).unwrap();
        assert_eq!(json["lights"][0]["extras"]["id"], 3);
        assert_eq!(json["lights"][0]["intensity"], 2.0);
    }
}
