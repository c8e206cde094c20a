use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Model file as written by the editor.
///
/// Every field has a default so partially written or older files still parse. Normalization into
/// a [`Model`](crate::Model) happens in one place, [`Model::from_def`](crate::Model::from_def).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelDef {
    /// Display name.
    pub name: String,
    /// Layers in stacking order (first = bottom).
    pub layers: Vec<LayerDef>,
    /// Mutually exclusive layer groups.
    pub groups: Vec<GroupDef>,
}

/// Raw layer entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerDef {
    /// Unique layer name.
    pub name: String,
    /// Image file relative to the model directory.
    pub file: Option<String>,
    /// Horizontal offset from the canvas center, in pixels.
    #[serde(deserialize_with = "de_rounded_i32")]
    pub x: i32,
    /// Vertical offset from the canvas center, in pixels.
    #[serde(deserialize_with = "de_rounded_i32")]
    pub y: i32,
    /// Uniform scale applied once at load time.
    pub scale: f64,
    /// Counter-clockwise rotation in degrees applied once at load time.
    #[serde(deserialize_with = "de_rounded_i32")]
    pub rotation: i32,
    /// Whether the layer is drawn at all.
    pub visible: bool,
    /// Decode the file as an animation.
    pub is_gif: bool,
    /// Owning group name.
    pub group: Option<String>,
    /// Editor hint marking a closed-eye layer.
    pub blink: bool,
    /// Stretch the layer vertically with the audio level.
    pub speech: bool,
}

impl Default for LayerDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            file: None,
            x: 0,
            y: 0,
            scale: 1.0,
            rotation: 0,
            visible: true,
            is_gif: false,
            group: None,
            blink: false,
            speech: false,
        }
    }
}

/// Raw group entry. `logic` keys are free-form strings here and parsed during normalization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GroupDef {
    /// Unique group name.
    pub name: String,
    /// Layer names arbitrated by this group.
    pub children: Vec<String>,
    /// State name to layer name.
    pub logic: BTreeMap<String, Option<String>>,
    /// Seconds between blinks, `0` disables blinking.
    pub blink_freq: f64,
    /// Enable random child switching for this group.
    pub random_effect: bool,
    /// Minimum seconds between random switches.
    pub random_min: f64,
    /// Maximum seconds between random switches.
    pub random_max: f64,
}

impl Default for GroupDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            children: Vec::new(),
            logic: BTreeMap::new(),
            blink_freq: 0.0,
            random_effect: false,
            random_min: 1.0,
            random_max: 3.0,
        }
    }
}

// The editor writes integers, hand-edited files sometimes carry floats.
fn de_rounded_i32<'de, D>(d: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<f64>::deserialize(d)?.unwrap_or(0.0);
    if !v.is_finite() {
        return Ok(0);
    }
    Ok(v.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}
