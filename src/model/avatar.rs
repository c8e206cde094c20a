use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context as _;
use tracing::warn;

use crate::foundation::error::{AvatarError, AvatarResult};
use crate::model::def::{GroupDef, LayerDef, ModelDef};
use crate::model::state::LogicState;

/// Layered avatar model consumed read-only by the renderer.
///
/// Build one with [`Model::from_def`], [`Model::from_json_str`] or [`Model::load`]; all of them run
/// the same normalization, which guarantees:
///
/// - layer names and group names are unique;
/// - every group child names an existing layer, and that layer's `group` names the group;
/// - every `logic` value names one of the group's children.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ModelDef", into = "ModelDef")]
pub struct Model {
    /// Display name.
    pub name: String,
    /// Layers in stacking order (first = bottom).
    pub layers: Vec<Layer>,
    /// Mutually exclusive layer groups.
    pub groups: Vec<Group>,
}

/// A single named image layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Unique layer name, also the image cache key.
    pub name: String,
    /// Image file relative to the model directory.
    pub file: Option<String>,
    /// Horizontal offset from the canvas center, in pixels.
    pub x: i32,
    /// Vertical offset from the canvas center, in pixels.
    pub y: i32,
    /// Uniform load-time scale (`>= 0`).
    pub scale: f64,
    /// Counter-clockwise load-time rotation in degrees.
    pub rotation: i32,
    /// Whether the layer is drawn at all.
    pub visible: bool,
    /// Decode the file as an animation.
    pub is_gif: bool,
    /// Owning group, if any.
    pub group: Option<String>,
    /// Editor hint marking a closed-eye layer.
    pub blink: bool,
    /// Stretch vertically with the audio level.
    pub speech: bool,
}

/// A set of mutually exclusive layers with a state to layer mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    /// Unique group name.
    pub name: String,
    /// Layers arbitrated by this group; at most one is drawn per frame.
    pub children: Vec<String>,
    /// Recognized state to child layer name.
    pub logic: BTreeMap<LogicState, String>,
    /// Seconds between blinks, `0` disables blinking.
    pub blink_freq: f64,
    /// Random child switching for this group.
    pub random_effect: bool,
    /// Minimum seconds between random switches.
    pub random_min: f64,
    /// Maximum seconds between random switches.
    pub random_max: f64,
}

impl Group {
    /// Layer mapped to `state`, if any.
    pub fn logic_for(&self, state: LogicState) -> Option<&str> {
        self.logic.get(&state).map(String::as_str)
    }
}

impl Model {
    /// Normalize a raw definition.
    ///
    /// Duplicate layer or group names are errors. Dangling references (unknown logic keys, logic
    /// values outside `children`, children that are not layers, unknown `group` names) are
    /// dropped with a warning.
    pub fn from_def(def: ModelDef) -> AvatarResult<Self> {
        let ModelDef {
            name,
            layers: layer_defs,
            groups: group_defs,
        } = def;

        let mut layers = Vec::with_capacity(layer_defs.len());
        let mut layer_names = HashSet::new();
        for l in layer_defs {
            if l.name.trim().is_empty() {
                return Err(AvatarError::validation("layer name must be non-empty"));
            }
            if !layer_names.insert(l.name.clone()) {
                return Err(AvatarError::validation(format!(
                    "duplicate layer name '{}'",
                    l.name
                )));
            }
            layers.push(layer_from_def(l));
        }

        let mut groups = Vec::with_capacity(group_defs.len());
        let mut group_names = HashSet::new();
        for g in group_defs {
            if !group_names.insert(g.name.clone()) {
                return Err(AvatarError::validation(format!(
                    "duplicate group name '{}'",
                    g.name
                )));
            }
            groups.push(group_from_def(g, &layer_names));
        }

        // A layer's own `group` field is authoritative for membership.
        for layer in &mut layers {
            let Some(gname) = layer.group.clone() else {
                continue;
            };
            match groups.iter_mut().find(|g| g.name == gname) {
                Some(g) => {
                    if !g.children.contains(&layer.name) {
                        g.children.push(layer.name.clone());
                    }
                }
                None => {
                    warn!(layer = %layer.name, group = %gname, "layer references unknown group");
                    layer.group = None;
                }
            }
        }

        for g in &mut groups {
            let gname = g.name.clone();
            g.children.retain(|child| {
                let Some(layer) = layers.iter_mut().find(|l| &l.name == child) else {
                    return false;
                };
                match layer.group.clone() {
                    None => {
                        layer.group = Some(gname.clone());
                        true
                    }
                    Some(owner) if owner == gname => true,
                    Some(owner) => {
                        warn!(layer = %child, group = %gname, owner = %owner, "layer claimed by two groups");
                        false
                    }
                }
            });
            let children = g.children.clone();
            g.logic.retain(|state, target| {
                let ok = children.contains(target);
                if !ok {
                    warn!(group = %gname, state = %state, layer = %target, "logic entry names a non-child layer");
                }
                ok
            });
        }

        Ok(Self {
            name,
            layers,
            groups,
        })
    }

    /// Parse model JSON.
    pub fn from_json_str(s: &str) -> AvatarResult<Self> {
        let def: ModelDef =
            serde_json::from_str(s).map_err(|e| AvatarError::serde(e.to_string()))?;
        Self::from_def(def)
    }

    /// Read and parse a model JSON file.
    #[tracing::instrument]
    pub fn load(path: &Path) -> AvatarResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read model '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize back into the editor's JSON format.
    pub fn to_json_string(&self) -> AvatarResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AvatarError::serde(e.to_string()))
    }

    /// Layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Index of a group in [`Model::groups`].
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }
}

fn layer_from_def(l: LayerDef) -> Layer {
    let scale = if l.scale.is_finite() {
        l.scale.max(0.0)
    } else {
        1.0
    };
    Layer {
        name: l.name,
        file: l.file.filter(|f| !f.trim().is_empty()),
        x: l.x,
        y: l.y,
        scale,
        rotation: l.rotation,
        visible: l.visible,
        is_gif: l.is_gif,
        group: l.group.filter(|g| !g.trim().is_empty()),
        blink: l.blink,
        speech: l.speech,
    }
}

fn group_from_def(g: GroupDef, layer_names: &HashSet<String>) -> Group {
    let mut children: Vec<String> = Vec::with_capacity(g.children.len());
    for c in g.children {
        if !layer_names.contains(&c) {
            warn!(group = %g.name, child = %c, "group child is not a layer");
            continue;
        }
        if !children.contains(&c) {
            children.push(c);
        }
    }

    let mut logic = BTreeMap::new();
    for (key, target) in g.logic {
        let Some(state) = LogicState::parse(&key) else {
            warn!(group = %g.name, key = %key, "ignoring unrecognized logic state");
            continue;
        };
        let Some(target) = target.filter(|t| !t.is_empty()) else {
            continue;
        };
        logic.insert(state, target);
    }

    let non_negative = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Group {
        name: g.name,
        children,
        logic,
        blink_freq: non_negative(g.blink_freq),
        random_effect: g.random_effect,
        random_min: non_negative(g.random_min),
        random_max: non_negative(g.random_max),
    }
}

impl TryFrom<ModelDef> for Model {
    type Error = AvatarError;

    fn try_from(def: ModelDef) -> Result<Self, Self::Error> {
        Model::from_def(def)
    }
}

impl From<Model> for ModelDef {
    fn from(m: Model) -> Self {
        ModelDef {
            name: m.name,
            layers: m
                .layers
                .into_iter()
                .map(|l| LayerDef {
                    name: l.name,
                    file: l.file,
                    x: l.x,
                    y: l.y,
                    scale: l.scale,
                    rotation: l.rotation,
                    visible: l.visible,
                    is_gif: l.is_gif,
                    group: l.group,
                    blink: l.blink,
                    speech: l.speech,
                })
                .collect(),
            groups: m
                .groups
                .into_iter()
                .map(|g| GroupDef {
                    name: g.name,
                    children: g.children,
                    logic: g
                        .logic
                        .into_iter()
                        .map(|(k, v)| (k.as_str().to_owned(), Some(v)))
                        .collect(),
                    blink_freq: g.blink_freq,
                    random_effect: g.random_effect,
                    random_min: g.random_min,
                    random_max: g.random_max,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/avatar.rs"]
mod tests;
