use std::path::Path;

use crate::assets::store::PreparedLayerStore;
use crate::model::avatar::Model;

/// A loaded model together with its prepared images.
///
/// Immutable once built; the renderer swaps whole scenes and rebuilds its group timers whenever
/// the generation changes.
#[derive(Debug)]
pub struct Scene {
    /// The model.
    pub model: Model,
    /// Load-time prepared layer images.
    pub store: PreparedLayerStore,
    /// Monotonic load counter.
    pub generation: u64,
}

impl Scene {
    /// Prepare every layer of `model` from `dir`.
    pub fn prepare(model: Model, dir: &Path, generation: u64) -> Self {
        let store = PreparedLayerStore::prepare(&model, dir);
        Self {
            model,
            store,
            generation,
        }
    }

    /// Summary of how preparation went.
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            generation: self.generation,
            layers: self.model.layers.len(),
            groups: self.model.groups.len(),
            prepared: self.store.len(),
            failures: self.store.failures().to_vec(),
        }
    }
}

/// Outcome of [`crate::Renderer::load_model`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    /// Generation assigned to the new scene.
    pub generation: u64,
    /// Layers in the model.
    pub layers: usize,
    /// Groups in the model.
    pub groups: usize,
    /// Layers with prepared pixels.
    pub prepared: usize,
    /// `(layer, error)` for layers that failed to load and will not be drawn.
    pub failures: Vec<(String, String)>,
}
