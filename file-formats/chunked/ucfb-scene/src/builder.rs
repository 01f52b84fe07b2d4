use std::collections::HashMap;
use std::sync::Mutex;

use crate::scene::{create_scene, Scene};
use crate::types::{Model, ModelFragment};

/// Thread-safe sink for model fragments arriving from independent,
/// concurrently dispatched chunk handlers (spec.md §4.E). Each handler
/// calls [`ModelsBuilder::integrate`] with whatever piece it decoded
/// (bones, a mesh part, collision primitives, ...); the model under that
/// name accumulates fragments in whatever order they happen to land in,
/// and the final scene is order-independent once every handler is done.
#[derive(Default)]
pub struct ModelsBuilder {
    models: Mutex<HashMap<String, Model>>,
}

impl ModelsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integrate(&self, name: &str, fragment: ModelFragment) {
        let mut models = self.models.lock().unwrap();
        let model = models.entry(name.to_string()).or_insert_with(|| Model {
            name: name.to_string(),
            ..Model::default()
        });
        model.integrate(fragment);
    }

    /// Number of distinct model names integrated so far.
    pub fn len(&self) -> usize {
        self.models.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.lock().unwrap().keys().cloned().collect()
    }

    /// Builds the [`Scene`] for one integrated model, by name.
    pub fn scene_for(&self, name: &str) -> Option<Scene> {
        self.models.lock().unwrap().get(name).map(create_scene)
    }

    /// Clones out one integrated [`Model`] by name, fragments and all,
    /// before scene conversion — `ucfb-model-formats::save_all` uses this
    /// to apply discard flags ahead of `create_scene`.
    pub fn model_for(&self, name: &str) -> Option<Model> {
        self.models.lock().unwrap().get(name).cloned()
    }

    /// Builds every integrated model's scene, keyed by model name.
    pub fn all_scenes(&self) -> HashMap<String, Scene> {
        self.models
            .lock()
            .unwrap()
            .iter()
            .map(|(name, model)| (name.clone(), create_scene(model)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lod, Part, Segment, VertexBlock};
    use crate::topology::Topology;

    fn empty_part() -> Part {
        Part {
            name: "body".to_string(),
            lod: Lod::Zero,
            segments: vec![Segment {
                material_index: 0,
                topology: Topology::TriangleList,
                vertices: VertexBlock {
                    positions: Vec::new(),
                    ..Default::default()
                },
                indices: Vec::new(),
                bone_map: Vec::new(),
            }],
        }
    }

    #[test]
    fn fragments_integrated_under_the_same_name_accumulate() {
        let builder = ModelsBuilder::new();
        builder.integrate(
            "tank",
            ModelFragment {
                parts: vec![empty_part()],
                ..Default::default()
            },
        );
        builder.integrate(
            "tank",
            ModelFragment {
                parts: vec![empty_part()],
                ..Default::default()
            },
        );

        let scene = builder.scene_for("tank").unwrap();
        // one node per part plus a synthetic root, order doesn't matter here
        assert_eq!(scene.segments.len(), 2);
    }

    #[test]
    fn unknown_model_name_yields_no_scene() {
        let builder = ModelsBuilder::new();
        assert!(builder.scene_for("nope").is_none());
    }

    #[test]
    fn integration_order_does_not_change_the_resulting_scene_size() {
        let a = ModelsBuilder::new();
        a.integrate(
            "x",
            ModelFragment {
                parts: vec![empty_part()],
                ..Default::default()
            },
        );
        a.integrate(
            "x",
            ModelFragment {
                bones: vec![],
                ..Default::default()
            },
        );

        let b = ModelsBuilder::new();
        b.integrate(
            "x",
            ModelFragment {
                bones: vec![],
                ..Default::default()
            },
        );
        b.integrate(
            "x",
            ModelFragment {
                parts: vec![empty_part()],
                ..Default::default()
            },
        );

        assert_eq!(
            a.scene_for("x").unwrap().segments.len(),
            b.scene_for("x").unwrap().segments.len()
        );
    }
}
