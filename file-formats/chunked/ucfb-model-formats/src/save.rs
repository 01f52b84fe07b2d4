use ucfb_scene::{Lod, Model, ModelsBuilder};

use crate::error::ModelFormatError;
use crate::gltf::GltfFormatWriter;
use crate::mesh::MeshFormatWriter;

/// Output container selected by `-modelfmt` (spec.md §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Msh,
    Gltf,
}

/// `-modeldiscard` (spec.md §6.2): drops non-LOD0 parts and/or collision
/// data before a model is converted to a [`ucfb_scene::Scene`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardFlags {
    pub lod: bool,
    pub collision: bool,
}

impl DiscardFlags {
    pub fn from_flag_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::default()),
            "lod" => Some(Self {
                lod: true,
                collision: false,
            }),
            "collision" => Some(Self {
                lod: false,
                collision: true,
            }),
            "lod_collision" => Some(Self {
                lod: true,
                collision: true,
            }),
            _ => None,
        }
    }
}

fn apply_discard(mut model: Model, discard: DiscardFlags) -> Model {
    if discard.lod {
        model.parts.retain(|part| part.lod == Lod::Zero);
    }
    if discard.collision {
        model.collision_primitives.clear();
    }
    model
}

/// Saves every model integrated into `builder` through `sink`, applying
/// `discard` before scene conversion (spec.md §4.E). A failure writing one
/// model is recorded by name and does not stop the others.
pub fn save_all(
    builder: &ModelsBuilder,
    format: ModelFormat,
    discard: DiscardFlags,
    sink: &dyn Fn(&str, &[u8]) -> std::io::Result<()>,
) -> Vec<(String, ModelFormatError)> {
    let mut failures = Vec::new();

    for name in builder.model_names() {
        let Some(model) = builder.model_for(&name) else {
            continue;
        };
        let model = apply_discard(model, discard);
        let scene = ucfb_scene::create_scene(&model);

        let result = match format {
            ModelFormat::Msh => MeshFormatWriter::write(&scene, &name).map(|(bytes, option)| {
                vec![
                    (format!("models/{name}.msh"), bytes),
                    (format!("models/{name}.msh.option"), option.into_bytes()),
                ]
            }),
            ModelFormat::Gltf => GltfFormatWriter::write(&scene)
                .map(|bytes| vec![(format!("models/{name}.glb"), bytes)]),
        };

        match result {
            Ok(files) => {
                for (path, bytes) in files {
                    if let Err(err) = sink(&path, &bytes) {
                        failures.push((name.clone(), ModelFormatError::from(err)));
                    }
                }
            }
            Err(err) => {
                tracing::warn!(model = %name, error = %err, "failed to save model");
                failures.push((name, err));
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use ucfb_scene::{Part, Segment, Topology, VertexBlock};

    fn part_with_lod(lod: Lod) -> Part {
        Part {
            name: "body".to_string(),
            lod,
            segments: vec![Segment {
                material_index: 0,
                topology: Topology::TriangleList,
                vertices: VertexBlock {
                    positions: vec![glam::Vec3::ZERO, glam::Vec3::X, glam::Vec3::Y],
                    normals: Vec::new(),
                    texcoords: Vec::new(),
                    bone_weights: Vec::new(),
                    ..Default::default()
                },
                indices: vec![0, 1, 2],
                bone_map: Vec::new(),
            }],
        }
    }

    #[test]
    fn discarding_lod_drops_non_zero_parts_before_saving() {
        let builder = ModelsBuilder::new();
        builder.integrate(
            "tank",
            ucfb_scene::ModelFragment {
                parts: vec![part_with_lod(Lod::Zero), part_with_lod(Lod::One)],
                ..Default::default()
            },
        );

        let saved: Mutex<Vec<(String, usize)>> = Mutex::new(Vec::new());
        let failures = save_all(
            &builder,
            ModelFormat::Msh,
            DiscardFlags {
                lod: true,
                collision: false,
            },
            &|path, bytes| {
                saved.lock().unwrap().push((path.to_string(), bytes.len()));
                Ok(())
            },
        );

        assert!(failures.is_empty());
        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().any(|(path, _)| path == "models/tank.msh"));
        assert!(saved.iter().any(|(path, _)| path == "models/tank.msh.option"));
    }
}
