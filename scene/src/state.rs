use std::path::Path;

use cgmath::{InnerSpace, Vector3};
use log::{info, warn};

use crate::{
    camera::Camera,
    flatten::{flatten, FlattenedScene},
    graph::{CameraData, GlobalCoefficients, SceneDescription},
    loader::{SceneLoadError, SceneLoader},
};

/// A loaded scene, already resolved into world space.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveScene {
    pub globals: GlobalCoefficients,
    pub camera: CameraData,
    pub flat: FlattenedScene,
}

impl From<SceneDescription> for ActiveScene {
    fn from(description: SceneDescription) -> Self {
        ActiveScene {
            globals: description.globals,
            camera: description.camera,
            flat: flatten(&description.root),
        }
    }
}

impl ActiveScene {
    /// Camera for this scene at the given aspect and clip planes. Degenerate look/up pairs
    /// are repaired with a warning instead of producing NaNs.
    pub fn camera(&self, aspect: f32, near: f32, far: f32) -> Camera {
        let mut look = self.camera.look;
        let mut up = self.camera.up;

        if look.magnitude2() <= f32::EPSILON {
            warn!("scene camera has a zero look vector; looking down -z");
            look = -Vector3::unit_z();
        }
        if up.magnitude2() <= f32::EPSILON
            || look.normalize().cross(up.normalize()).magnitude() < 1e-4
        {
            warn!("scene camera up is parallel to look; picking another up vector");
            up = if look.normalize().y.abs() < 0.9 {
                Vector3::unit_y()
            } else {
                Vector3::unit_z()
            };
        }

        let mut camera = Camera::default();
        camera.set_view_matrix(self.camera.position, look, up);
        camera.set_projection_matrix(aspect, near, far, self.camera.height_angle);
        camera
    }
}

/// Owns the current scene. A failed load leaves the previous scene in place.
#[derive(Debug, Default)]
pub struct SceneState {
    active: Option<ActiveScene>,
}

impl SceneState {
    pub fn load(
        &mut self,
        loader: &dyn SceneLoader,
        path: &Path,
    ) -> Result<&ActiveScene, SceneLoadError> {
        let description = loader.load(path)?;
        let scene = ActiveScene::from(description);
        info!(
            "loaded scene {}: {} instances, {} lights",
            path.display(),
            scene.flat.instances.len(),
            scene.flat.lights.len()
        );
        Ok(self.active.insert(scene))
    }

    pub fn set(&mut self, description: SceneDescription) -> &ActiveScene {
        self.active.insert(description.into())
    }

    pub fn active(&self) -> Option<&ActiveScene> {
        self.active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use cgmath::{Point3, Vector4};

    use super::*;
    use crate::graph::{Material, Primitive, PrimitiveKind, SceneNode};

    /// Hands out a fixed sequence of results, one per call.
    struct ScriptedLoader {
        calls: Cell<usize>,
        succeed_on: usize,
    }

    impl SceneLoader for ScriptedLoader {
        fn load(&self, _path: &Path) -> Result<SceneDescription, SceneLoadError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == self.succeed_on {
                Ok(SceneDescription {
                    root: SceneNode {
                        primitives: vec![Primitive {
                            kind: PrimitiveKind::Cube,
                            material: Material::default(),
                        }],
                        ..Default::default()
                    },
                    ..Default::default()
                })
            } else {
                Err(SceneLoadError::MissingRoot)
            }
        }
    }

    #[test]
    fn starts_empty() {
        assert!(SceneState::default().active().is_none());
    }

    #[test]
    fn failed_load_keeps_previous_scene() {
        let loader = ScriptedLoader {
            calls: Cell::new(0),
            succeed_on: 0,
        };
        let mut state = SceneState::default();
        state.load(&loader, Path::new("a.json")).unwrap();
        let before = state.active().cloned();

        assert!(state.load(&loader, Path::new("b.json")).is_err());
        assert_eq!(state.active().cloned(), before);
        assert_eq!(state.active().unwrap().flat.instances.len(), 1);
    }

    #[test]
    fn failed_first_load_leaves_nothing() {
        let loader = ScriptedLoader {
            calls: Cell::new(0),
            succeed_on: 1,
        };
        let mut state = SceneState::default();
        assert!(state.load(&loader, Path::new("a.json")).is_err());
        assert!(state.active().is_none());
        state.load(&loader, Path::new("a.json")).unwrap();
        assert!(state.active().is_some());
    }

    #[test]
    fn zero_shape_scene_has_no_instances() {
        let mut state = SceneState::default();
        let scene = state.set(SceneDescription::default());
        assert!(scene.flat.instances.is_empty());
    }

    #[test]
    fn camera_uses_scene_position() {
        let scene = ActiveScene::from(SceneDescription {
            camera: CameraData {
                position: Point3::new(1.0, 2.0, 3.0),
                ..Default::default()
            },
            ..Default::default()
        });
        let camera = scene.camera(2.0, 0.1, 10.0);
        let eye = camera.view_matrix() * Vector4::new(1.0, 2.0, 3.0, 1.0);
        assert!(eye.truncate().magnitude() < 1e-5);
        assert_eq!(camera.aspect(), 2.0);
    }

    #[test]
    fn parallel_up_is_repaired() {
        let scene = ActiveScene::from(SceneDescription {
            camera: CameraData {
                look: Vector3::new(0.0, -1.0, 0.0),
                up: Vector3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
            ..Default::default()
        });
        let camera = scene.camera(1.0, 0.1, 10.0);
        let view = camera.view_matrix();
        let m: &[f32; 16] = view.as_ref();
        assert!(m.iter().all(|x| x.is_finite()));
    }
}
