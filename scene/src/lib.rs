//! GPU-free half of lumen: scene graph, flattening, camera math and procedural meshes.

pub mod camera;
pub mod flatten;
pub mod graph;
pub mod loader;
pub mod shapes;
pub mod state;

pub use camera::Camera;
pub use flatten::{flatten, FlattenedScene, RenderInstance, WorldLight, WorldLightKind};
pub use graph::{
    Attenuation, CameraData, GlobalCoefficients, LightDefinition, LightKind, Material, Primitive,
    PrimitiveKind, SceneDescription, SceneNode, Transformation,
};
pub use loader::{JsonSceneLoader, SceneLoadError, SceneLoader};
pub use state::{ActiveScene, SceneState};
