use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use cgmath::{Deg, Matrix4, Point3, Vector3};
use serde::Deserialize;

use crate::graph::{
    Attenuation, CameraData, GlobalCoefficients, LightDefinition, LightKind, Material, Primitive,
    PrimitiveKind, SceneDescription, SceneNode, Transformation, DEFAULT_HEIGHT_ANGLE,
};

#[derive(Debug)]
pub enum SceneLoadError {
    EmptyPath,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingRoot,
}

impl fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneLoadError::EmptyPath => write!(f, "scene path is empty"),
            SceneLoadError::Io { path, source } => {
                write!(f, "could not read scene {}: {source}", path.display())
            }
            SceneLoadError::Malformed { path, source } => {
                write!(f, "malformed scene {}: {source}", path.display())
            }
            SceneLoadError::MissingRoot => write!(f, "scene has no root node"),
        }
    }
}

impl std::error::Error for SceneLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneLoadError::Io { source, .. } => Some(source),
            SceneLoadError::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub trait SceneLoader {
    fn load(&self, path: &Path) -> Result<SceneDescription, SceneLoadError>;
}

/// Reads scene files written as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSceneLoader;

impl SceneLoader for JsonSceneLoader {
    fn load(&self, path: &Path) -> Result<SceneDescription, SceneLoadError> {
        if path.as_os_str().is_empty() {
            return Err(SceneLoadError::EmptyPath);
        }
        let text = fs::read_to_string(path).map_err(|source| SceneLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&text).map_err(|err| match err {
            SceneLoadError::Malformed { source, .. } => SceneLoadError::Malformed {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }
}

impl JsonSceneLoader {
    pub fn parse_str(text: &str) -> Result<SceneDescription, SceneLoadError> {
        let file: SceneFile =
            serde_json::from_str(text).map_err(|source| SceneLoadError::Malformed {
                path: PathBuf::new(),
                source,
            })?;
        let root = file.root.ok_or(SceneLoadError::MissingRoot)?;

        Ok(SceneDescription {
            globals: file.globals.into(),
            camera: file.camera.try_into().map_err(|source| SceneLoadError::Malformed {
                path: PathBuf::new(),
                source,
            })?,
            root: root.into(),
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneFile {
    #[serde(default)]
    globals: GlobalsFile,
    #[serde(default)]
    camera: CameraFile,
    root: Option<NodeFile>,
}

#[derive(Deserialize)]
#[serde(default)]
struct GlobalsFile {
    ka: f32,
    kd: f32,
    ks: f32,
}

impl Default for GlobalsFile {
    fn default() -> Self {
        let g = GlobalCoefficients::default();
        GlobalsFile {
            ka: g.ka,
            kd: g.kd,
            ks: g.ks,
        }
    }
}

impl From<GlobalsFile> for GlobalCoefficients {
    fn from(g: GlobalsFile) -> Self {
        GlobalCoefficients {
            ka: g.ka,
            kd: g.kd,
            ks: g.ks,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct CameraFile {
    position: [f32; 3],
    look: Option<[f32; 3]>,
    look_at: Option<[f32; 3]>,
    up: [f32; 3],
    /// Degrees.
    height_angle: f32,
}

impl Default for CameraFile {
    fn default() -> Self {
        let c = CameraData::default();
        CameraFile {
            position: c.position.into(),
            look: None,
            look_at: None,
            up: c.up.into(),
            height_angle: DEFAULT_HEIGHT_ANGLE.0,
        }
    }
}

impl TryFrom<CameraFile> for CameraData {
    type Error = serde_json::Error;

    fn try_from(c: CameraFile) -> Result<Self, Self::Error> {
        let position = Point3::from(c.position);
        let look = match (c.look, c.look_at) {
            (Some(look), None) => Vector3::from(look),
            (None, Some(target)) => Point3::from(target) - position,
            (None, None) => CameraData::default().look,
            (Some(_), Some(_)) => {
                return Err(serde::de::Error::custom(
                    "camera takes `look` or `look_at`, not both",
                ))
            }
        };
        Ok(CameraData {
            position,
            look,
            up: c.up.into(),
            height_angle: Deg(c.height_angle).into(),
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct NodeFile {
    transforms: Vec<TransformFile>,
    lights: Vec<LightFile>,
    primitives: Vec<PrimitiveFile>,
    children: Vec<NodeFile>,
}

impl From<NodeFile> for SceneNode {
    fn from(node: NodeFile) -> Self {
        SceneNode {
            transformations: node.transforms.into_iter().map(Into::into).collect(),
            lights: node.lights.into_iter().map(Into::into).collect(),
            primitives: node.primitives.into_iter().map(Into::into).collect(),
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TransformFile {
    Translate([f32; 3]),
    Scale([f32; 3]),
    Rotate { axis: [f32; 3], angle: f32 },
    /// Row-major, as written in the file.
    Matrix([[f32; 4]; 4]),
}

impl From<TransformFile> for Transformation {
    fn from(t: TransformFile) -> Self {
        match t {
            TransformFile::Translate(v) => Transformation::Translate(v.into()),
            TransformFile::Scale(v) => Transformation::Scale(v.into()),
            TransformFile::Rotate { axis, angle } => Transformation::Rotate {
                axis: axis.into(),
                angle: Deg(angle).into(),
            },
            TransformFile::Matrix(rows) => {
                // cgmath takes columns
                let m = Matrix4::from(rows);
                Transformation::Matrix(cgmath::Matrix::transpose(&m))
            }
        }
    }
}

fn default_attenuation() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

fn default_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LightFile {
    Point {
        #[serde(default = "default_color")]
        color: [f32; 3],
        #[serde(default = "default_attenuation")]
        attenuation: [f32; 3],
    },
    Directional {
        #[serde(default = "default_color")]
        color: [f32; 3],
        direction: [f32; 3],
    },
    Spot {
        #[serde(default = "default_color")]
        color: [f32; 3],
        #[serde(default = "default_attenuation")]
        attenuation: [f32; 3],
        direction: [f32; 3],
        /// Degrees.
        angle: f32,
        /// Degrees.
        #[serde(default)]
        penumbra: f32,
    },
}

impl From<LightFile> for LightDefinition {
    fn from(light: LightFile) -> Self {
        match light {
            LightFile::Point { color, attenuation } => LightDefinition {
                color: color.into(),
                attenuation: attenuation.into(),
                kind: LightKind::Point,
            },
            LightFile::Directional { color, direction } => LightDefinition {
                color: color.into(),
                attenuation: Attenuation::default(),
                kind: LightKind::Directional {
                    direction: direction.into(),
                },
            },
            LightFile::Spot {
                color,
                attenuation,
                direction,
                angle,
                penumbra,
            } => LightDefinition {
                color: color.into(),
                attenuation: attenuation.into(),
                kind: LightKind::Spot {
                    direction: direction.into(),
                    angle: Deg(angle).into(),
                    penumbra: Deg(penumbra).into(),
                },
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PrimitiveFile {
    shape: ShapeFile,
    #[serde(default)]
    material: MaterialFile,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum ShapeFile {
    Cube,
    Sphere,
    Cone,
    Cylinder,
    Mesh,
}

impl From<ShapeFile> for PrimitiveKind {
    fn from(s: ShapeFile) -> Self {
        match s {
            ShapeFile::Cube => PrimitiveKind::Cube,
            ShapeFile::Sphere => PrimitiveKind::Sphere,
            ShapeFile::Cone => PrimitiveKind::Cone,
            ShapeFile::Cylinder => PrimitiveKind::Cylinder,
            ShapeFile::Mesh => PrimitiveKind::Mesh,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MaterialFile {
    ambient: [f32; 3],
    diffuse: [f32; 3],
    specular: [f32; 3],
    shininess: f32,
    emissive: [f32; 3],
}

impl Default for MaterialFile {
    fn default() -> Self {
        let m = Material::default();
        MaterialFile {
            ambient: m.ambient.into(),
            diffuse: m.diffuse.into(),
            specular: m.specular.into(),
            shininess: m.shininess,
            emissive: m.emissive.into(),
        }
    }
}

impl From<PrimitiveFile> for Primitive {
    fn from(p: PrimitiveFile) -> Self {
        let m = p.material;
        Primitive {
            kind: p.shape.into(),
            material: Material {
                ambient: m.ambient.into(),
                diffuse: m.diffuse.into(),
                specular: m.specular.into(),
                shininess: m.shininess,
                emissive: m.emissive.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use cgmath::{InnerSpace, Rad, Vector4};

    use super::*;

    const SCENE: &str = r#"{
        "globals": {"ka": 0.5, "kd": 0.7, "ks": 0.2},
        "camera": {"position": [0, 0, 5], "look_at": [0, 0, 0], "up": [0, 1, 0], "height_angle": 30},
        "root": {
            "lights": [{"type": "directional", "color": [1, 1, 1], "direction": [0, -1, 0]}],
            "children": [{
                "transforms": [{"translate": [1, 0, 0]}, {"rotate": {"axis": [0, 1, 0], "angle": 90}}],
                "lights": [{"type": "spot", "direction": [0, 0, -1], "angle": 30, "penumbra": 10,
                            "attenuation": [1, 0.1, 0.01]}],
                "primitives": [
                    {"shape": "sphere", "material": {"diffuse": [1, 0, 0], "emissive": [0, 0, 2]}},
                    {"shape": "mesh"}
                ]
            }]
        }
    }"#;

    #[test]
    fn parses_a_full_scene() {
        let scene = JsonSceneLoader::parse_str(SCENE).unwrap();
        assert_eq!(scene.globals.ka, 0.5);
        assert_eq!(scene.globals.kd, 0.7);
        assert_eq!(scene.camera.look, Vector3::new(0.0, 0.0, -5.0));
        assert!((scene.camera.height_angle.0 - Rad::from(Deg(30.0)).0).abs() < 1e-6);

        assert_eq!(scene.root.lights.len(), 1);
        let child = &scene.root.children[0];
        assert_eq!(child.transformations.len(), 2);
        assert_eq!(child.primitives[0].kind, PrimitiveKind::Sphere);
        assert_eq!(child.primitives[0].material.emissive, Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(child.primitives[1].kind, PrimitiveKind::Mesh);
        match child.lights[0].kind {
            LightKind::Spot { angle, penumbra, .. } => {
                assert!((angle.0 - Rad::from(Deg(30.0)).0).abs() < 1e-6);
                assert!((penumbra.0 - Rad::from(Deg(10.0)).0).abs() < 1e-6);
            }
            other => panic!("unexpected light {other:?}"),
        }
        assert_eq!(child.lights[0].attenuation.linear, 0.1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let scene = JsonSceneLoader::parse_str(
            r#"{"root": {"primitives": [{"shape": "cube"}],
                         "lights": [{"type": "point"}]}}"#,
        )
        .unwrap();
        assert_eq!(scene.globals, GlobalCoefficients::default());
        assert_eq!(scene.camera, CameraData::default());
        assert_eq!(scene.root.primitives[0].material, Material::default());
        assert_eq!(scene.root.lights[0].attenuation, Attenuation::default());
        assert_eq!(scene.root.lights[0].color, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn matrix_rows_are_read_row_major() {
        let scene = JsonSceneLoader::parse_str(
            r#"{"root": {"transforms": [{"matrix": [[1, 0, 0, 3], [0, 1, 0, 4], [0, 0, 1, 5], [0, 0, 0, 1]]}]}}"#,
        )
        .unwrap();
        let p = scene.root.local_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(p, Vector4::new(3.0, 4.0, 5.0, 1.0));
    }

    #[test]
    fn missing_root_is_reported() {
        let err = JsonSceneLoader::parse_str(r#"{"globals": {"ka": 1}}"#).unwrap_err();
        assert!(matches!(err, SceneLoadError::MissingRoot));
    }

    #[test]
    fn camera_rejects_both_look_forms() {
        let both = r#"{"camera": {"look": [0, 0, -1], "look_at": [0, 0, 0]}, "root": {}}"#;
        assert!(matches!(
            JsonSceneLoader::parse_str(both).unwrap_err(),
            SceneLoadError::Malformed { .. }
        ));
    }

    #[test]
    fn camera_look_at_alone_is_accepted() {
        let scene = JsonSceneLoader::parse_str(
            r#"{"camera": {"position": [0, 0, 5], "look_at": [0, 0, 0]}, "root": {}}"#,
        )
        .unwrap();
        assert_eq!(scene.camera.position, Point3::new(0.0, 0.0, 5.0));
        assert_eq!(scene.camera.look, Vector3::new(0.0, 0.0, -5.0));
        assert_eq!(scene.camera.up, CameraData::default().up);
    }

    #[test]
    fn camera_without_look_uses_default_direction() {
        let scene =
            JsonSceneLoader::parse_str(r#"{"camera": {"position": [1, 2, 3]}, "root": {}}"#)
                .unwrap();
        assert_eq!(scene.camera.look, CameraData::default().look);
        assert_eq!(scene.camera.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn unknown_shape_is_malformed() {
        let err =
            JsonSceneLoader::parse_str(r#"{"root": {"primitives": [{"shape": "torus"}]}}"#)
                .unwrap_err();
        assert!(matches!(err, SceneLoadError::Malformed { .. }));
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = JsonSceneLoader.load(Path::new("")).unwrap_err();
        assert!(matches!(err, SceneLoadError::EmptyPath));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let err = JsonSceneLoader
            .load(Path::new("/definitely/not/a/scene.json"))
            .unwrap_err();
        assert!(matches!(err, SceneLoadError::Io { .. }));
        assert!(err.to_string().contains("scene.json"));
    }

    #[test]
    fn load_reads_from_disk_and_keeps_path_in_errors() {
        let dir = std::env::temp_dir().join(format!("lumen-scene-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.json");
        fs::File::create(&good)
            .unwrap()
            .write_all(SCENE.as_bytes())
            .unwrap();
        let scene = JsonSceneLoader.load(&good).unwrap();
        assert!(scene.camera.look.magnitude() > 0.0);

        let bad = dir.join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        match JsonSceneLoader.load(&bad).unwrap_err() {
            SceneLoadError::Malformed { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error {other}"),
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
