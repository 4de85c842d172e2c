use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3, Zero};

/// One elementary step of a node's local transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transformation {
    Translate(Vector3<f32>),
    Scale(Vector3<f32>),
    Rotate { axis: Vector3<f32>, angle: Rad<f32> },
    Matrix(Matrix4<f32>),
}

impl Transformation {
    pub fn matrix(&self) -> Matrix4<f32> {
        match *self {
            Transformation::Translate(offset) => Matrix4::from_translation(offset),
            Transformation::Scale(s) => Matrix4::from_nonuniform_scale(s.x, s.y, s.z),
            Transformation::Rotate { axis, angle } => {
                if axis.magnitude2() <= f32::EPSILON {
                    Matrix4::identity()
                } else {
                    Matrix4::from_axis_angle(axis.normalize(), angle)
                }
            }
            Transformation::Matrix(m) => m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl From<[f32; 3]> for Attenuation {
    fn from([constant, linear, quadratic]: [f32; 3]) -> Self {
        Attenuation {
            constant,
            linear,
            quadratic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point,
    Directional {
        direction: Vector3<f32>,
    },
    /// `angle` is the outer cone half-angle, `penumbra` the falloff band inside it.
    Spot {
        direction: Vector3<f32>,
        angle: Rad<f32>,
        penumbra: Rad<f32>,
    },
}

/// A light as declared on a node, in that node's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDefinition {
    pub color: Vector3<f32>,
    pub attenuation: Attenuation,
    pub kind: LightKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cone,
    Cylinder,
    /// Imported meshes are not supported; renders nothing.
    Mesh,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 5] = [
        PrimitiveKind::Cube,
        PrimitiveKind::Sphere,
        PrimitiveKind::Cone,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Mesh,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
    pub emissive: Vector3<f32>,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            ambient: Vector3::zero(),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::zero(),
            shininess: 1.0,
            emissive: Vector3::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub material: Material,
}

/// A node of the scene tree. Children are owned, so a tree can never contain a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub transformations: Vec<Transformation>,
    pub lights: Vec<LightDefinition>,
    pub primitives: Vec<Primitive>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Product of this node's own transformations in declaration order.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.transformations
            .iter()
            .fold(Matrix4::identity(), |acc, t| acc * t.matrix())
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
            + self
                .children
                .iter()
                .map(SceneNode::primitive_count)
                .sum::<usize>()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len() + self.children.iter().map(SceneNode::light_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalCoefficients {
    pub ka: f32,
    pub kd: f32,
    pub ks: f32,
}

impl Default for GlobalCoefficients {
    fn default() -> Self {
        GlobalCoefficients {
            ka: 1.0,
            kd: 1.0,
            ks: 1.0,
        }
    }
}

pub const DEFAULT_HEIGHT_ANGLE: cgmath::Deg<f32> = cgmath::Deg(45.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub position: cgmath::Point3<f32>,
    pub look: Vector3<f32>,
    pub up: Vector3<f32>,
    pub height_angle: Rad<f32>,
}

impl Default for CameraData {
    fn default() -> Self {
        CameraData {
            position: cgmath::Point3::new(0.0, 0.0, 5.0),
            look: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            height_angle: DEFAULT_HEIGHT_ANGLE.into(),
        }
    }
}

/// Everything a scene loader hands back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDescription {
    pub globals: GlobalCoefficients,
    pub camera: CameraData,
    pub root: SceneNode,
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Vector4};

    use super::*;

    #[test]
    fn zero_axis_rotation_is_identity() {
        let t = Transformation::Rotate {
            axis: Vector3::zero(),
            angle: Deg(90.0).into(),
        };
        assert_eq!(t.matrix(), Matrix4::identity());
    }

    #[test]
    fn rotation_axis_is_normalized() {
        let scaled = Transformation::Rotate {
            axis: Vector3::new(0.0, 0.0, 10.0),
            angle: Deg(90.0).into(),
        };
        let unit = Transformation::Rotate {
            axis: Vector3::unit_z(),
            angle: Deg(90.0).into(),
        };
        let a = scaled.matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        let b = unit.matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((a - b).magnitude() < 1e-6);
    }

    #[test]
    fn local_matrix_composes_in_declaration_order() {
        let node = SceneNode {
            transformations: vec![
                Transformation::Translate(Vector3::new(1.0, 0.0, 0.0)),
                Transformation::Scale(Vector3::new(2.0, 2.0, 2.0)),
            ],
            ..Default::default()
        };
        let p = node.local_matrix() * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(p, Vector4::new(3.0, 2.0, 2.0, 1.0));
    }

    #[test]
    fn counts_walk_the_whole_tree() {
        let leaf = SceneNode {
            primitives: vec![Primitive {
                kind: PrimitiveKind::Sphere,
                material: Material::default(),
            }],
            lights: vec![LightDefinition {
                color: Vector3::new(1.0, 1.0, 1.0),
                attenuation: Attenuation::default(),
                kind: LightKind::Point,
            }],
            ..Default::default()
        };
        let root = SceneNode {
            children: vec![
                leaf.clone(),
                leaf.clone(),
                SceneNode {
                    children: vec![leaf],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(root.primitive_count(), 3);
        assert_eq!(root.light_count(), 3);
    }
}
