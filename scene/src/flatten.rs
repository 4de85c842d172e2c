use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3, Vector4};

use crate::graph::{Attenuation, LightDefinition, LightKind, Primitive, SceneNode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInstance {
    pub primitive: Primitive,
    pub world: Matrix4<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldLightKind {
    Point {
        position: Vector3<f32>,
    },
    Directional {
        direction: Vector3<f32>,
    },
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        angle: Rad<f32>,
        penumbra: Rad<f32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldLight {
    pub color: Vector3<f32>,
    pub attenuation: Attenuation,
    pub kind: WorldLightKind,
}

/// Draw instances and lights in depth-first traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedScene {
    pub instances: Vec<RenderInstance>,
    pub lights: Vec<WorldLight>,
}

impl FlattenedScene {
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.lights.is_empty()
    }

    fn append(&mut self, mut other: FlattenedScene) {
        self.instances.append(&mut other.instances);
        self.lights.append(&mut other.lights);
    }
}

impl LightDefinition {
    pub fn to_world(&self, ctm: &Matrix4<f32>) -> WorldLight {
        let ctm = *ctm;
        let position = || (ctm * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate();
        let direction = |d: Vector3<f32>| (ctm * d.extend(0.0)).truncate().normalize();

        let kind = match self.kind {
            LightKind::Point => WorldLightKind::Point {
                position: position(),
            },
            LightKind::Directional { direction: d } => WorldLightKind::Directional {
                direction: direction(d),
            },
            LightKind::Spot {
                direction: d,
                angle,
                penumbra,
            } => WorldLightKind::Spot {
                position: position(),
                direction: direction(d),
                angle,
                penumbra,
            },
        };

        WorldLight {
            color: self.color,
            attenuation: self.attenuation,
            kind,
        }
    }
}

/// Resolves the tree into world space, starting from the identity at `root`.
pub fn flatten(root: &SceneNode) -> FlattenedScene {
    flatten_node(root, Matrix4::identity())
}

fn flatten_node(node: &SceneNode, parent: Matrix4<f32>) -> FlattenedScene {
    let ctm = parent * node.local_matrix();

    let mut out = FlattenedScene {
        lights: node.lights.iter().map(|l| l.to_world(&ctm)).collect(),
        instances: node
            .primitives
            .iter()
            .map(|&primitive| RenderInstance {
                primitive,
                world: ctm,
            })
            .collect(),
    };

    for child in &node.children {
        out.append(flatten_node(child, ctm));
    }

    out
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Zero};

    use super::*;
    use crate::graph::{Material, PrimitiveKind, Transformation};

    fn cube() -> Primitive {
        Primitive {
            kind: PrimitiveKind::Cube,
            material: Material::default(),
        }
    }

    fn directional(direction: Vector3<f32>) -> LightDefinition {
        LightDefinition {
            color: Vector3::new(1.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
            kind: LightKind::Directional { direction },
        }
    }

    fn point() -> LightDefinition {
        LightDefinition {
            color: Vector3::new(1.0, 0.5, 0.25),
            attenuation: Attenuation::default(),
            kind: LightKind::Point,
        }
    }

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn empty_tree_flattens_to_nothing() {
        assert!(flatten(&SceneNode::default()).is_empty());
    }

    #[test]
    fn counts_match_tree_totals() {
        let leaf = |n: usize| SceneNode {
            primitives: vec![cube(); n],
            lights: vec![point(); n],
            ..Default::default()
        };
        let root = SceneNode {
            primitives: vec![cube()],
            children: vec![
                leaf(2),
                SceneNode {
                    children: vec![leaf(3), leaf(0), leaf(1)],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let flat = flatten(&root);
        assert_eq!(flat.instances.len(), root.primitive_count());
        assert_eq!(flat.instances.len(), 7);
        assert_eq!(flat.lights.len(), root.light_count());
        assert_eq!(flat.lights.len(), 6);
    }

    #[test]
    fn three_level_tree_composes_root_to_leaf() {
        let root = SceneNode {
            transformations: vec![Transformation::Translate(Vector3::new(1.0, 0.0, 0.0))],
            children: vec![SceneNode {
                transformations: vec![Transformation::Scale(Vector3::new(2.0, 2.0, 2.0))],
                children: vec![SceneNode {
                    primitives: vec![cube()],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let flat = flatten(&root);
        assert_eq!(flat.instances.len(), 1);
        let corner = flat.instances[0].world * Vector4::new(0.5, 0.5, 0.5, 1.0);
        assert!(close(corner.truncate(), Vector3::new(2.0, 1.0, 1.0)));
    }

    #[test]
    fn traversal_order_is_lights_then_primitives_then_children() {
        let root = SceneNode {
            lights: vec![point()],
            primitives: vec![cube()],
            children: vec![
                SceneNode {
                    transformations: vec![Transformation::Translate(Vector3::new(
                        1.0, 0.0, 0.0,
                    ))],
                    lights: vec![point()],
                    primitives: vec![cube()],
                    ..Default::default()
                },
                SceneNode {
                    transformations: vec![Transformation::Translate(Vector3::new(
                        2.0, 0.0, 0.0,
                    ))],
                    lights: vec![point()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let flat = flatten(&root);
        let xs: Vec<f32> = flat
            .lights
            .iter()
            .map(|l| match l.kind {
                WorldLightKind::Point { position } => position.x,
                _ => f32::NAN,
            })
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(flat.instances[1].world.w.x, 1.0);
    }

    #[test]
    fn translation_does_not_move_directions() {
        let root = SceneNode {
            transformations: vec![Transformation::Translate(Vector3::new(5.0, -3.0, 7.0))],
            lights: vec![directional(Vector3::new(0.0, -1.0, 0.0))],
            ..Default::default()
        };

        let flat = flatten(&root);
        match flat.lights[0].kind {
            WorldLightKind::Directional { direction } => {
                assert!(close(direction, Vector3::new(0.0, -1.0, 0.0)))
            }
            other => panic!("unexpected light {other:?}"),
        }
    }

    #[test]
    fn rotation_turns_directions() {
        let root = SceneNode {
            transformations: vec![Transformation::Rotate {
                axis: Vector3::unit_z(),
                angle: Deg(90.0).into(),
            }],
            children: vec![SceneNode {
                lights: vec![directional(Vector3::new(0.0, -1.0, 0.0))],
                ..Default::default()
            }],
            ..Default::default()
        };

        let flat = flatten(&root);
        match flat.lights[0].kind {
            WorldLightKind::Directional { direction } => {
                assert!(close(direction, Vector3::new(1.0, 0.0, 0.0)), "{direction:?}")
            }
            other => panic!("unexpected light {other:?}"),
        }
    }

    #[test]
    fn spot_directions_are_renormalized_under_scale() {
        let root = SceneNode {
            transformations: vec![
                Transformation::Translate(Vector3::new(0.0, 4.0, 0.0)),
                Transformation::Scale(Vector3::new(3.0, 3.0, 3.0)),
            ],
            lights: vec![LightDefinition {
                color: Vector3::new(1.0, 1.0, 1.0),
                attenuation: Attenuation::default(),
                kind: LightKind::Spot {
                    direction: Vector3::new(0.0, 0.0, -1.0),
                    angle: Deg(30.0).into(),
                    penumbra: Deg(5.0).into(),
                },
            }],
            ..Default::default()
        };

        match flatten(&root).lights[0].kind {
            WorldLightKind::Spot {
                position,
                direction,
                ..
            } => {
                assert!(close(position, Vector3::new(0.0, 4.0, 0.0)));
                assert!(close(direction, Vector3::new(0.0, 0.0, -1.0)));
            }
            other => panic!("unexpected light {other:?}"),
        }
    }

    #[test]
    fn identity_root_keeps_local_origin() {
        let flat = flatten(&SceneNode {
            lights: vec![point()],
            ..Default::default()
        });
        match flat.lights[0].kind {
            WorldLightKind::Point { position } => assert!(close(position, Vector3::zero())),
            other => panic!("unexpected light {other:?}"),
        }
    }
}
