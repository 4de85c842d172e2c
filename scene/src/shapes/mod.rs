//! Procedural primitives as flat `[px, py, pz, nx, ny, nz]` triangle lists.

pub use cone::Cone;
pub use cube::Cube;
pub use cylinder::Cylinder;
pub use sphere::Sphere;

mod cone;
mod cube;
mod cylinder;
mod sphere;

use cgmath::Vector3;

use crate::graph::PrimitiveKind;

/// Floats per vertex: position then normal.
pub const VERTEX_STRIDE: usize = 6;

/// Radius shared by every round primitive; all shapes fit the unit cube at the origin.
pub const RADIUS: f32 = 0.5;

/// Upper bound for either tessellation parameter. Larger requests are clamped to it, which keeps
/// the densest shape (a 256x256 grid per cube face) a few million vertices.
pub const MAX_TESSELLATION: u32 = 256;

pub trait Shape {
    /// Clamps to the shape's minimums and to `MAX_TESSELLATION`, then regenerates the whole
    /// vertex array.
    fn update_params(&mut self, param1: u32, param2: u32);

    fn generate_shape(&self) -> &[f32];
}

/// Vertex data for `kind` at the given tessellation. `Mesh` has no procedural form.
pub fn tessellate(kind: PrimitiveKind, param1: u32, param2: u32) -> Vec<f32> {
    fn build<S: Shape + Default>(param1: u32, param2: u32) -> Vec<f32> {
        let mut shape = S::default();
        shape.update_params(param1, param2);
        shape.generate_shape().to_vec()
    }

    match kind {
        PrimitiveKind::Cube => build::<Cube>(param1, param2),
        PrimitiveKind::Sphere => build::<Sphere>(param1, param2),
        PrimitiveKind::Cone => build::<Cone>(param1, param2),
        PrimitiveKind::Cylinder => build::<Cylinder>(param1, param2),
        PrimitiveKind::Mesh => Vec::new(),
    }
}

fn push_vertex(out: &mut Vec<f32>, position: Vector3<f32>, normal: Vector3<f32>) {
    out.extend_from_slice(&[
        position.x, position.y, position.z, normal.x, normal.y, normal.z,
    ]);
}

fn clamp_param(name: &str, value: u32, min: u32) -> u32 {
    let clamped = value.clamp(min, MAX_TESSELLATION.max(min));
    if clamped != value {
        log::debug!("clamping {name} from {value} to {clamped}");
    }
    clamped
}

/// Floats needed for the product of `factors` triangles, or 0 (no reservation) if the product overflows.
fn float_capacity(factors: &[u32]) -> usize {
    factors
        .iter()
        .try_fold(3 * VERTEX_STRIDE, |acc, f| acc.checked_mul(*f as usize))
        .unwrap_or(0)
}
