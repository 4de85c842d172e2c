use cgmath::{InnerSpace, Vector3};

use super::{clamp_param, float_capacity, push_vertex, Shape, RADIUS};

/// Corners of each face as `[top_left, top_right, bottom_left, bottom_right]`, seen from outside.
const FACES: [[[f32; 3]; 4]; 6] = {
    const S: f32 = RADIUS;
    [
        // +z
        [[-S, S, S], [S, S, S], [-S, -S, S], [S, -S, S]],
        // -z
        [[S, S, -S], [-S, S, -S], [S, -S, -S], [-S, -S, -S]],
        // -x
        [[-S, S, -S], [-S, S, S], [-S, -S, -S], [-S, -S, S]],
        // +x
        [[S, S, S], [S, S, -S], [S, -S, S], [S, -S, -S]],
        // +y
        [[-S, S, -S], [S, S, -S], [-S, S, S], [S, S, S]],
        // -y
        [[-S, -S, S], [S, -S, S], [-S, -S, -S], [S, -S, -S]],
    ]
};

#[derive(Debug, Clone)]
pub struct Cube {
    subdivisions: u32,
    vertex_data: Vec<f32>,
}

impl Default for Cube {
    fn default() -> Self {
        let mut cube = Cube {
            subdivisions: 1,
            vertex_data: Vec::new(),
        };
        cube.update_params(1, 1);
        cube
    }
}

impl Shape for Cube {
    /// Only `param1` matters: the per-face grid size.
    fn update_params(&mut self, param1: u32, _param2: u32) {
        self.subdivisions = clamp_param("cube subdivisions", param1, 1);
        self.vertex_data = self.build();
    }

    fn generate_shape(&self) -> &[f32] {
        &self.vertex_data
    }
}

impl Cube {
    fn build(&self) -> Vec<f32> {
        let n = self.subdivisions;
        let mut out = Vec::with_capacity(float_capacity(&[FACES.len() as u32, n, n, 2]));
        for [tl, tr, bl, br] in FACES {
            make_face(
                &mut out,
                tl.into(),
                tr.into(),
                bl.into(),
                br.into(),
                self.subdivisions,
            );
        }
        out
    }
}

fn make_face(
    out: &mut Vec<f32>,
    top_left: Vector3<f32>,
    top_right: Vector3<f32>,
    bottom_left: Vector3<f32>,
    bottom_right: Vector3<f32>,
    n: u32,
) {
    let at = |u: f32, v: f32| {
        let top = top_left + (top_right - top_left) * u;
        let bottom = bottom_left + (bottom_right - bottom_left) * u;
        top + (bottom - top) * v
    };
    let step = 1.0 / n as f32;

    for row in 0..n {
        for col in 0..n {
            let (u0, u1) = (col as f32 * step, (col + 1) as f32 * step);
            let (v0, v1) = (row as f32 * step, (row + 1) as f32 * step);
            make_tile(out, at(u0, v0), at(u1, v0), at(u0, v1), at(u1, v1));
        }
    }
}

fn make_tile(
    out: &mut Vec<f32>,
    top_left: Vector3<f32>,
    top_right: Vector3<f32>,
    bottom_left: Vector3<f32>,
    bottom_right: Vector3<f32>,
) {
    let normal = (bottom_left - top_left)
        .cross(bottom_right - top_left)
        .normalize();

    for p in [top_left, bottom_left, bottom_right, top_left, bottom_right, top_right] {
        push_vertex(out, p, normal);
    }
}
