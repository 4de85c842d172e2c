use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Vector3};

use super::{clamp_param, float_capacity, push_vertex, Shape, RADIUS};

#[derive(Debug, Clone)]
pub struct Sphere {
    stacks: u32,
    slices: u32,
    vertex_data: Vec<f32>,
}

impl Default for Sphere {
    fn default() -> Self {
        let mut sphere = Sphere {
            stacks: 2,
            slices: 3,
            vertex_data: Vec::new(),
        };
        sphere.update_params(2, 3);
        sphere
    }
}

impl Shape for Sphere {
    fn update_params(&mut self, param1: u32, param2: u32) {
        self.stacks = clamp_param("sphere stacks", param1, 2);
        self.slices = clamp_param("sphere slices", param2, 3);
        self.vertex_data = self.build();
    }

    fn generate_shape(&self) -> &[f32] {
        &self.vertex_data
    }
}

fn point(phi: f32, theta: f32) -> Vector3<f32> {
    Vector3::new(
        RADIUS * phi.sin() * theta.cos(),
        RADIUS * phi.cos(),
        RADIUS * phi.sin() * theta.sin(),
    )
}

impl Sphere {
    fn build(&self) -> Vec<f32> {
        let d_phi = PI / self.stacks as f32;
        let d_theta = TAU / self.slices as f32;
        let mut out = Vec::with_capacity(float_capacity(&[self.stacks, self.slices, 2]));

        for slice in 0..self.slices {
            let (t0, t1) = (slice as f32 * d_theta, (slice + 1) as f32 * d_theta);
            for stack in 0..self.stacks {
                let (p0, p1) = (stack as f32 * d_phi, (stack + 1) as f32 * d_phi);

                let top0 = point(p0, t0);
                let top1 = point(p0, t1);
                let bottom0 = point(p1, t0);
                let bottom1 = point(p1, t1);

                for p in [top0, top1, bottom1, top0, bottom1, bottom0] {
                    push_vertex(&mut out, p, p.normalize());
                }
            }
        }
        out
    }
}
