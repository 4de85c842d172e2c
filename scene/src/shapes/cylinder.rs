use std::f32::consts::TAU;

use cgmath::Vector3;

use super::{clamp_param, push_vertex, Shape, RADIUS};

const TOP: f32 = 0.5;
const BOTTOM: f32 = -0.5;

#[derive(Debug, Clone)]
pub struct Cylinder {
    stacks: u32,
    wedges: u32,
    vertex_data: Vec<f32>,
}

impl Default for Cylinder {
    fn default() -> Self {
        let mut cylinder = Cylinder {
            stacks: 1,
            wedges: 3,
            vertex_data: Vec::new(),
        };
        cylinder.update_params(1, 3);
        cylinder
    }
}

impl Shape for Cylinder {
    fn update_params(&mut self, param1: u32, param2: u32) {
        self.stacks = clamp_param("cylinder stacks", param1, 1);
        self.wedges = clamp_param("cylinder wedges", param2, 3);
        self.vertex_data = self.build();
    }

    fn generate_shape(&self) -> &[f32] {
        &self.vertex_data
    }
}

fn ring(theta: f32, y: f32) -> Vector3<f32> {
    Vector3::new(RADIUS * theta.cos(), y, RADIUS * theta.sin())
}

impl Cylinder {
    fn build(&self) -> Vec<f32> {
        let d_theta = TAU / self.wedges as f32;
        let dy = (TOP - BOTTOM) / self.stacks as f32;
        let mut out = Vec::new();

        for wedge in 0..self.wedges {
            let (t0, t1) = (wedge as f32 * d_theta, (wedge + 1) as f32 * d_theta);

            let down = -Vector3::unit_y();
            let center = Vector3::new(0.0, BOTTOM, 0.0);
            for p in [center, ring(t0, BOTTOM), ring(t1, BOTTOM)] {
                push_vertex(&mut out, p, down);
            }

            let up = Vector3::unit_y();
            let center = Vector3::new(0.0, TOP, 0.0);
            for p in [center, ring(t1, TOP), ring(t0, TOP)] {
                push_vertex(&mut out, p, up);
            }
        }

        for wedge in 0..self.wedges {
            let (t0, t1) = (wedge as f32 * d_theta, (wedge + 1) as f32 * d_theta);
            let n0 = Vector3::new(t0.cos(), 0.0, t0.sin());
            let n1 = Vector3::new(t1.cos(), 0.0, t1.sin());

            for stack in 0..self.stacks {
                let y0 = BOTTOM + stack as f32 * dy;
                let y1 = BOTTOM + (stack + 1) as f32 * dy;

                let low0 = ring(t0, y0);
                let low1 = ring(t1, y0);
                let high0 = ring(t0, y1);
                let high1 = ring(t1, y1);

                push_vertex(&mut out, low0, n0);
                push_vertex(&mut out, high0, n0);
                push_vertex(&mut out, high1, n1);
                push_vertex(&mut out, low0, n0);
                push_vertex(&mut out, high1, n1);
                push_vertex(&mut out, low1, n1);
            }
        }
        out
    }
}
