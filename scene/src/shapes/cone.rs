use std::f32::consts::TAU;

use cgmath::{InnerSpace, Vector3};

use super::{clamp_param, push_vertex, Shape, RADIUS};

const APEX: f32 = 0.5;
const BASE: f32 = -0.5;

#[derive(Debug, Clone)]
pub struct Cone {
    stacks: u32,
    wedges: u32,
    vertex_data: Vec<f32>,
}

impl Default for Cone {
    fn default() -> Self {
        let mut cone = Cone {
            stacks: 1,
            wedges: 3,
            vertex_data: Vec::new(),
        };
        cone.update_params(1, 3);
        cone
    }
}

impl Shape for Cone {
    fn update_params(&mut self, param1: u32, param2: u32) {
        self.stacks = clamp_param("cone stacks", param1, 1);
        self.wedges = clamp_param("cone wedges", param2, 3);
        self.vertex_data = self.build();
    }

    fn generate_shape(&self) -> &[f32] {
        &self.vertex_data
    }
}

/// Radius shrinks linearly from the base to zero at the apex.
fn radius_at(y: f32) -> f32 {
    RADIUS * (APEX - y) / (APEX - BASE)
}

fn surface(theta: f32, y: f32) -> Vector3<f32> {
    let r = radius_at(y);
    Vector3::new(r * theta.cos(), y, r * theta.sin())
}

/// Gradient of `x² + z² - radius_at(y)²`, which is independent of height.
fn side_normal(theta: f32) -> Vector3<f32> {
    Vector3::new(theta.cos(), RADIUS / (APEX - BASE), theta.sin()).normalize()
}

impl Cone {
    fn build(&self) -> Vec<f32> {
        let d_theta = TAU / self.wedges as f32;
        let dy = (APEX - BASE) / self.stacks as f32;
        let mut out = Vec::new();

        let down = -Vector3::unit_y();
        let center = Vector3::new(0.0, BASE, 0.0);
        for wedge in 0..self.wedges {
            let (t0, t1) = (wedge as f32 * d_theta, (wedge + 1) as f32 * d_theta);
            for p in [center, surface(t0, BASE), surface(t1, BASE)] {
                push_vertex(&mut out, p, down);
            }
        }

        for wedge in 0..self.wedges {
            let (t0, t1) = (wedge as f32 * d_theta, (wedge + 1) as f32 * d_theta);
            let n0 = side_normal(t0);
            let n1 = side_normal(t1);
            let tip = side_normal(0.5 * (t0 + t1));

            for stack in 0..self.stacks {
                let y0 = BASE + stack as f32 * dy;
                let y1 = BASE + (stack + 1) as f32 * dy;
                let at_apex = stack + 1 == self.stacks;
                let (h0, h1) = if at_apex { (tip, tip) } else { (n0, n1) };

                let low0 = surface(t0, y0);
                let low1 = surface(t1, y0);
                let high0 = surface(t0, y1);
                let high1 = surface(t1, y1);

                push_vertex(&mut out, low0, n0);
                push_vertex(&mut out, high0, h0);
                push_vertex(&mut out, high1, h1);
                push_vertex(&mut out, low0, n0);
                push_vertex(&mut out, high1, h1);
                push_vertex(&mut out, low1, n1);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    fn generated(p1: u32, p2: u32) -> Vec<f32> {
        let mut cone = Cone::default();
        cone.update_params(p1, p2);
        cone.generate_shape().to_vec()
    }

    #[test]
    fn vertex_count_covers_base_and_side() {
        let verts = vertices(&generated(3, 10));
        assert_eq!(verts.len(), 10 * 3 + 3 * 10 * 6);
        assert_eq!((verts.len() - 10 * 3) % 6, 0);
    }

    #[test]
    fn normals_are_unit() {
        assert_unit_normals(&generated(4, 9));
    }

    #[test]
    fn triangles_wind_outward() {
        assert_outward_winding(&generated(4, 9));
    }

    #[test]
    fn apex_normals_are_never_degenerate() {
        let data = generated(2, 6);
        for v in vertices(&data) {
            if (v.position.y - APEX).abs() < 1e-6 {
                assert!((v.normal.magnitude() - 1.0).abs() < 1e-4);
                assert!(v.normal.y > 0.0);
            }
        }
    }

    #[test]
    fn side_normals_are_perpendicular_to_the_meridian() {
        let wedges = 8;
        let data = generated(3, wedges);
        let side = &vertices(&data)[(wedges * 3) as usize..];
        // boundary wedge at theta = 0 and an interior one, both away from the apex
        for index in [0usize, 5 * 3 * 6 + 6 + 5] {
            let v = &side[index];
            let theta = v.position.z.atan2(v.position.x);
            let base = Vector3::new(RADIUS * theta.cos(), BASE, RADIUS * theta.sin());
            let meridian = (Vector3::new(0.0, APEX, 0.0) - base).normalize();
            assert!(v.normal.dot(meridian).abs() < 1e-4, "{:?}", v.normal);
        }
    }

    #[test]
    fn update_params_is_idempotent() {
        let mut cone = Cone::default();
        cone.update_params(6, 5);
        let first = cone.generate_shape().to_vec();
        cone.update_params(6, 5);
        assert_eq!(first, cone.generate_shape());
    }
}
