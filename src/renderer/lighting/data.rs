use cgmath::{Point3, Vector3};
use log::warn;
use lumen_scene::{GlobalCoefficients, WorldLight, WorldLightKind};
use vulkano::buffer::BufferContents;

pub const MAX_LIGHTS: usize = 8;

const KIND_POINT: f32 = 0.0;
const KIND_DIRECTIONAL: f32 = 1.0;
const KIND_SPOT: f32 = 2.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, BufferContents)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub attenuation: [f32; 4],
    /// `x` kind, `y` outer angle, `z` penumbra. Angles in radians.
    pub params: [f32; 4],
}

impl From<&WorldLight> for GpuLight {
    fn from(light: &WorldLight) -> Self {
        let mut gpu = GpuLight {
            color: vec4(light.color, 1.0),
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ],
            ..Default::default()
        };

        match light.kind {
            WorldLightKind::Point { position } => {
                gpu.position = vec4(position, 1.0);
                gpu.params[0] = KIND_POINT;
            }
            WorldLightKind::Directional { direction } => {
                gpu.direction = vec4(direction, 0.0);
                gpu.params[0] = KIND_DIRECTIONAL;
            }
            WorldLightKind::Spot {
                position,
                direction,
                angle,
                penumbra,
            } => {
                gpu.position = vec4(position, 1.0);
                gpu.direction = vec4(direction, 0.0);
                gpu.params = [KIND_SPOT, angle.0, penumbra.0, 0.0];
            }
        }

        gpu
    }
}

/// Uniform block read by the lighting subpass, rewritten every frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, BufferContents)]
pub struct LightingData {
    pub camera_position: [f32; 4],
    /// `ka`, `kd`, `ks`.
    pub coefficients: [f32; 4],
    pub background: [f32; 4],
    pub light_count: [i32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl LightingData {
    pub fn new(
        camera_position: Point3<f32>,
        globals: &GlobalCoefficients,
        background: [f32; 3],
        lights: &[WorldLight],
    ) -> Self {
        if lights.len() > MAX_LIGHTS {
            warn!(
                "scene has {} lights, only the first {MAX_LIGHTS} are shaded",
                lights.len()
            );
        }

        let mut gpu_lights = [GpuLight::default(); MAX_LIGHTS];
        let mut count = 0;
        for (slot, light) in gpu_lights.iter_mut().zip(lights) {
            *slot = light.into();
            count += 1;
        }

        LightingData {
            camera_position: [camera_position.x, camera_position.y, camera_position.z, 1.0],
            coefficients: [globals.ka, globals.kd, globals.ks, 0.0],
            background: [background[0], background[1], background[2], 1.0],
            light_count: [count, 0, 0, 0],
            lights: gpu_lights,
        }
    }
}

fn vec4(v: Vector3<f32>, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rad};
    use lumen_scene::Attenuation;

    use super::*;

    fn point(x: f32) -> WorldLight {
        WorldLight {
            color: Vector3::new(1.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
            kind: WorldLightKind::Point {
                position: Vector3::new(x, 0.0, 0.0),
            },
        }
    }

    #[test]
    fn light_array_caps_at_eight() {
        let lights: Vec<WorldLight> = (0..11).map(|i| point(i as f32)).collect();
        let data = LightingData::new(
            Point3::new(0.0, 0.0, 5.0),
            &GlobalCoefficients::default(),
            [0.0; 3],
            &lights,
        );
        assert_eq!(data.light_count[0], MAX_LIGHTS as i32);
        assert_eq!(data.lights[7].position, [7.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unused_slots_stay_zeroed() {
        let data = LightingData::new(
            Point3::new(0.0, 0.0, 0.0),
            &GlobalCoefficients::default(),
            [0.1, 0.2, 0.3],
            &[point(2.0)],
        );
        assert_eq!(data.light_count[0], 1);
        assert_eq!(data.lights[1], GpuLight::default());
        assert_eq!(data.background, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn spot_packs_angles_in_radians() {
        let spot = WorldLight {
            color: Vector3::new(1.0, 0.5, 0.0),
            attenuation: Attenuation::from([1.0, 0.1, 0.01]),
            kind: WorldLightKind::Spot {
                position: Vector3::new(0.0, 3.0, 0.0),
                direction: Vector3::new(0.0, -1.0, 0.0),
                angle: Deg(30.0).into(),
                penumbra: Rad(0.0),
            },
        };
        let gpu = GpuLight::from(&spot);
        assert_eq!(gpu.params[0], KIND_SPOT);
        assert!((gpu.params[1] - std::f32::consts::FRAC_PI_6).abs() < 1e-6);
        assert_eq!(gpu.attenuation, [1.0, 0.1, 0.01, 0.0]);
        assert_eq!(gpu.direction, [0.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn block_matches_std140_layout() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 80);
        assert_eq!(std::mem::size_of::<LightingData>(), 64 + 80 * MAX_LIGHTS);
    }
}
