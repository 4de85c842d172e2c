use anyhow::anyhow;
use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3};
use lumen_scene::{shapes::VERTEX_STRIDE, RenderInstance};
use vulkano::{buffer::BufferContents, pipeline::graphics::vertex_input::Vertex};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, BufferContents, Vertex)]
pub struct MeshVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
}

impl MeshVertex {
    /// Reinterprets interleaved `position, normal` floats as vertices.
    pub fn from_interleaved(data: &[f32]) -> anyhow::Result<Vec<MeshVertex>> {
        let vertices: &[[f32; VERTEX_STRIDE]] = bytemuck::try_cast_slice(data)
            .map_err(|e| anyhow!("vertex data is not a whole number of vertices: {e:?}"))?;
        Ok(vertices
            .iter()
            .map(|v| MeshVertex {
                position: [v[0], v[1], v[2]],
                normal: [v[3], v[4], v[5]],
            })
            .collect())
    }
}

/// Maps GL clip space (y up, z in [-1, 1]) onto Vulkan's (y down, z in [0, 1]).
#[rustfmt::skip]
pub fn clip_correction() -> Matrix4<f32> {
    Matrix4::new(
        1.0,  0.0, 0.0, 0.0,
        0.0, -1.0, 0.0, 0.0,
        0.0,  0.0, 0.5, 0.0,
        0.0,  0.0, 0.5, 1.0,
    )
}

#[repr(C)]
#[derive(Clone, Copy, Debug, BufferContents)]
pub struct FrameData {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl FrameData {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        FrameData {
            view: view.into(),
            proj: (clip_correction() * projection).into(),
        }
    }
}

/// Per-instance record shared by the geometry and lighting passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, BufferContents)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    /// `w` holds the shininess exponent.
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
}

const AMBIENT_FALLBACK_EPSILON: f32 = 1e-4;

impl InstanceData {
    pub fn pack(instance: &RenderInstance, ambient_fallback: bool) -> Self {
        let material = &instance.primitive.material;
        let ambient = if ambient_fallback && material.ambient.magnitude() < AMBIENT_FALLBACK_EPSILON
        {
            material.diffuse
        } else {
            material.ambient
        };

        let normal_matrix = instance
            .world
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity);

        InstanceData {
            model: instance.world.into(),
            normal_matrix: normal_matrix.into(),
            ambient: rgb(ambient, 1.0),
            diffuse: rgb(material.diffuse, 1.0),
            specular: rgb(material.specular, material.shininess),
            emissive: rgb(material.emissive, 1.0),
        }
    }
}

fn rgb(color: Vector3<f32>, w: f32) -> [f32; 4] {
    color.extend(w).into()
}

pub mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "assets/shaders/deferred/geometry.vert",
    }
}

pub mod fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "assets/shaders/deferred/geometry.frag"
    }
}
