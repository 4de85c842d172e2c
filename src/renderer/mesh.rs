use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use log::debug;
use lumen_scene::{shapes, PrimitiveKind};
use vulkano::{
    buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter},
};

use super::geometry_shaders::MeshVertex;

#[derive(Default)]
pub struct MeshBuilder {
    vertices: Option<Vec<MeshVertex>>,
}

impl MeshBuilder {
    pub fn with_vertices(mut self, value: Vec<MeshVertex>) -> Self {
        self.vertices = Some(value);
        self
    }

    pub fn build(self, memory_allocator: Arc<dyn MemoryAllocator>) -> anyhow::Result<Mesh> {
        let vertices = self.vertices.unwrap_or_default();

        let vertex_buffer = Buffer::from_iter(
            memory_allocator,
            BufferCreateInfo {
                usage: BufferUsage::VERTEX_BUFFER,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            vertices,
        )
        .context("creating vertex buffer")?;

        Ok(Mesh { vertex_buffer })
    }
}

/// Non-indexed triangle list.
pub struct Mesh {
    pub vertex_buffer: Subbuffer<[MeshVertex]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> u32 {
        self.vertex_buffer.len() as u32
    }
}

/// One mesh per primitive kind at the current tessellation. Rebuilt whole when the
/// tessellation parameters change; the old buffers drop with the old library.
pub struct MeshLibrary {
    meshes: HashMap<PrimitiveKind, Mesh>,
    params: (u32, u32),
}

impl MeshLibrary {
    pub fn build(
        memory_allocator: Arc<dyn MemoryAllocator>,
        param1: u32,
        param2: u32,
    ) -> anyhow::Result<Self> {
        let mut meshes = HashMap::new();
        for kind in PrimitiveKind::ALL {
            let data = shapes::tessellate(kind, param1, param2);
            if data.is_empty() {
                continue;
            }
            let vertices = MeshVertex::from_interleaved(&data)
                .with_context(|| format!("converting {kind:?} vertices"))?;
            debug!("tessellated {kind:?}: {} vertices", vertices.len());
            let mesh = MeshBuilder::default()
                .with_vertices(vertices)
                .build(memory_allocator.clone())
                .with_context(|| format!("uploading {kind:?} mesh"))?;
            meshes.insert(kind, mesh);
        }

        Ok(MeshLibrary {
            meshes,
            params: (param1, param2),
        })
    }

    /// `None` for kinds with no procedural geometry.
    pub fn get(&self, kind: PrimitiveKind) -> Option<&Mesh> {
        self.meshes.get(&kind)
    }

    pub fn params(&self) -> (u32, u32) {
        self.params
    }
}
