pub use data::LightingData;

mod data;

use std::sync::Arc;

use anyhow::Context;
use tracing::{span, Level};
use vulkano::{
    buffer::{
        allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo},
        BufferUsage, Subbuffer,
    },
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder,
        CommandBufferInheritanceInfo, CommandBufferUsage, SecondaryAutoCommandBuffer,
    },
    descriptor_set::{
        allocator::StandardDescriptorSetAllocator, PersistentDescriptorSet, WriteDescriptorSet,
    },
    device::Queue,
    memory::allocator::{MemoryAllocator, MemoryTypeFilter},
    pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint},
    render_pass::Subpass,
};

use super::{
    fullscreen::{self, FullscreenVertex},
    gbuffer::GBuffer,
    geometry_shaders::InstanceData,
};

/// Shades every pixel of the lighting subpass from the G-buffer input attachments.
pub struct LightingSystem {
    gfx_queue: Arc<Queue>,
    vertex_buffer: Subbuffer<[FullscreenVertex]>,
    subpass: Subpass,
    pipeline: Arc<GraphicsPipeline>,
    uniform_buffer_allocator: SubbufferAllocator,
    command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
    descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
}

impl LightingSystem {
    pub fn new(
        gfx_queue: Arc<Queue>,
        subpass: Subpass,
        memory_allocator: Arc<dyn MemoryAllocator>,
        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
    ) -> anyhow::Result<Self> {
        let vertex_buffer = fullscreen::triangle(memory_allocator.clone())?;

        let device = gfx_queue.device().clone();
        let fs = fs::load(device.clone()).context("failed to create lighting shader module")?;
        let pipeline = fullscreen::pipeline(device, fs, subpass.clone())
            .context("creating lighting pipeline")?;

        let uniform_buffer_allocator = SubbufferAllocator::new(
            memory_allocator,
            SubbufferAllocatorCreateInfo {
                buffer_usage: BufferUsage::UNIFORM_BUFFER,
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
        );

        Ok(LightingSystem {
            gfx_queue,
            vertex_buffer,
            subpass,
            pipeline,
            uniform_buffer_allocator,
            command_buffer_allocator,
            descriptor_set_allocator,
        })
    }

    /// Builds a secondary command buffer that runs the lighting shader over the whole target.
    /// `instances` is the same storage buffer the geometry subpass drew from.
    pub fn draw(
        &self,
        viewport_dimensions: [u32; 2],
        gbuffer: &GBuffer,
        lighting: LightingData,
        instances: Subbuffer<[InstanceData]>,
    ) -> anyhow::Result<Arc<SecondaryAutoCommandBuffer>> {
        let _span = span!(Level::INFO, "lighting draw").entered();

        let uniform_buffer: Subbuffer<LightingData> = self
            .uniform_buffer_allocator
            .allocate_sized()
            .context("allocating lighting uniform")?;
        *uniform_buffer.write()? = lighting;

        let layout = self
            .pipeline
            .layout()
            .set_layouts()
            .first()
            .context("lighting pipeline has no descriptor set layout")?
            .clone();

        let descriptor_set = PersistentDescriptorSet::new(
            &self.descriptor_set_allocator,
            layout,
            [
                WriteDescriptorSet::image_view(0, gbuffer.position.clone()),
                WriteDescriptorSet::image_view(1, gbuffer.normal.clone()),
                WriteDescriptorSet::image_view(2, gbuffer.albedo.clone()),
                WriteDescriptorSet::image_view(3, gbuffer.emissive.clone()),
                WriteDescriptorSet::buffer(4, uniform_buffer),
                WriteDescriptorSet::buffer(5, instances),
            ],
            [],
        )
        .context("creating lighting descriptor set")?;

        let mut builder = AutoCommandBufferBuilder::secondary(
            self.command_buffer_allocator.as_ref(),
            self.gfx_queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
            CommandBufferInheritanceInfo {
                render_pass: Some(self.subpass.clone().into()),
                ..Default::default()
            },
        )
        .context("creating lighting command buffer")?;

        builder
            .set_viewport(
                0,
                [fullscreen::viewport(viewport_dimensions)]
                    .into_iter()
                    .collect(),
            )?
            .bind_pipeline_graphics(self.pipeline.clone())?
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                self.pipeline.layout().clone(),
                0,
                descriptor_set,
            )?
            .bind_vertex_buffers(0, self.vertex_buffer.clone())?
            .draw(self.vertex_buffer.len() as u32, 1, 0, 0)?;

        builder.build().context("building lighting command buffer")
    }
}

mod fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "assets/shaders/deferred/lighting.frag"
    }
}
