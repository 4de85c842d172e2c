use std::sync::Arc;

use anyhow::Context;
use log::debug;
use vulkano::{
    buffer::Subbuffer,
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder, CommandBufferUsage,
        RenderPassBeginInfo, SubpassBeginInfo, SubpassContents,
    },
    descriptor_set::allocator::StandardDescriptorSetAllocator,
    device::Queue,
    memory::allocator::MemoryAllocator,
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
    sync::GpuFuture,
};

use super::{
    bloom::{BloomSystem, BloomTargets},
    frame::Frame,
    gbuffer::{
        GBuffer, ALBEDO_FORMAT, DEPTH_FORMAT, EMISSIVE_FORMAT, NORMAL_FORMAT, POSITION_FORMAT,
        SHADED_FORMAT,
    },
    lighting::LightingSystem,
};
use crate::error::RenderError;

/// Owns the deferred render pass, its attachments and the post-geometry systems. Attachments
/// are reallocated whenever a frame asks for a different extent.
pub struct FrameSystem {
    pub gfx_queue: Arc<Queue>,
    memory_allocator: Arc<dyn MemoryAllocator>,
    command_buffer_allocator: Arc<StandardCommandBufferAllocator>,

    render_pass: Arc<RenderPass>,

    pub gbuffer: GBuffer,
    pub bloom_targets: BloomTargets,

    pub lighting_system: LightingSystem,
    pub bloom_system: BloomSystem,
}

impl FrameSystem {
    pub fn new(
        gfx_queue: Arc<Queue>,
        memory_allocator: Arc<dyn MemoryAllocator>,
        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
    ) -> Result<Self, RenderError> {
        let render_pass = vulkano::ordered_passes_renderpass!(
            gfx_queue.device().clone(),
            attachments: {
                shaded: {
                    format: SHADED_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: Store,
                },
                position: {
                    format: POSITION_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: DontCare,
                },
                normal: {
                    format: NORMAL_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: DontCare,
                },
                albedo: {
                    format: ALBEDO_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: DontCare,
                },
                emissive: {
                    format: EMISSIVE_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: Store,
                },
                depth_stencil: {
                    format: DEPTH_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: DontCare,
                },
            },
            passes: [
                {
                    color: [position, normal, albedo, emissive],
                    depth_stencil: {depth_stencil},
                    input: [],
                },
                {
                    color: [shaded],
                    depth_stencil: {},
                    input: [position, normal, albedo, emissive],
                },
            ],
        )
        .context("creating RenderPass")
        .map_err(RenderError::ShaderBuild)?;

        let lighting_subpass = Subpass::from(render_pass.clone(), 1)
            .context("getting lighting subpass")
            .map_err(RenderError::ShaderBuild)?;

        let lighting_system = LightingSystem::new(
            gfx_queue.clone(),
            lighting_subpass,
            memory_allocator.clone(),
            command_buffer_allocator.clone(),
            descriptor_set_allocator.clone(),
        )
        .context("creating lighting system")
        .map_err(RenderError::ShaderBuild)?;

        let bloom_system = BloomSystem::new(
            gfx_queue.device().clone(),
            memory_allocator.clone(),
            descriptor_set_allocator,
        )
        .context("creating bloom system")
        .map_err(RenderError::ShaderBuild)?;

        // placeholders, replaced on the first frame
        let gbuffer = GBuffer::new(memory_allocator.clone(), [1, 1])
            .context("creating initial G-buffer")
            .map_err(RenderError::ResourceAllocation)?;
        let bloom_targets = bloom_system
            .targets([1, 1])
            .context("creating initial bloom targets")
            .map_err(RenderError::ResourceAllocation)?;

        Ok(FrameSystem {
            gfx_queue,
            memory_allocator,
            command_buffer_allocator,
            render_pass,
            gbuffer,
            bloom_targets,
            lighting_system,
            bloom_system,
        })
    }

    /// Starts a frame at `extent`. When `readback` is given the composited image is copied into
    /// it at the end of the frame.
    pub fn frame(
        &mut self,
        before_future: Box<dyn GpuFuture>,
        extent: [u32; 2],
        readback: Option<Subbuffer<[u8]>>,
    ) -> anyhow::Result<Frame> {
        if self.gbuffer.extent() != extent {
            debug!(
                "reallocating frame attachments {:?} -> {:?}",
                self.gbuffer.extent(),
                extent
            );
            // both sets are replaced together so a failure leaves the old ones intact
            let gbuffer = GBuffer::new(self.memory_allocator.clone(), extent)
                .context("creating new G-buffer")?;
            let bloom_targets = self
                .bloom_system
                .targets(extent)
                .context("creating new bloom targets")?;
            self.gbuffer = gbuffer;
            self.bloom_targets = bloom_targets;
        }

        let framebuffer = Framebuffer::new(
            self.render_pass.clone(),
            FramebufferCreateInfo {
                attachments: vec![
                    self.gbuffer.shaded.clone(),
                    self.gbuffer.position.clone(),
                    self.gbuffer.normal.clone(),
                    self.gbuffer.albedo.clone(),
                    self.gbuffer.emissive.clone(),
                    self.gbuffer.depth.clone(),
                ],
                ..Default::default()
            },
        )
        .context("creating framebuffer")?;

        let mut command_buffer_builder = AutoCommandBufferBuilder::primary(
            self.command_buffer_allocator.as_ref(),
            self.gfx_queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .context("creating primary command buffer")?;

        command_buffer_builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values: vec![
                        Some([0.0, 0.0, 0.0, 1.0].into()),
                        Some([0.0, 0.0, 0.0, 0.0].into()),
                        Some([0.0, 0.0, 0.0, 0.0].into()),
                        Some([0.0, 0.0, 0.0, 0.0].into()),
                        Some([0.0, 0.0, 0.0, 0.0].into()),
                        Some(1.0f32.into()),
                    ],
                    ..RenderPassBeginInfo::framebuffer(framebuffer.clone())
                },
                SubpassBeginInfo {
                    contents: SubpassContents::SecondaryCommandBuffers,
                    ..Default::default()
                },
            )
            .context("beginning renderpass on primary command buffer")?;

        Ok(Frame::new(
            self,
            framebuffer,
            before_future,
            command_buffer_builder,
            readback,
        ))
    }

    #[inline]
    pub fn deferred_subpass(&self) -> anyhow::Result<Subpass> {
        Subpass::from(self.render_pass.clone(), 0).context("getting deferred subpass")
    }
}
