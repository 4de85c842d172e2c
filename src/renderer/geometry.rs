use std::sync::Arc;

use anyhow::Context;
use log::debug;
use lumen_scene::PrimitiveKind;
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
    pipeline::{
        graphics::{
            color_blend::{ColorBlendAttachmentState, ColorBlendState},
            depth_stencil::{DepthState, DepthStencilState},
            input_assembly::InputAssemblyState,
            multisample::MultisampleState,
            rasterization::{CullMode, RasterizationState},
            vertex_input::{Vertex, VertexDefinition},
            viewport::ViewportState,
            GraphicsPipelineCreateInfo,
        },
        layout::PipelineDescriptorSetLayoutCreateInfo,
        DynamicState, GraphicsPipeline, Pipeline, PipelineBindPoint, PipelineLayout,
        PipelineShaderStageCreateInfo,
    },
    render_pass::Subpass,
};

use super::{
    fullscreen,
    geometry_shaders::{fs, vs, FrameData, InstanceData, MeshVertex},
    mesh::MeshLibrary,
};

/// Fills the G-buffer: one draw per instance, each reading its record from the instance
/// storage buffer through `gl_InstanceIndex`.
pub struct GeometrySystem {
    gfx_queue: Arc<Queue>,
    subpass: Subpass,
    pipeline: Arc<GraphicsPipeline>,
    storage_buffer_allocator: SubbufferAllocator,
    uniform_buffer_allocator: SubbufferAllocator,
    command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
    descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
}

impl GeometrySystem {
    pub fn new(
        gfx_queue: Arc<Queue>,
        subpass: Subpass,
        memory_allocator: Arc<dyn MemoryAllocator>,
        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
    ) -> anyhow::Result<Self> {
        let pipeline = {
            let device = gfx_queue.device();
            let vs = vs::load(device.clone())
                .context("failed to create shader module")?
                .entry_point("main")
                .context("getting vs entry point")?;
            let fs = fs::load(device.clone())
                .context("failed to create shader module")?
                .entry_point("main")
                .context("getting fs entry point")?;
            let vertex_input_state = MeshVertex::per_vertex()
                .definition(&vs.info().input_interface)
                .context("creating vertex input state")?;
            let stages = [
                PipelineShaderStageCreateInfo::new(vs),
                PipelineShaderStageCreateInfo::new(fs),
            ];
            let layout = PipelineLayout::new(
                device.clone(),
                PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
                    .into_pipeline_layout_create_info(device.clone())
                    .context("creating pipeline layout info")?,
            )
            .context("creating pipeline layout")?;

            GraphicsPipeline::new(
                device.clone(),
                None,
                GraphicsPipelineCreateInfo {
                    stages: stages.into_iter().collect(),
                    vertex_input_state: Some(vertex_input_state),
                    input_assembly_state: Some(InputAssemblyState::default()),
                    viewport_state: Some(ViewportState::default()),
                    rasterization_state: Some(RasterizationState {
                        cull_mode: CullMode::None,
                        ..Default::default()
                    }),
                    depth_stencil_state: Some(DepthStencilState {
                        depth: Some(DepthState::simple()),
                        ..Default::default()
                    }),
                    multisample_state: Some(MultisampleState::default()),
                    color_blend_state: Some(ColorBlendState::with_attachment_states(
                        subpass.num_color_attachments(),
                        ColorBlendAttachmentState::default(),
                    )),
                    dynamic_state: [DynamicState::Viewport].into_iter().collect(),
                    subpass: Some(subpass.clone().into()),
                    ..GraphicsPipelineCreateInfo::layout(layout)
                },
            )
            .context("creating graphics pipeline")?
        };

        let storage_buffer_allocator = SubbufferAllocator::new(
            memory_allocator.clone(),
            SubbufferAllocatorCreateInfo {
                buffer_usage: BufferUsage::STORAGE_BUFFER,
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
        );

        let uniform_buffer_allocator = SubbufferAllocator::new(
            memory_allocator,
            SubbufferAllocatorCreateInfo {
                buffer_usage: BufferUsage::UNIFORM_BUFFER,
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
        );

        Ok(GeometrySystem {
            gfx_queue,
            subpass,
            pipeline,
            storage_buffer_allocator,
            uniform_buffer_allocator,
            command_buffer_allocator,
            descriptor_set_allocator,
        })
    }

    /// Writes this frame's instance records. Never empty: a storage buffer binding needs at
    /// least one element, so an empty scene gets a zeroed placeholder that nothing reads.
    pub fn upload_instances(
        &self,
        instances: &[InstanceData],
    ) -> anyhow::Result<Subbuffer<[InstanceData]>> {
        let _span = span!(Level::INFO, "update instance buffer").entered();

        let len = instances.len().max(1);
        let buffer = self
            .storage_buffer_allocator
            .allocate_slice::<InstanceData>(len as _)
            .context("allocating instance buffer")?;

        {
            let mut guard = buffer.write()?;
            if instances.is_empty() {
                guard[0] = InstanceData::default();
            } else {
                guard.copy_from_slice(instances);
            }
        }

        Ok(buffer)
    }

    /// Builds a secondary command buffer drawing instance `i` with the mesh for `kinds[i]`.
    pub fn draw(
        &self,
        viewport_dimensions: [u32; 2],
        frame_data: FrameData,
        instances: Subbuffer<[InstanceData]>,
        kinds: &[PrimitiveKind],
        meshes: &MeshLibrary,
    ) -> anyhow::Result<Arc<SecondaryAutoCommandBuffer>> {
        let _span = span!(Level::INFO, "geometry draw").entered();

        let uniform_buffer: Subbuffer<FrameData> = self
            .uniform_buffer_allocator
            .allocate_sized()
            .context("allocating frame uniform")?;
        *uniform_buffer.write()? = frame_data;

        let set_layouts = self.pipeline.layout().set_layouts();

        let uniform_set = PersistentDescriptorSet::new(
            &self.descriptor_set_allocator,
            set_layouts
                .first()
                .context("geometry pipeline has no frame set layout")?
                .clone(),
            [WriteDescriptorSet::buffer(0, uniform_buffer)],
            [],
        )
        .context("creating uniform buffer descriptor set")?;

        let instance_set = PersistentDescriptorSet::new(
            &self.descriptor_set_allocator,
            set_layouts
                .get(1)
                .context("geometry pipeline has no instance set layout")?
                .clone(),
            [WriteDescriptorSet::buffer(0, instances)],
            [],
        )
        .context("creating instance descriptor set")?;

        let mut builder = AutoCommandBufferBuilder::secondary(
            self.command_buffer_allocator.as_ref(),
            self.gfx_queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
            CommandBufferInheritanceInfo {
                render_pass: Some(self.subpass.clone().into()),
                ..Default::default()
            },
        )
        .context("creating geometry command buffer")?;

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
                vec![uniform_set, instance_set],
            )?;

        let mut drawn = 0;
        for (index, kind) in kinds.iter().enumerate() {
            let Some(mesh) = meshes.get(*kind) else {
                continue;
            };
            builder
                .bind_vertex_buffers(0, mesh.vertex_buffer.clone())?
                .draw(mesh.vertex_count(), 1, 0, index as u32)?;
            drawn += 1;
        }
        debug!("geometry pass drew {drawn} of {} instances", kinds.len());

        builder.build().context("building geometry command buffer")
    }
}
