use std::sync::Arc;

use anyhow::Context;
use vulkano::{
    buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
    device::Device,
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter},
    pipeline::{
        graphics::{
            color_blend::{ColorBlendAttachmentState, ColorBlendState},
            input_assembly::InputAssemblyState,
            multisample::MultisampleState,
            rasterization::RasterizationState,
            vertex_input::{Vertex, VertexDefinition},
            viewport::{Viewport, ViewportState},
            GraphicsPipelineCreateInfo,
        },
        layout::PipelineDescriptorSetLayoutCreateInfo,
        DynamicState, GraphicsPipeline, PipelineLayout, PipelineShaderStageCreateInfo,
    },
    render_pass::Subpass,
    shader::ShaderModule,
};

#[derive(BufferContents, Vertex)]
#[repr(C)]
pub struct FullscreenVertex {
    #[format(R32G32_SFLOAT)]
    position: [f32; 2],
}

/// One oversized triangle covering the whole viewport.
pub fn triangle(
    memory_allocator: Arc<dyn MemoryAllocator>,
) -> anyhow::Result<Subbuffer<[FullscreenVertex]>> {
    let vertices = [
        FullscreenVertex {
            position: [-1.0, -1.0],
        },
        FullscreenVertex {
            position: [3.0, -1.0],
        },
        FullscreenVertex {
            position: [-1.0, 3.0],
        },
    ];

    Buffer::from_iter(
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
    .context("creating full-screen triangle buffer")
}

pub fn viewport(extent: [u32; 2]) -> Viewport {
    Viewport {
        offset: [0.0, 0.0],
        extent: [extent[0] as f32, extent[1] as f32],
        depth_range: 0.0..=1.0,
    }
}

/// Pipeline for a full-screen fragment stage: no depth test, no culling, dynamic viewport.
pub fn pipeline(
    device: Arc<Device>,
    fs: Arc<ShaderModule>,
    subpass: Subpass,
) -> anyhow::Result<Arc<GraphicsPipeline>> {
    let vs = vs::load(device.clone())
        .context("failed to create shader module")?
        .entry_point("main")
        .context("getting vs entry point")?;
    let fs = fs.entry_point("main").context("getting fs entry point")?;

    let vertex_input_state = FullscreenVertex::per_vertex()
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
        device,
        None,
        GraphicsPipelineCreateInfo {
            stages: stages.into_iter().collect(),
            vertex_input_state: Some(vertex_input_state),
            input_assembly_state: Some(InputAssemblyState::default()),
            viewport_state: Some(ViewportState::default()),
            rasterization_state: Some(RasterizationState::default()),
            multisample_state: Some(MultisampleState::default()),
            color_blend_state: Some(ColorBlendState::with_attachment_states(
                subpass.num_color_attachments(),
                ColorBlendAttachmentState::default(),
            )),
            dynamic_state: [DynamicState::Viewport].into_iter().collect(),
            subpass: Some(subpass.into()),
            ..GraphicsPipelineCreateInfo::layout(layout)
        },
    )
    .context("creating full-screen pipeline")
}

pub mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "assets/shaders/deferred/fullscreen.vert",
    }
}
