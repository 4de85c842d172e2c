use kernel::{blur_schedule, gaussian_weights};

mod kernel;

use std::sync::Arc;

use anyhow::Context;
use log::debug;
use tracing::{span, Level};
use vulkano::{
    buffer::{BufferContents, Subbuffer},
    command_buffer::{
        AutoCommandBufferBuilder, PrimaryAutoCommandBuffer, RenderPassBeginInfo,
        SubpassBeginInfo, SubpassContents,
    },
    descriptor_set::{
        allocator::StandardDescriptorSetAllocator, PersistentDescriptorSet, WriteDescriptorSet,
    },
    device::Device,
    format::Format,
    image::{
        sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
        view::ImageView,
        ImageUsage,
    },
    memory::allocator::MemoryAllocator,
    pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint},
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
};

use super::{
    fullscreen::{self, FullscreenVertex},
    gbuffer::{attachment, GBuffer},
};
use crate::settings::{BloomSettings, BloomSource, BlurMode};

pub const BRIGHT_FORMAT: Format = Format::R16G16B16A16_SFLOAT;
pub const OUTPUT_FORMAT: Format = Format::R8G8B8A8_UNORM;

/// Ping-pong targets for extract and blur, and the final composited image.
pub struct BloomTargets {
    pub bright: [Arc<ImageView>; 2],
    bright_framebuffers: [Arc<Framebuffer>; 2],
    pub output: Arc<ImageView>,
    output_framebuffer: Arc<Framebuffer>,
}

impl BloomTargets {
    pub fn extent(&self) -> [u32; 2] {
        let [width, height, _] = self.output.image().extent();
        [width, height]
    }
}

/// Extract, blur and composite stages. Each stage is a full-screen triangle rendered through
/// its own single-subpass render pass, recorded inline into the frame's primary command buffer.
pub struct BloomSystem {
    memory_allocator: Arc<dyn MemoryAllocator>,
    descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
    hdr_pass: Arc<RenderPass>,
    output_pass: Arc<RenderPass>,
    vertex_buffer: Subbuffer<[FullscreenVertex]>,
    extract_pipeline: Arc<GraphicsPipeline>,
    blur_pipeline: Arc<GraphicsPipeline>,
    composite_pipeline: Arc<GraphicsPipeline>,
    sampler: Arc<Sampler>,
}

impl BloomSystem {
    pub fn new(
        device: Arc<Device>,
        memory_allocator: Arc<dyn MemoryAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
    ) -> anyhow::Result<Self> {
        let hdr_pass = vulkano::single_pass_renderpass!(
            device.clone(),
            attachments: {
                color: {
                    format: BRIGHT_FORMAT,
                    samples: 1,
                    load_op: DontCare,
                    store_op: Store,
                },
            },
            pass: {
                color: [color],
                depth_stencil: {},
            },
        )
        .context("creating bloom render pass")?;

        let output_pass = vulkano::single_pass_renderpass!(
            device.clone(),
            attachments: {
                color: {
                    format: OUTPUT_FORMAT,
                    samples: 1,
                    load_op: DontCare,
                    store_op: Store,
                },
            },
            pass: {
                color: [color],
                depth_stencil: {},
            },
        )
        .context("creating composite render pass")?;

        let hdr_subpass = Subpass::from(hdr_pass.clone(), 0).context("getting bloom subpass")?;
        let output_subpass =
            Subpass::from(output_pass.clone(), 0).context("getting composite subpass")?;

        let extract_pipeline = fullscreen::pipeline(
            device.clone(),
            extract_fs::load(device.clone()).context("failed to create extract shader module")?,
            hdr_subpass.clone(),
        )
        .context("creating extract pipeline")?;

        let blur_pipeline = fullscreen::pipeline(
            device.clone(),
            blur_fs::load(device.clone()).context("failed to create blur shader module")?,
            hdr_subpass,
        )
        .context("creating blur pipeline")?;

        let composite_pipeline = fullscreen::pipeline(
            device.clone(),
            composite_fs::load(device.clone())
                .context("failed to create composite shader module")?,
            output_subpass,
        )
        .context("creating composite pipeline")?;

        let sampler = Sampler::new(
            device,
            SamplerCreateInfo {
                mag_filter: Filter::Linear,
                min_filter: Filter::Linear,
                address_mode: [SamplerAddressMode::ClampToEdge; 3],
                ..Default::default()
            },
        )
        .context("creating bloom sampler")?;

        let vertex_buffer = fullscreen::triangle(memory_allocator.clone())?;

        Ok(BloomSystem {
            memory_allocator,
            descriptor_set_allocator,
            hdr_pass,
            output_pass,
            vertex_buffer,
            extract_pipeline,
            blur_pipeline,
            composite_pipeline,
            sampler,
        })
    }

    pub fn targets(&self, extent: [u32; 2]) -> anyhow::Result<BloomTargets> {
        let bright_usage = ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED;
        let bright = [
            attachment(&self.memory_allocator, extent, BRIGHT_FORMAT, bright_usage)
                .context("creating bloom target 0")?,
            attachment(&self.memory_allocator, extent, BRIGHT_FORMAT, bright_usage)
                .context("creating bloom target 1")?,
        ];
        let output = attachment(
            &self.memory_allocator,
            extent,
            OUTPUT_FORMAT,
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC,
        )
        .context("creating output image")?;

        let bright_framebuffers = [
            framebuffer(&self.hdr_pass, &bright[0])?,
            framebuffer(&self.hdr_pass, &bright[1])?,
        ];
        let output_framebuffer = framebuffer(&self.output_pass, &output)?;

        Ok(BloomTargets {
            bright,
            bright_framebuffers,
            output,
            output_framebuffer,
        })
    }

    /// Records every bloom stage after the main render pass. With bloom disabled only the
    /// composite runs, at zero intensity, so the output is the shaded image alone.
    pub fn record(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        gbuffer: &GBuffer,
        targets: &BloomTargets,
        settings: &BloomSettings,
    ) -> anyhow::Result<()> {
        let _span = span!(Level::INFO, "bloom").entered();
        let extent = targets.extent();

        let (bloom, intensity) = if settings.enabled {
            let blurred = self.extract_and_blur(builder, gbuffer, targets, settings, extent)?;
            (blurred, settings.intensity)
        } else {
            (gbuffer.shaded.clone(), 0.0)
        };

        let set = self.sampled_set(&self.composite_pipeline, [gbuffer.shaded.clone(), bloom])?;
        self.stage(
            builder,
            &targets.output_framebuffer,
            &self.composite_pipeline,
            set,
            composite_fs::CompositeParams {
                config: [intensity, 0.0, 0.0, 0.0],
            },
            extent,
        )
        .context("recording composite")
    }

    fn extract_and_blur(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        gbuffer: &GBuffer,
        targets: &BloomTargets,
        settings: &BloomSettings,
        extent: [u32; 2],
    ) -> anyhow::Result<Arc<ImageView>> {
        let source = match settings.source {
            BloomSource::Shaded => gbuffer.shaded.clone(),
            BloomSource::Emissive => gbuffer.emissive.clone(),
        };

        let set = self.sampled_set(&self.extract_pipeline, [source])?;
        self.stage(
            builder,
            &targets.bright_framebuffers[0],
            &self.extract_pipeline,
            set,
            extract_fs::ExtractParams {
                config: [settings.threshold, 0.0, 0.0, 0.0],
            },
            extent,
        )
        .context("recording extract")?;

        let radius = settings.clamped_radius();
        let weights = gaussian_weights(radius, settings.sigma);
        let texel = [1.0 / extent[0] as f32, 1.0 / extent[1] as f32];
        let single = i32::from(settings.blur == BlurMode::Single);

        let (steps, last) = blur_schedule(settings.blur, settings.iterations);
        debug!(
            "bloom: {} blur passes, radius {radius}, result in target {last}",
            steps.len()
        );

        for step in steps {
            let [dx, dy] = step.direction.unwrap_or([0.0, 0.0]);
            let set =
                self.sampled_set(&self.blur_pipeline, [targets.bright[step.source].clone()])?;
            self.stage(
                builder,
                &targets.bright_framebuffers[step.target],
                &self.blur_pipeline,
                set,
                blur_fs::BlurParams {
                    texel: [texel[0], texel[1], dx, dy],
                    config: [radius as i32, single, 0, 0],
                    weights,
                },
                extent,
            )
            .context("recording blur")?;
        }

        Ok(targets.bright[last].clone())
    }

    fn sampled_set<const N: usize>(
        &self,
        pipeline: &Arc<GraphicsPipeline>,
        views: [Arc<ImageView>; N],
    ) -> anyhow::Result<Arc<PersistentDescriptorSet>> {
        let layout = pipeline
            .layout()
            .set_layouts()
            .first()
            .context("bloom pipeline has no descriptor set layout")?
            .clone();

        let writes = views.into_iter().enumerate().map(|(binding, view)| {
            WriteDescriptorSet::image_view_sampler(binding as u32, view, self.sampler.clone())
        });

        PersistentDescriptorSet::new(&self.descriptor_set_allocator, layout, writes, [])
            .context("creating bloom descriptor set")
    }

    fn stage<Pc: BufferContents>(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        framebuffer: &Arc<Framebuffer>,
        pipeline: &Arc<GraphicsPipeline>,
        descriptor_set: Arc<PersistentDescriptorSet>,
        push_constants: Pc,
        extent: [u32; 2],
    ) -> anyhow::Result<()> {
        builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values: vec![None],
                    ..RenderPassBeginInfo::framebuffer(framebuffer.clone())
                },
                SubpassBeginInfo {
                    contents: SubpassContents::Inline,
                    ..Default::default()
                },
            )?
            .set_viewport(0, [fullscreen::viewport(extent)].into_iter().collect())?
            .bind_pipeline_graphics(pipeline.clone())?
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                pipeline.layout().clone(),
                0,
                descriptor_set,
            )?
            .push_constants(pipeline.layout().clone(), 0, push_constants)?
            .bind_vertex_buffers(0, self.vertex_buffer.clone())?
            .draw(self.vertex_buffer.len() as u32, 1, 0, 0)?
            .end_render_pass(Default::default())?;
        Ok(())
    }
}

fn framebuffer(
    render_pass: &Arc<RenderPass>,
    view: &Arc<ImageView>,
) -> anyhow::Result<Arc<Framebuffer>> {
    Framebuffer::new(
        render_pass.clone(),
        FramebufferCreateInfo {
            attachments: vec![view.clone()],
            ..Default::default()
        },
    )
    .context("creating bloom framebuffer")
}

mod extract_fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "assets/shaders/bloom/extract.frag"
    }
}

mod blur_fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "assets/shaders/bloom/blur.frag"
    }
}

mod composite_fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "assets/shaders/bloom/composite.frag"
    }
}
