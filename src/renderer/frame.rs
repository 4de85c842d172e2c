use std::sync::Arc;

use anyhow::Context;
use vulkano::{
    buffer::Subbuffer,
    command_buffer::{
        AutoCommandBufferBuilder, CopyImageToBufferInfo, PrimaryAutoCommandBuffer,
        SubpassBeginInfo, SubpassContents,
    },
    render_pass::Framebuffer,
    sync::GpuFuture,
};

use super::{
    frame_system::FrameSystem,
    pass::{DrawPass, LightingPass, Pass, PostProcessPass},
};

/// One frame in flight. `next_pass` walks geometry, lighting and post-processing in order and
/// finally submits the primary command buffer.
pub struct Frame<'a> {
    pub system: &'a mut FrameSystem,
    stage: u8,
    pub framebuffer: Arc<Framebuffer>,
    before_future: Option<Box<dyn GpuFuture>>,
    builder: Option<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>>,
    readback: Option<Subbuffer<[u8]>>,
}

impl<'a> Frame<'a> {
    pub fn new(
        system: &'a mut FrameSystem,
        framebuffer: Arc<Framebuffer>,
        before_future: Box<dyn GpuFuture>,
        builder: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        readback: Option<Subbuffer<[u8]>>,
    ) -> Self {
        Frame {
            system,
            stage: 0,
            framebuffer,
            before_future: Some(before_future),
            builder: Some(builder),
            readback,
        }
    }

    /// The primary builder, available until the frame is submitted.
    pub fn builder(
        &mut self,
    ) -> anyhow::Result<&mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>> {
        self.builder
            .as_mut()
            .context("frame was already submitted")
    }

    /// The frame system alongside the primary builder, for passes that record with both.
    pub fn parts(
        &mut self,
    ) -> anyhow::Result<(
        &FrameSystem,
        &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    )> {
        let builder = self
            .builder
            .as_mut()
            .context("frame was already submitted")?;
        Ok((&*self.system, builder))
    }

    pub fn next_pass<'f>(&'f mut self) -> anyhow::Result<Option<Pass<'f, 'a>>> {
        let stage = self.stage;
        self.stage = self.stage.saturating_add(1);

        let pass = match stage {
            0 => Pass::Deferred(DrawPass { frame: self }),
            1 => {
                self.builder()?
                    .next_subpass(
                        Default::default(),
                        SubpassBeginInfo {
                            contents: SubpassContents::SecondaryCommandBuffers,
                            ..Default::default()
                        },
                    )
                    .context("entering lighting subpass")?;
                Pass::Lighting(LightingPass { frame: self })
            }
            2 => {
                self.builder()?
                    .end_render_pass(Default::default())
                    .context("ending deferred render pass")?;
                Pass::PostProcess(PostProcessPass { frame: self })
            }
            3 => Pass::Finished(self.submit()?),
            _ => return Ok(None),
        };

        Ok(Some(pass))
    }

    fn submit(&mut self) -> anyhow::Result<Box<dyn GpuFuture>> {
        let mut builder = self.builder.take().context("frame was already submitted")?;

        if let Some(readback) = self.readback.take() {
            builder
                .copy_image_to_buffer(CopyImageToBufferInfo::image_buffer(
                    self.system.bloom_targets.output.image().clone(),
                    readback,
                ))
                .context("copying output image to readback buffer")?;
        }

        let command_buffer = builder.build().context("building primary command buffer")?;
        let future = self
            .before_future
            .take()
            .context("frame was already submitted")?
            .then_execute(self.system.gfx_queue.clone(), command_buffer)
            .context("executing primary command buffer")?;

        Ok(future.boxed())
    }
}
