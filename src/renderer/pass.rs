use std::sync::Arc;

use anyhow::Context;
use vulkano::{buffer::Subbuffer, command_buffer::SecondaryAutoCommandBuffer, sync::GpuFuture};

use super::{frame::Frame, geometry_shaders::InstanceData, lighting::LightingData};
use crate::settings::BloomSettings;

pub enum Pass<'f, 's: 'f> {
    Deferred(DrawPass<'f, 's>),
    Lighting(LightingPass<'f, 's>),
    PostProcess(PostProcessPass<'f, 's>),
    Finished(Box<dyn GpuFuture>),
}

pub struct DrawPass<'f, 's: 'f> {
    pub frame: &'f mut Frame<'s>,
}

impl<'f, 's: 'f> DrawPass<'f, 's> {
    pub fn execute(
        &mut self,
        command_buffer: Arc<SecondaryAutoCommandBuffer>,
    ) -> anyhow::Result<()> {
        self.frame
            .builder()?
            .execute_commands(command_buffer)
            .context("executing geometry commands")?;
        Ok(())
    }

    pub fn viewport_dimensions(&self) -> [u32; 2] {
        self.frame.framebuffer.extent()
    }
}

pub struct LightingPass<'f, 's: 'f> {
    pub frame: &'f mut Frame<'s>,
}

impl<'f, 's: 'f> LightingPass<'f, 's> {
    pub fn shade(
        &mut self,
        lighting: LightingData,
        instances: Subbuffer<[InstanceData]>,
    ) -> anyhow::Result<()> {
        let extent = self.frame.framebuffer.extent();
        let (system, builder) = self.frame.parts()?;
        let command_buffer = system
            .lighting_system
            .draw(extent, &system.gbuffer, lighting, instances)
            .context("recording lighting")?;

        builder
            .execute_commands(command_buffer)
            .context("executing lighting commands")?;
        Ok(())
    }
}

pub struct PostProcessPass<'f, 's: 'f> {
    pub frame: &'f mut Frame<'s>,
}

impl<'f, 's: 'f> PostProcessPass<'f, 's> {
    pub fn run(&mut self, settings: &BloomSettings) -> anyhow::Result<()> {
        let (system, builder) = self.frame.parts()?;
        system
            .bloom_system
            .record(builder, &system.gbuffer, &system.bloom_targets, settings)
            .context("recording bloom")
    }
}
