use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context};
use cgmath::Point3;
use log::{debug, error, info};
use lumen_scene::{
    Camera, GlobalCoefficients, JsonSceneLoader, PrimitiveKind, SceneLoader, SceneState,
};
use tracing::{span, Level};
#[cfg(feature = "tracing")]
use tracing_tracy::client::frame_mark;
use vulkano::{
    buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter},
    sync::{self, GpuFuture},
};

use super::{
    frame_system::FrameSystem,
    geometry::GeometrySystem,
    geometry_shaders::{FrameData, InstanceData},
    lighting::LightingData,
    mesh::MeshLibrary,
    pass::Pass,
};
use crate::{context::GpuContext, error::RenderError, output::PixelBuffer, settings::Settings};

/// Host entry point: owns the device, the active scene and every GPU resource.
pub struct Renderer {
    context: GpuContext,
    settings: Settings,
    scene_loader: Box<dyn SceneLoader>,
    scene: SceneState,
    frame_system: FrameSystem,
    geometry_system: GeometrySystem,
    meshes: MeshLibrary,
    extent: [u32; 2],
}

/// Everything one frame needs from the scene, resolved on the CPU.
struct FrameInputs {
    frame_data: FrameData,
    lighting: LightingData,
    instances: Vec<InstanceData>,
    kinds: Vec<PrimitiveKind>,
}

impl Renderer {
    pub fn new(settings: Settings) -> Result<Self, RenderError> {
        let context = GpuContext::new().map_err(RenderError::Device)?;
        let memory_allocator: Arc<dyn MemoryAllocator> = context.memory_allocator().clone();

        let frame_system = FrameSystem::new(
            context.queue().clone(),
            memory_allocator.clone(),
            context.command_buffer_allocator().clone(),
            context.descriptor_set_allocator().clone(),
        )?;

        let geometry_system = frame_system
            .deferred_subpass()
            .and_then(|subpass| {
                GeometrySystem::new(
                    context.queue().clone(),
                    subpass,
                    memory_allocator.clone(),
                    context.command_buffer_allocator().clone(),
                    context.descriptor_set_allocator().clone(),
                )
            })
            .context("creating geometry system")
            .map_err(RenderError::ShaderBuild)?;

        let meshes = MeshLibrary::build(
            memory_allocator,
            settings.shape_parameter1,
            settings.shape_parameter2,
        )
        .context("building mesh library")
        .map_err(RenderError::ResourceAllocation)?;

        info!("renderer ready");

        Ok(Renderer {
            context,
            settings,
            scene_loader: Box::new(JsonSceneLoader),
            scene: SceneState::default(),
            frame_system,
            geometry_system,
            meshes,
            extent: [0, 0],
        })
    }

    pub fn with_scene_loader(mut self, scene_loader: Box<dyn SceneLoader>) -> Self {
        self.scene_loader = scene_loader;
        self
    }

    /// Replaces the active scene. On failure the previous scene stays active.
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let path = path.as_ref();
        match self.scene.load(self.scene_loader.as_ref(), path) {
            Ok(_) => Ok(()),
            Err(err) => {
                error!("failed to load scene {}: {err}", path.display());
                Err(err.into())
            }
        }
    }

    pub fn has_scene(&self) -> bool {
        self.scene.active().is_some()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies new settings. Meshes are rebuilt only when the tessellation changed; if that
    /// fails the old settings and meshes are kept.
    pub fn on_settings_changed(&mut self, settings: Settings) -> Result<(), RenderError> {
        if self.settings.tessellation_changed(&settings) {
            let memory_allocator: Arc<dyn MemoryAllocator> =
                self.context.memory_allocator().clone();
            let meshes = MeshLibrary::build(
                memory_allocator,
                settings.shape_parameter1,
                settings.shape_parameter2,
            )
            .context("rebuilding mesh library")
            .map_err(|err| {
                error!("{err:#}");
                RenderError::ResourceAllocation(err)
            })?;
            info!(
                "retessellated meshes at {:?} (was {:?})",
                meshes.params(),
                self.meshes.params()
            );
            self.meshes = meshes;
        }
        self.settings = settings;
        Ok(())
    }

    /// Records the new output size. Attachments are reallocated on the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        debug!("resize to {width}x{height}");
        self.extent = [width, height];
    }

    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    /// Renders one frame at the current extent. Does nothing without a scene or with a zero
    /// extent. A failed frame is logged and skipped.
    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        if !self.has_scene() {
            debug!("no scene loaded, skipping frame");
            return Ok(());
        }
        if self.extent[0] == 0 || self.extent[1] == 0 {
            debug!("zero extent, skipping frame");
            return Ok(());
        }

        if let Err(err) = self.draw(self.extent, None) {
            error!("frame skipped: {err:#}");
        }

        #[cfg(feature = "tracing")]
        frame_mark();

        Ok(())
    }

    /// Renders one frame at `width` x `height` and reads it back as RGBA8. Without a scene the
    /// result is the cleared background.
    pub fn capture_frame(&mut self, width: u32, height: u32) -> Result<PixelBuffer, RenderError> {
        self.capture(width, height).map_err(|err| {
            error!("capture failed: {err:#}");
            RenderError::ResourceAllocation(err)
        })
    }

    fn capture(&mut self, width: u32, height: u32) -> anyhow::Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot capture a {width}x{height} frame"));
        }

        let readback: Subbuffer<[u8]> = Buffer::new_slice(
            self.context.memory_allocator().clone(),
            BufferCreateInfo {
                usage: BufferUsage::TRANSFER_DST,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_HOST
                    | MemoryTypeFilter::HOST_RANDOM_ACCESS,
                ..Default::default()
            },
            width as u64 * height as u64 * 4,
        )
        .context("creating readback buffer")?;

        self.draw([width, height], Some(readback.clone()))?;

        let data = readback.read().context("reading back frame")?.to_vec();
        PixelBuffer::new(width, height, data)
    }

    fn frame_inputs(&self, extent: [u32; 2]) -> FrameInputs {
        let aspect = if extent[1] == 0 {
            1.0
        } else {
            extent[0] as f32 / extent[1] as f32
        };

        match self.scene.active() {
            Some(active) => {
                let camera = active.camera(aspect, self.settings.near, self.settings.far);
                FrameInputs {
                    frame_data: FrameData::new(camera.view_matrix(), camera.projection_matrix()),
                    lighting: LightingData::new(
                        camera.position(),
                        &active.globals,
                        self.settings.background_ambient,
                        &active.flat.lights,
                    ),
                    instances: active
                        .flat
                        .instances
                        .iter()
                        .map(|i| InstanceData::pack(i, self.settings.ambient_fallback))
                        .collect(),
                    kinds: active
                        .flat
                        .instances
                        .iter()
                        .map(|i| i.primitive.kind)
                        .collect(),
                }
            }
            None => {
                let camera = Camera::default();
                FrameInputs {
                    frame_data: FrameData::new(camera.view_matrix(), camera.projection_matrix()),
                    lighting: LightingData::new(
                        Point3::new(0.0, 0.0, 0.0),
                        &GlobalCoefficients::default(),
                        self.settings.background_ambient,
                        &[],
                    ),
                    instances: Vec::new(),
                    kinds: Vec::new(),
                }
            }
        }
    }

    fn draw(&mut self, extent: [u32; 2], readback: Option<Subbuffer<[u8]>>) -> anyhow::Result<()> {
        let _span = span!(Level::INFO, "frame").entered();

        let inputs = self.frame_inputs(extent);
        let instance_buffer = self.geometry_system.upload_instances(&inputs.instances)?;

        let before_future = sync::now(self.context.device().clone()).boxed();
        let mut frame = self.frame_system.frame(before_future, extent, readback)?;

        let mut after_future = None;
        while let Some(pass) = frame.next_pass()? {
            match pass {
                Pass::Deferred(mut draw_pass) => {
                    let cb = self
                        .geometry_system
                        .draw(
                            draw_pass.viewport_dimensions(),
                            inputs.frame_data,
                            instance_buffer.clone(),
                            &inputs.kinds,
                            &self.meshes,
                        )
                        .context("drawing geometry")?;
                    draw_pass.execute(cb)?;
                }
                Pass::Lighting(mut lighting_pass) => {
                    lighting_pass.shade(inputs.lighting, instance_buffer.clone())?;
                }
                Pass::PostProcess(mut post_process) => {
                    post_process.run(&self.settings.bloom)?;
                }
                Pass::Finished(af) => {
                    after_future = Some(af);
                }
            }
        }

        let _await_fence = span!(Level::INFO, "await_fence").entered();
        after_future
            .context("frame finished without a future")?
            .then_signal_fence_and_flush()
            .context("flushing frame")?
            .wait(None)
            .context("waiting for frame")?;

        Ok(())
    }
}
