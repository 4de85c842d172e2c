use std::sync::Arc;

use anyhow::Context;
use vulkano::{
    format::Format,
    image::{view::ImageView, Image, ImageCreateInfo, ImageType, ImageUsage},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator},
};

pub const SHADED_FORMAT: Format = Format::R16G16B16A16_SFLOAT;
pub const POSITION_FORMAT: Format = Format::R32G32B32A32_SFLOAT;
pub const NORMAL_FORMAT: Format = Format::R16G16B16A16_SFLOAT;
pub const ALBEDO_FORMAT: Format = Format::R8G8B8A8_UNORM;
pub const EMISSIVE_FORMAT: Format = Format::R16G16B16A16_SFLOAT;
pub const DEPTH_FORMAT: Format = Format::D16_UNORM;

/// Per-pixel surface attributes written by the geometry subpass, plus the lit result.
pub struct GBuffer {
    pub shaded: Arc<ImageView>,
    /// World position; `w` is instance index + 1, 0 where nothing was drawn.
    pub position: Arc<ImageView>,
    pub normal: Arc<ImageView>,
    pub albedo: Arc<ImageView>,
    pub emissive: Arc<ImageView>,
    pub depth: Arc<ImageView>,
}

impl GBuffer {
    pub fn new(
        memory_allocator: Arc<dyn MemoryAllocator>,
        extent: [u32; 2],
    ) -> anyhow::Result<Self> {
        let input = ImageUsage::COLOR_ATTACHMENT
            | ImageUsage::INPUT_ATTACHMENT
            | ImageUsage::TRANSIENT_ATTACHMENT;

        Ok(GBuffer {
            shaded: attachment(
                &memory_allocator,
                extent,
                SHADED_FORMAT,
                ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
            )
            .context("creating shaded buffer")?,
            position: attachment(&memory_allocator, extent, POSITION_FORMAT, input)
                .context("creating position buffer")?,
            normal: attachment(&memory_allocator, extent, NORMAL_FORMAT, input)
                .context("creating normal buffer")?,
            albedo: attachment(&memory_allocator, extent, ALBEDO_FORMAT, input)
                .context("creating albedo buffer")?,
            emissive: attachment(
                &memory_allocator,
                extent,
                EMISSIVE_FORMAT,
                ImageUsage::COLOR_ATTACHMENT | ImageUsage::INPUT_ATTACHMENT | ImageUsage::SAMPLED,
            )
            .context("creating emissive buffer")?,
            depth: attachment(
                &memory_allocator,
                extent,
                DEPTH_FORMAT,
                ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            )
            .context("creating depth buffer")?,
        })
    }

    pub fn extent(&self) -> [u32; 2] {
        let [width, height, _] = self.shaded.image().extent();
        [width, height]
    }
}

pub(super) fn attachment(
    memory_allocator: &Arc<dyn MemoryAllocator>,
    extent: [u32; 2],
    format: Format,
    usage: ImageUsage,
) -> anyhow::Result<Arc<ImageView>> {
    let image = Image::new(
        memory_allocator.clone(),
        ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format,
            extent: [extent[0], extent[1], 1],
            usage,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )
    .context("creating image")?;

    ImageView::new_default(image).context("creating image view")
}
