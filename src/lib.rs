//! Deferred renderer for hierarchical scenes: a G-buffer geometry pass, a full-screen lighting
//! pass over up to eight lights, and a bloom post-process, all headless on vulkano.

pub use context::GpuContext;
pub use error::RenderError;
pub use output::{ImageWriter, PixelBuffer, PngImageWriter};
pub use renderer::Renderer;
pub use settings::{BloomSettings, BloomSource, BlurMode, Settings, MAX_BLUR_RADIUS};

pub use lumen_scene as scene;

mod context;
mod error;
mod output;
mod renderer;
mod settings;

/// Installs the Tracy layer as the global `tracing` subscriber.
#[cfg(feature = "tracing")]
pub fn init_profiling() -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;

    let subscriber = tracing_subscriber::registry().with(tracing_tracy::TracyLayer::new());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("setting tracing subscriber: {e}"))
}
