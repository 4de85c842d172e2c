pub use renderer::Renderer;

mod bloom;
mod frame;
mod frame_system;
mod fullscreen;
mod gbuffer;
mod geometry;
mod geometry_shaders;
mod lighting;
mod mesh;
mod pass;
mod renderer;
