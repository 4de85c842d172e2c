use std::fmt;

use lumen_scene::SceneLoadError;

/// Failures surfaced to the host. Internals carry `anyhow` chains; the variant says which
/// recovery policy applies.
#[derive(Debug)]
pub enum RenderError {
    /// No usable Vulkan device or queue.
    Device(anyhow::Error),
    SceneLoad(SceneLoadError),
    ResourceAllocation(anyhow::Error),
    /// Shader module or pipeline creation failed. Fatal at startup.
    ShaderBuild(anyhow::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Device(err) => write!(f, "device setup failed: {err:#}"),
            RenderError::SceneLoad(err) => write!(f, "scene load failed: {err}"),
            RenderError::ResourceAllocation(err) => {
                write!(f, "GPU resource allocation failed: {err:#}")
            }
            RenderError::ShaderBuild(err) => write!(f, "shader build failed: {err:#}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::SceneLoad(err) => Some(err),
            RenderError::Device(err)
            | RenderError::ResourceAllocation(err)
            | RenderError::ShaderBuild(err) => Some(&**err),
        }
    }
}

impl From<SceneLoadError> for RenderError {
    fn from(err: SceneLoadError) -> Self {
        RenderError::SceneLoad(err)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;

    #[test]
    fn display_keeps_the_whole_chain() {
        let err: anyhow::Result<()> = Err(anyhow!("syntax error at line 3"));
        let err = RenderError::ShaderBuild(err.context("compiling lighting.frag").unwrap_err());
        let text = err.to_string();
        assert!(text.contains("compiling lighting.frag"));
        assert!(text.contains("syntax error at line 3"));
    }

    #[test]
    fn scene_errors_convert() {
        let err: RenderError = SceneLoadError::EmptyPath.into();
        assert!(matches!(err, RenderError::SceneLoad(SceneLoadError::EmptyPath)));
    }
}
