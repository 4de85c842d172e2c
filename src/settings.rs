use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Largest blur radius the blur shader's weight table can hold.
pub const MAX_BLUR_RADIUS: u32 = 15;

/// Host-controlled knobs, read on startup and on every settings change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Primary subdivision count (cube grid, sphere stacks, cylinder/cone stacks).
    pub shape_parameter1: u32,
    /// Secondary subdivision count (sphere slices, cylinder/cone wedges).
    pub shape_parameter2: u32,
    pub near: f32,
    pub far: f32,
    /// Substitute the diffuse color for a material whose ambient color is (near) black.
    /// Off unless asked for: it brightens unlit faces beyond what the scene specifies.
    pub ambient_fallback: bool,
    /// Ambient color of pixels no primitive covers, scaled by the scene's `ka`.
    pub background_ambient: [f32; 3],
    pub bloom: BloomSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shape_parameter1: 10,
            shape_parameter2: 10,
            near: 0.1,
            far: 100.0,
            ambient_fallback: false,
            background_ambient: [0.0, 0.0, 0.0],
            bloom: BloomSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// Whether moving from `self` to `other` invalidates the mesh library.
    pub fn tessellation_changed(&self, other: &Settings) -> bool {
        self.shape_parameter1 != other.shape_parameter1
            || self.shape_parameter2 != other.shape_parameter2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomSource {
    Shaded,
    Emissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlurMode {
    /// One 2D pass over the full square neighborhood.
    Single,
    /// Horizontal then vertical 1D passes.
    Separable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    pub source: BloomSource,
    /// Luminance below which extracted color is zeroed.
    pub threshold: f32,
    pub blur: BlurMode,
    /// Taps on each side of the center; clamped to [`MAX_BLUR_RADIUS`].
    pub radius: u32,
    pub sigma: f32,
    pub iterations: u32,
    pub intensity: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        BloomSettings {
            enabled: true,
            source: BloomSource::Emissive,
            threshold: 0.9,
            blur: BlurMode::Separable,
            radius: 6,
            sigma: 3.0,
            iterations: 2,
            intensity: 1.0,
        }
    }
}

impl BloomSettings {
    pub fn clamped_radius(&self) -> u32 {
        self.radius.min(MAX_BLUR_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.ambient_fallback);
    }

    #[test]
    fn partial_bloom_section_keeps_other_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"bloom": {"blur": "single", "radius": 40}}"#).unwrap();
        assert_eq!(settings.bloom.blur, BlurMode::Single);
        assert_eq!(settings.bloom.clamped_radius(), MAX_BLUR_RADIUS);
        assert_eq!(settings.bloom.threshold, BloomSettings::default().threshold);
        assert_eq!(settings.shape_parameter1, 10);
    }

    #[test]
    fn tessellation_change_ignores_other_fields() {
        let a = Settings::default();
        let mut b = a.clone();
        b.far = 20.0;
        b.bloom.enabled = false;
        assert!(!a.tessellation_changed(&b));
        b.shape_parameter2 = 3;
        assert!(a.tessellation_changed(&b));
    }

    #[test]
    fn from_file_reports_the_path() {
        let err = Settings::from_file("/no/such/settings.json").unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/settings.json"));
    }
}
