//! Renderer configuration (`renderer.toml`)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::rendering::Sampler;

/// Settings the renderer reads once at construction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: usize,
    pub height: usize,
    /// ARGB color the framebuffer is cleared to each frame.
    pub clear_color: u32,
    /// Depth written to every cell before each frame. Fragments pass when
    /// their depth is smaller.
    pub depth_clear_value: f32,
    /// Rasterize opaque objects concurrently.
    pub parallel_objects: bool,
    /// Rasterize the triangles of one object concurrently.
    pub parallel_triangles: bool,
    /// Rasterize the scanlines of one triangle concurrently.
    pub parallel_scanlines: bool,
    /// Sampler for materials that do not pick one.
    pub default_sampler: Sampler,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            clear_color: 0xFF1A1A2E,
            depth_clear_value: f32::INFINITY,
            parallel_objects: true,
            parallel_triangles: true,
            parallel_scanlines: true,
            default_sampler: Sampler::Nearest,
        }
    }
}

impl RendererConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RendererConfig =
            toml::from_str(content).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RenderError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Config(format!(
                "framebuffer size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.depth_clear_value.is_nan() {
            return Err(RenderError::Config("depth_clear_value must not be NaN".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
