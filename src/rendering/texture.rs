/// ARGB32 textures and the samplers that read them.
/// Texel rows are stored top-down; texture coordinate v = 0 is the bottom row.
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use super::shading::unpack_argb;
use crate::error::{RenderError, Result};

/// Texture filtering mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampler {
    #[default]
    Nearest,
    /// Bilinear filtering between the four nearest texel centers.
    Linear,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<u32>, // ARGB format
}

impl Texture {
    pub fn new(width: usize, height: usize, texels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 || texels.len() != width * height {
            return Err(RenderError::InvalidTexture {
                width,
                height,
                texels: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Single-color 1x1 texture.
    pub fn solid(argb: u32) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![argb],
        }
    }

    /// Checkerboard of `cells x cells` squares, each `cell_size` texels wide.
    pub fn checkerboard(cells: usize, cell_size: usize, c1: u32, c2: u32) -> Self {
        let size = (cells * cell_size).max(1);
        let cell_size = cell_size.max(1);
        let texels = (0..size * size)
            .map(|i| {
                let x = (i % size) / cell_size;
                let y = (i / size) / cell_size;
                if (x + y) % 2 == 0 {
                    c1
                } else {
                    c2
                }
            })
            .collect();
        Self {
            width: size,
            height: size,
            texels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Texel at integer coordinates, wrapping in both directions.
    #[inline]
    pub fn texel(&self, x: i64, y: i64) -> u32 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.texels[y * self.width + x]
    }

    /// Sample at texture coordinates with repeat addressing.
    pub fn sample(&self, uv: Vec2, sampler: Sampler) -> Vec4 {
        // Texel space with row 0 at the top
        let tx = uv.x * self.width as f32;
        let ty = (1.0 - uv.y) * self.height as f32;

        match sampler {
            Sampler::Nearest => unpack_argb(self.texel(tx.floor() as i64, ty.floor() as i64)),
            Sampler::Linear => {
                let fx = tx - 0.5;
                let fy = ty - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let sx = fx - x0;
                let sy = fy - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);

                let c00 = unpack_argb(self.texel(x0, y0));
                let c10 = unpack_argb(self.texel(x0 + 1, y0));
                let c01 = unpack_argb(self.texel(x0, y0 + 1));
                let c11 = unpack_argb(self.texel(x0 + 1, y0 + 1));

                let top = c00.lerp(c10, sx);
                let bottom = c01.lerp(c11, sx);
                top.lerp(bottom, sy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: u32 = 0xFF000000;
    const WHITE: u32 = 0xFFFFFFFF;

    #[test]
    fn rejects_mismatched_texel_count() {
        assert!(Texture::new(2, 2, vec![0; 3]).is_err());
        assert!(Texture::new(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn nearest_picks_texel_and_wraps() {
        let tex = Texture::checkerboard(2, 1, WHITE, BLACK);
        // v = 0.75 lands in the top row
        assert_eq!(tex.sample(Vec2::new(0.25, 0.75), Sampler::Nearest), Vec4::ONE);
        assert_eq!(
            tex.sample(Vec2::new(0.75, 0.75), Sampler::Nearest),
            Vec4::new(0.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(
            tex.sample(Vec2::new(1.25, 1.75), Sampler::Nearest),
            tex.sample(Vec2::new(0.25, 0.75), Sampler::Nearest)
        );
    }

    #[test]
    fn linear_blends_between_texel_centers() {
        let tex = Texture::new(2, 1, vec![BLACK, WHITE]).unwrap();
        // Halfway between the two texel centers
        let mid = tex.sample(Vec2::new(0.5, 0.5), Sampler::Linear);
        assert!((mid.x - 0.5).abs() < 1e-6);
        assert!((mid.w - 1.0).abs() < 1e-6);
    }
}
