/// Color packing, blending and lighting helpers.
/// Kept separate from the rasterizer so lighting models
/// can evolve independently of the rasterization pipeline.
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Convert RGB to ARGB u32
#[inline]
pub const fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Pack an RGBA color with channels in [0, 1] into ARGB32.
#[inline]
pub fn pack_argb(color: Vec4) -> u32 {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0 + Vec4::splat(0.5)).as_uvec4();
    (c.w << 24) | (c.x << 16) | (c.y << 8) | c.z
}

/// Unpack ARGB32 into RGBA with channels in [0, 1].
#[inline]
pub fn unpack_argb(argb: u32) -> Vec4 {
    Vec4::new(
        ((argb >> 16) & 0xFF) as f32,
        ((argb >> 8) & 0xFF) as f32,
        (argb & 0xFF) as f32,
        (argb >> 24) as f32,
    ) / 255.0
}

/// How a shaded fragment combines with the color already in the buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendFunction {
    /// Overwrite the destination.
    #[default]
    Replace,
    /// Source-over compositing by source alpha.
    Alpha,
    /// Add source to destination, saturating.
    Additive,
    /// Component-wise product.
    Multiply,
}

impl BlendFunction {
    #[inline]
    pub fn blend(self, src: Vec4, dst: Vec4) -> Vec4 {
        match self {
            Self::Replace => src,
            Self::Alpha => {
                let a = src.w;
                let rgb = src.truncate() * a + dst.truncate() * (1.0 - a);
                rgb.extend(a + dst.w * (1.0 - a))
            }
            Self::Additive => (src + dst).min(Vec4::ONE),
            Self::Multiply => src * dst,
        }
    }

    /// Whether the result depends on the destination color.
    #[inline]
    pub fn reads_destination(self) -> bool {
        self != Self::Replace
    }
}

/// Directional + ambient lighting shared by the lit fragment shaders.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Lighting {
    /// Direction the light is coming from (world space, normalized).
    pub light_dir: Vec3,
    pub light_color: Vec3,
    /// Constant ambient term added to all fragments.
    pub ambient: f32,
    /// Strength of the directional (Lambert) term.
    pub diffuse: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            // Slightly from +X/+Z and above
            light_dir: Vec3::new(0.4, 1.0, 0.3).normalize(),
            light_color: Vec3::ONE,
            ambient: 0.2,
            diffuse: 0.8,
        }
    }
}

impl Lighting {
    /// Ambient plus Lambert term for a unit normal, in [0, 1].
    #[inline]
    pub fn diffuse_intensity(&self, normal: Vec3) -> f32 {
        let lambert = normal.dot(self.light_dir).max(0.0);
        (self.ambient + self.diffuse * lambert).clamp(0.0, 1.0)
    }

    /// Blinn-Phong specular term for a unit normal and unit view direction.
    #[inline]
    pub fn specular_intensity(&self, normal: Vec3, view_dir: Vec3, shininess: f32) -> f32 {
        if normal.dot(self.light_dir) <= 0.0 {
            return 0.0;
        }
        let half = (self.light_dir + view_dir).normalize_or_zero();
        normal.dot(half).max(0.0).powf(shininess)
    }

    /// Light an RGBA base color. Alpha passes through.
    pub fn shade(
        &self,
        base: Vec4,
        normal: Vec3,
        view_dir: Vec3,
        shininess: f32,
        specular: f32,
    ) -> Vec4 {
        let normal = normal.normalize_or_zero();
        let diffuse = self.diffuse_intensity(normal);
        let highlight = if specular > 0.0 {
            specular * self.specular_intensity(normal, view_dir.normalize_or_zero(), shininess)
        } else {
            0.0
        };
        let rgb = base.truncate() * self.light_color * diffuse + self.light_color * highlight;
        rgb.min(Vec3::ONE).extend(base.w)
    }
}
