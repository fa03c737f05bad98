pub mod framebuffer;
/// Software rasterization: render targets, scan conversion, shading helpers
/// and textures
pub mod rasterizer;
pub mod shading;
pub mod texture;

pub use framebuffer::{DepthBuffer, Framebuffer};
pub use rasterizer::{project_to_screen, BitmapGraphics3D};
pub use shading::{pack_argb, rgb_to_u32, unpack_argb, BlendFunction, Lighting};
pub use texture::{Sampler, Texture};
