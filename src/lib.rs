/// Raster Pipeline - CPU 3D rendering pipeline
/// Homogeneous clipping, scanline rasterization with perspective-correct
/// attributes and a per-pixel locked depth test
pub mod camera;
pub mod config;
pub mod error;
pub mod meshing;
pub mod perf;
pub mod pipeline;
pub mod renderer;
pub mod rendering;

pub use camera::{viewport_matrix, Camera, Frustum};
pub use config::RendererConfig;
pub use error::{RenderError, Result, VertexError};
pub use meshing::{FaceCorner, Mesh};
pub use perf::{CounterSnapshot, PipelineCounters, PIPELINE_COUNTERS};
pub use pipeline::{
    AttributeValue, CullMode, Interpolation, Line, Material, Primitive, ShaderProgram, Triangle,
    TriangleAssembly, Uniforms, Vertex,
};
pub use renderer::{Crosshair, FrameStats, Overlay, Renderable, Renderer};
pub use rendering::{
    project_to_screen, BitmapGraphics3D, BlendFunction, DepthBuffer, Framebuffer, Lighting,
    Sampler, Texture,
};
