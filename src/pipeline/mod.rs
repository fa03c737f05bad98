/// Geometry stages of the pipeline: vertices, primitives, clipping and the
/// shader-stage contract the renderer drives.
pub mod clipping;
pub mod primitive;
pub mod shader;
pub mod shaders;
pub mod vertex;

pub use clipping::{
    clip_line_against_clip_volume, clip_triangle_against_clip_volume, is_triangle_completely_inside,
    is_triangle_completely_outside, outcode, ClipPlane, OutCode,
};
pub use primitive::{Line, LineAssembly, Primitive, Triangle, TriangleAssembly};
pub use shader::{
    CullMode, FragmentShaderFn, GeometryShaderFn, Material, ShaderProgram, Uniforms,
    VertexAssemblyFn, VertexShaderFn,
};
pub use vertex::{AttributeValue, Interpolation, Vertex};
