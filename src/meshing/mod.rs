/// Triangle meshes consumed by the vertex assembly stage
pub mod mesh;

pub use mesh::{Face, FaceCorner, FaceDir, Mesh};
