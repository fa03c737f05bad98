//! Error types for the rendering pipeline.
//!
//! Only contract violations surface here. Degenerate geometry is skipped by
//! the rasterizer and never reported as an error.

use thiserror::Error;

/// Violations of the write-once rules on [`crate::pipeline::Vertex`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexError {
    /// The screen-space position is write-once.
    #[error("screen-space position has already been set on this vertex")]
    ScreenSpaceAlreadySet,

    /// A screen-space position needs the clip-space `w` of the vertex.
    #[error("screen-space position set before the clip-space position")]
    ClipSpaceNotSet,
}

/// Errors returned by the pipeline driver and its configuration layer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A vertex shader wrote the screen-space position, which only the
    /// viewport stage may set.
    #[error("vertex shader set the screen-space position of vertex {index}")]
    VertexShaderSetScreenSpace { index: usize },

    /// A vertex shader returned without writing a clip-space position.
    #[error("vertex shader left vertex {index} without a clip-space position")]
    MissingClipSpacePosition { index: usize },

    /// The vertex list cannot be grouped by the selected assembly.
    #[error("{assembly} assembly cannot group {count} vertices")]
    MalformedVertexCount { assembly: &'static str, count: usize },

    /// Texel storage does not match the declared texture size.
    #[error("texture of {width}x{height} does not match {texels} texels")]
    InvalidTexture {
        width: usize,
        height: usize,
        texels: usize,
    },

    /// Mesh data with inconsistent indices or attribute counts.
    #[error("invalid mesh{}: {reason}", .face.map(|f| format!(" (face {f})")).unwrap_or_default())]
    InvalidMesh {
        face: Option<usize>,
        reason: &'static str,
    },

    #[error(transparent)]
    Vertex(#[from] VertexError),

    #[error("invalid renderer configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RenderError>;
