//! Lines, triangles and the strategies that group a flat vertex list into them.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::vertex::Vertex;
use crate::error::{RenderError, Result};

#[derive(Clone, Debug)]
pub struct Line {
    vertices: [Vertex; 2],
}

impl Line {
    pub fn new(start: Vertex, end: Vertex) -> Self {
        Self {
            vertices: [start, end],
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex; 2] {
        &self.vertices
    }

    #[inline]
    pub fn into_vertices(self) -> [Vertex; 2] {
        self.vertices
    }

    #[inline]
    pub fn start(&self) -> &Vertex {
        &self.vertices[0]
    }

    #[inline]
    pub fn end(&self) -> &Vertex {
        &self.vertices[1]
    }

    /// Give both endpoints the `Flat` attributes of `source`.
    pub fn copy_flat_attributes(&mut self, source: &Vertex) {
        for vertex in &mut self.vertices {
            vertex.copy_flat_attributes(source);
        }
    }

    /// The line with the start vertex's `Flat` attributes on both ends.
    /// Borrowed when the ends already agree.
    pub fn with_leading_flat_attributes(&self) -> Cow<'_, Line> {
        let [start, end] = &self.vertices;
        if end.shares_flat_attributes(start) {
            return Cow::Borrowed(self);
        }
        let mut line = self.clone();
        line.vertices[1].copy_flat_attributes(start);
        Cow::Owned(line)
    }
}

#[derive(Clone, Debug)]
pub struct Triangle {
    vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v1: Vertex, v2: Vertex, v3: Vertex) -> Self {
        Self {
            vertices: [v1, v2, v3],
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    #[inline]
    pub fn into_vertices(self) -> [Vertex; 3] {
        self.vertices
    }

    /// Twice the signed screen-space area, `(v2 - v1) x (v3 - v1)`.
    /// `None` until all three vertices have been projected.
    pub fn signed_screen_area(&self) -> Option<f32> {
        let [a, b, c] = &self.vertices;
        let a = a.screen_space_position()?;
        let b = b.screen_space_position()?;
        let c = c.screen_space_position()?;
        Some((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
    }

    /// Counter-clockwise winding in screen space.
    /// Unprojected triangles are never front-facing.
    #[inline]
    pub fn is_front_facing(&self) -> bool {
        self.signed_screen_area().map_or(false, |area| area > 0.0)
    }

    /// Give all three vertices the `Flat` attributes of `source`.
    pub fn copy_flat_attributes(&mut self, source: &Vertex) {
        for vertex in &mut self.vertices {
            vertex.copy_flat_attributes(source);
        }
    }

    /// The triangle with `v1`'s `Flat` attributes on every vertex.
    /// Borrowed when the vertices already agree.
    pub fn with_leading_flat_attributes(&self) -> Cow<'_, Triangle> {
        let [v1, v2, v3] = &self.vertices;
        if v2.shares_flat_attributes(v1) && v3.shares_flat_attributes(v1) {
            return Cow::Borrowed(self);
        }
        let mut triangle = self.clone();
        for vertex in &mut triangle.vertices[1..] {
            vertex.copy_flat_attributes(v1);
        }
        Cow::Owned(triangle)
    }
}

/// Output of a geometry shader.
#[derive(Clone, Debug)]
pub enum Primitive {
    Line(Line),
    Triangle(Triangle),
}

impl Primitive {
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Line(_) => 2,
            Self::Triangle(_) => 3,
        }
    }

    pub fn into_triangle(self) -> Option<Triangle> {
        match self {
            Self::Triangle(triangle) => Some(triangle),
            Self::Line(_) => None,
        }
    }
}

impl From<Triangle> for Primitive {
    fn from(triangle: Triangle) -> Self {
        Self::Triangle(triangle)
    }
}

impl From<Line> for Primitive {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

/// Fan triangulation around the first vertex. Callers guarantee at least
/// three vertices.
pub(crate) fn fan(vertices: &[Vertex]) -> Vec<Triangle> {
    (1..vertices.len().saturating_sub(1))
        .map(|i| {
            Triangle::new(
                vertices[0].clone(),
                vertices[i].clone(),
                vertices[i + 1].clone(),
            )
        })
        .collect()
}

/// How a flat vertex list is grouped into triangles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriangleAssembly {
    /// Consecutive triples.
    #[default]
    List,
    /// Vertex 0 with each consecutive pair.
    Fan,
    /// Each vertex with the two before it; every other triangle is flipped so
    /// the whole strip keeps one winding.
    Strip,
}

impl TriangleAssembly {
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "triangle list",
            Self::Fan => "triangle fan",
            Self::Strip => "triangle strip",
        }
    }

    pub fn assemble(self, vertices: Vec<Vertex>) -> Result<Vec<Triangle>> {
        let count = vertices.len();
        let malformed = || RenderError::MalformedVertexCount {
            assembly: self.name(),
            count,
        };

        match self {
            Self::List => {
                if count % 3 != 0 {
                    return Err(malformed());
                }
                let mut triangles = Vec::with_capacity(count / 3);
                let mut iter = vertices.into_iter();
                while let (Some(a), Some(b), Some(c)) = (iter.next(), iter.next(), iter.next()) {
                    triangles.push(Triangle::new(a, b, c));
                }
                Ok(triangles)
            }
            Self::Fan => match count {
                0 => Ok(Vec::new()),
                1 | 2 => Err(malformed()),
                _ => Ok(fan(&vertices)),
            },
            Self::Strip => match count {
                0 => Ok(Vec::new()),
                1 | 2 => Err(malformed()),
                _ => Ok((0..count - 2)
                    .map(|i| {
                        let (a, b) = if i % 2 == 0 { (i, i + 1) } else { (i + 1, i) };
                        Triangle::new(
                            vertices[a].clone(),
                            vertices[b].clone(),
                            vertices[i + 2].clone(),
                        )
                    })
                    .collect()),
            },
        }
    }
}

/// How a flat vertex list is grouped into lines.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineAssembly {
    /// Consecutive pairs.
    #[default]
    List,
    /// Each vertex joined to the next.
    Strip,
    /// A strip closed back to the first vertex.
    Loop,
}

impl LineAssembly {
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "line list",
            Self::Strip => "line strip",
            Self::Loop => "line loop",
        }
    }

    pub fn assemble(self, vertices: Vec<Vertex>) -> Result<Vec<Line>> {
        let count = vertices.len();
        let malformed = || RenderError::MalformedVertexCount {
            assembly: self.name(),
            count,
        };

        match self {
            Self::List => {
                if count % 2 != 0 {
                    return Err(malformed());
                }
                let mut lines = Vec::with_capacity(count / 2);
                let mut iter = vertices.into_iter();
                while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
                    lines.push(Line::new(a, b));
                }
                Ok(lines)
            }
            Self::Strip | Self::Loop => {
                if count == 0 {
                    return Ok(Vec::new());
                }
                if count == 1 {
                    return Err(malformed());
                }
                let mut lines: Vec<Line> = vertices
                    .windows(2)
                    .map(|pair| Line::new(pair[0].clone(), pair[1].clone()))
                    .collect();
                if self == Self::Loop && count > 2 {
                    lines.push(Line::new(vertices[count - 1].clone(), vertices[0].clone()));
                }
                Ok(lines)
            }
        }
    }
}
