//! Homogeneous-space clipping against the canonical clip volume.
//!
//! Clipping happens before the perspective divide, against the six planes
//!
//! ```text
//! -w <= x <= w
//! -w <= y <= w
//! -w <= z <= w
//! ```
//!
//! so vertices with `w <= 0` never reach a division. Polygons are clipped
//! Sutherland-Hodgman style one plane at a time, then fanned back into
//! triangles. The clip volume is convex, so the output polygon always is.

use std::ops::{BitAnd, BitOr, BitOrAssign};

use glam::Vec4;
use tracing::trace;

use super::primitive::{fan, Line, Triangle};
use super::vertex::Vertex;
use crate::count_call;

/// Bitmask of the clip half-spaces a point violates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OutCode(u8);

impl OutCode {
    pub const INSIDE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const BOTTOM: Self = Self(1 << 2);
    pub const TOP: Self = Self(1 << 3);
    /// Beyond the far plane, `z > w`.
    pub const BACK: Self = Self(1 << 4);
    /// In front of the near plane, `z < -w`.
    pub const FRONT: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b11_1111);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_inside(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitAnd for OutCode {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for OutCode {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutCode {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Outcode of a clip-space position.
#[inline]
pub fn outcode(p: Vec4) -> OutCode {
    let mut code = OutCode::INSIDE;
    if p.x < -p.w {
        code |= OutCode::LEFT;
    }
    if p.x > p.w {
        code |= OutCode::RIGHT;
    }
    if p.y < -p.w {
        code |= OutCode::BOTTOM;
    }
    if p.y > p.w {
        code |= OutCode::TOP;
    }
    if p.z > p.w {
        code |= OutCode::BACK;
    }
    if p.z < -p.w {
        code |= OutCode::FRONT;
    }
    code
}

/// A vertex without a clip-space position lies outside every plane.
#[inline]
fn vertex_outcode(vertex: &Vertex) -> OutCode {
    vertex.clip_space_position().map_or(OutCode::ALL, outcode)
}

fn outcodes<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> (OutCode, OutCode) {
    vertices
        .into_iter()
        .map(vertex_outcode)
        .fold((OutCode::ALL, OutCode::INSIDE), |(all, any), code| {
            (all & code, any | code)
        })
}

pub fn is_triangle_completely_inside(triangle: &Triangle) -> bool {
    outcodes(triangle.vertices()).1.is_inside()
}

pub fn is_triangle_completely_outside(triangle: &Triangle) -> bool {
    !outcodes(triangle.vertices()).0.is_inside()
}

/// One of the six clip planes, in clipping order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClipPlane {
    Right,
    Left,
    Top,
    Bottom,
    Back,
    Front,
}

impl ClipPlane {
    /// x, then y, then z; positive side before negative side.
    pub const ORDER: [ClipPlane; 6] = [
        ClipPlane::Right,
        ClipPlane::Left,
        ClipPlane::Top,
        ClipPlane::Bottom,
        ClipPlane::Back,
        ClipPlane::Front,
    ];

    #[inline]
    pub fn outcode(self) -> OutCode {
        match self {
            Self::Right => OutCode::RIGHT,
            Self::Left => OutCode::LEFT,
            Self::Top => OutCode::TOP,
            Self::Bottom => OutCode::BOTTOM,
            Self::Back => OutCode::BACK,
            Self::Front => OutCode::FRONT,
        }
    }

    /// `w - component` for the positive planes, `w + component` for the
    /// negative ones. Non-negative means inside.
    #[inline]
    pub fn distance(self, p: Vec4) -> f32 {
        match self {
            Self::Right => p.w - p.x,
            Self::Left => p.w + p.x,
            Self::Top => p.w - p.y,
            Self::Bottom => p.w + p.y,
            Self::Back => p.w - p.z,
            Self::Front => p.w + p.z,
        }
    }

    #[inline]
    fn vertex_distance(self, vertex: &Vertex) -> f32 {
        // Only vertices with a clip-space position reach the plane passes.
        self.distance(vertex.clip_space_position().unwrap_or(Vec4::ZERO))
    }
}

/// Walk the edges of a vertex path and keep the part on the inside of
/// `plane`, inserting a vertex wherever an edge crosses it. A closed path
/// also considers the edge from the last vertex back to the first.
fn clip_path(vertices: &[Vertex], plane: ClipPlane, closed: bool) -> Vec<Vertex> {
    let mut output = Vec::with_capacity(vertices.len() + 1);
    let (mut prev, rest) = match (closed, vertices) {
        (_, []) => return output,
        (true, _) => (&vertices[vertices.len() - 1], vertices),
        (false, [first, rest @ ..]) => {
            if plane.vertex_distance(first) >= 0.0 {
                output.push(first.clone());
            }
            (first, rest)
        }
    };

    let mut prev_distance = plane.vertex_distance(prev);
    for current in rest {
        let distance = plane.vertex_distance(current);
        if (prev_distance >= 0.0) != (distance >= 0.0) {
            let alpha = prev_distance / (prev_distance - distance);
            output.push(prev.lerp(current, alpha));
        }
        if distance >= 0.0 {
            output.push(current.clone());
        }
        prev = current;
        prev_distance = distance;
    }
    output
}

/// Clip a triangle against the clip volume.
///
/// Returns an empty list when the triangle lies outside, the triangle itself
/// when it lies fully inside, and otherwise the fan triangulation of the
/// clipped polygon. Each plane adds at most one vertex, so the polygon has
/// at most nine vertices and the fan at most seven triangles.
pub fn clip_triangle_against_clip_volume(triangle: &Triangle) -> Vec<Triangle> {
    count_call!(triangles_processed);

    let (all, any) = outcodes(triangle.vertices());
    if !all.is_inside() {
        count_call!(triangles_clipped);
        return Vec::new();
    }
    if any.is_inside() {
        return vec![triangle.clone()];
    }

    let mut polygon: Vec<Vertex> = triangle.vertices().to_vec();
    for plane in ClipPlane::ORDER {
        // Planes no vertex violates leave the polygon untouched.
        if !any.contains(plane.outcode()) {
            continue;
        }
        polygon = clip_path(&polygon, plane, true);
        if polygon.is_empty() {
            break;
        }
    }

    if polygon.len() < 3 {
        trace!(vertices = polygon.len(), "triangle clipped away");
        count_call!(triangles_clipped);
        return Vec::new();
    }
    // Intersections inherit flat values from either edge end
    let mut triangles = fan(&polygon);
    for clipped in &mut triangles {
        clipped.copy_flat_attributes(&triangle.vertices()[0]);
    }
    triangles
}

/// Clip a line against the clip volume; `None` when nothing remains.
pub fn clip_line_against_clip_volume(line: &Line) -> Option<Line> {
    let (all, any) = outcodes(line.vertices());
    if !all.is_inside() {
        return None;
    }
    if any.is_inside() {
        return Some(line.clone());
    }

    let mut path: Vec<Vertex> = line.vertices().to_vec();
    for plane in ClipPlane::ORDER {
        if !any.contains(plane.outcode()) {
            continue;
        }
        path = clip_path(&path, plane, false);
        if path.len() != 2 {
            return None;
        }
    }

    let mut ends = path.into_iter();
    match (ends.next(), ends.next()) {
        (Some(start), Some(end)) => {
            let mut clipped = Line::new(start, end);
            clipped.copy_flat_attributes(line.start());
            Some(clipped)
        }
        _ => None,
    }
}
