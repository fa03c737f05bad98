/// Indexed triangle meshes
/// Positions, texture coordinates and normals live in separate arrays and
/// each face corner indexes into them, the way mesh files store them.
use glam::{Vec2, Vec3, Vec4};

use crate::error::{RenderError, Result};

/// Axis-aligned face directions of a box.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaceDir {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl FaceDir {
    pub const ALL: [FaceDir; 6] = [
        FaceDir::PosX,
        FaceDir::NegX,
        FaceDir::PosY,
        FaceDir::NegY,
        FaceDir::PosZ,
        FaceDir::NegZ,
    ];

    #[inline]
    pub const fn normal(self) -> Vec3 {
        match self {
            FaceDir::PosX => Vec3::X,
            FaceDir::NegX => Vec3::NEG_X,
            FaceDir::PosY => Vec3::Y,
            FaceDir::NegY => Vec3::NEG_Y,
            FaceDir::PosZ => Vec3::Z,
            FaceDir::NegZ => Vec3::NEG_Z,
        }
    }

    /// In-face axes `(u, v)` with `u x v = normal`, so corners walked
    /// `-u-v, +u-v, +u+v, -u+v` wind counter-clockwise seen from outside.
    #[inline]
    pub const fn tangents(self) -> (Vec3, Vec3) {
        match self {
            FaceDir::PosX => (Vec3::NEG_Z, Vec3::Y),
            FaceDir::NegX => (Vec3::Z, Vec3::Y),
            FaceDir::PosY => (Vec3::X, Vec3::NEG_Z),
            FaceDir::NegY => (Vec3::X, Vec3::Z),
            FaceDir::PosZ => (Vec3::X, Vec3::Y),
            FaceDir::NegZ => (Vec3::NEG_X, Vec3::Y),
        }
    }
}

/// One corner of a face: indices into the mesh attribute arrays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaceCorner {
    pub position: u32,
    pub uv: Option<u32>,
    pub normal: Option<u32>,
}

impl FaceCorner {
    pub const fn new(position: u32) -> Self {
        Self {
            position,
            uv: None,
            normal: None,
        }
    }

    pub const fn with_uv(mut self, uv: u32) -> Self {
        self.uv = Some(uv);
        self
    }

    pub const fn with_normal(mut self, normal: u32) -> Self {
        self.normal = Some(normal);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Face {
    pub corners: [FaceCorner; 3],
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    normals: Vec<Vec3>,
    // Per-position colors; empty when the mesh has none
    colors: Vec<Vec4>,
    faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_position(&mut self, position: Vec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    pub fn push_uv(&mut self, uv: Vec2) -> u32 {
        self.uvs.push(uv);
        (self.uvs.len() - 1) as u32
    }

    pub fn push_normal(&mut self, normal: Vec3) -> u32 {
        self.normals.push(normal);
        (self.normals.len() - 1) as u32
    }

    /// Attach one color per position. Must match the position count.
    pub fn set_colors(&mut self, colors: Vec<Vec4>) -> Result<()> {
        if colors.len() != self.positions.len() {
            return Err(RenderError::InvalidMesh {
                face: None,
                reason: "color count does not match position count",
            });
        }
        self.colors = colors;
        Ok(())
    }

    /// Append a face after checking every corner index.
    pub fn push_face(&mut self, corners: [FaceCorner; 3]) -> Result<()> {
        let face = self.faces.len();
        for corner in &corners {
            if corner.position as usize >= self.positions.len() {
                return Err(RenderError::InvalidMesh {
                    face: Some(face),
                    reason: "position index out of range",
                });
            }
            if corner.uv.is_some_and(|uv| uv as usize >= self.uvs.len()) {
                return Err(RenderError::InvalidMesh {
                    face: Some(face),
                    reason: "uv index out of range",
                });
            }
            if corner
                .normal
                .is_some_and(|normal| normal as usize >= self.normals.len())
            {
                return Err(RenderError::InvalidMesh {
                    face: Some(face),
                    reason: "normal index out of range",
                });
            }
        }
        self.faces.push(Face { corners });
        Ok(())
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    // Indices were validated by `push_face`
    #[inline]
    pub fn position(&self, corner: &FaceCorner) -> Vec3 {
        self.positions[corner.position as usize]
    }

    #[inline]
    pub fn uv(&self, corner: &FaceCorner) -> Option<Vec2> {
        corner.uv.map(|i| self.uvs[i as usize])
    }

    #[inline]
    pub fn normal(&self, corner: &FaceCorner) -> Option<Vec3> {
        corner.normal.map(|i| self.normals[i as usize])
    }

    #[inline]
    pub fn color(&self, corner: &FaceCorner) -> Option<Vec4> {
        self.colors.get(corner.position as usize).copied()
    }

    /// Axis-aligned bounds of the positions used by faces.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut corners = self.faces.iter().flat_map(|face| face.corners.iter());
        let first = self.position(corners.next()?);
        Some(corners.fold((first, first), |(min, max), corner| {
            let p = self.position(corner);
            (min.min(p), max.max(p))
        }))
    }

    /// Append a textured quad on the face `dir` of a box of half-extent
    /// `half`, centered at `center`.
    fn push_box_face(&mut self, center: Vec3, half: Vec3, dir: FaceDir) {
        let (u, v) = dir.tangents();
        let n = dir.normal();
        let normal = self.push_normal(n);

        let corner_uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let corners = corner_uvs.map(|uv| {
            let offset = n + u * (uv.x * 2.0 - 1.0) + v * (uv.y * 2.0 - 1.0);
            let position = self.push_position(center + offset * half);
            let uv = self.push_uv(uv);
            FaceCorner::new(position).with_uv(uv).with_normal(normal)
        });

        // Indices are fresh, so the pushes cannot fail
        let quad = [[0, 1, 2], [0, 2, 3]];
        for [a, b, c] in quad {
            self.faces.push(Face {
                corners: [corners[a], corners[b], corners[c]],
            });
        }
    }

    /// Cube of edge length `size` centered at the origin, counter-clockwise
    /// faces seen from outside, one UV square per face.
    pub fn cube(size: f32) -> Self {
        let mut mesh = Self::new();
        let half = Vec3::splat(size * 0.5);
        for dir in FaceDir::ALL {
            mesh.push_box_face(Vec3::ZERO, half, dir);
        }
        mesh
    }

    /// Square of edge length `size` in the XZ plane, facing +Y.
    pub fn plane(size: f32) -> Self {
        let mut mesh = Self::new();
        mesh.push_box_face(Vec3::ZERO, Vec3::new(size * 0.5, 0.0, size * 0.5), FaceDir::PosY);
        mesh
    }

    /// Square of edge length `size` in the XY plane, facing +Z.
    pub fn quad(size: f32) -> Self {
        let mut mesh = Self::new();
        mesh.push_box_face(Vec3::ZERO, Vec3::new(size * 0.5, size * 0.5, 0.0), FaceDir::PosZ);
        mesh
    }
}
