//! Built-in shader stages.

use glam::{Vec3, Vec4};

use super::primitive::{Primitive, Triangle};
use super::shader::Uniforms;
use super::vertex::{Interpolation, Vertex};
use crate::meshing::Mesh;

/// Model-space position written by mesh assembly.
pub const POSITION: &str = "position";
/// Surface normal; model space after assembly, world space after the
/// vertex shader.
pub const NORMAL: &str = "normal";
pub const UV: &str = "uv";
pub const COLOR: &str = "color";
pub const WORLD_POSITION: &str = "world_position";

/// One vertex per face corner, so faces map to consecutive triples.
pub fn assemble_mesh(mesh: &Mesh, _uniforms: &Uniforms) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(mesh.triangle_count() * 3);
    for face in mesh.faces() {
        for corner in &face.corners {
            let mut vertex = Vertex::new();
            vertex.set_attribute(POSITION, mesh.position(corner), Interpolation::Smooth);
            if let Some(uv) = mesh.uv(corner) {
                vertex.set_attribute(UV, uv, Interpolation::Smooth);
            }
            if let Some(normal) = mesh.normal(corner) {
                vertex.set_attribute(NORMAL, normal, Interpolation::Smooth);
            }
            if let Some(color) = mesh.color(corner) {
                vertex.set_attribute(COLOR, color, Interpolation::Smooth);
            }
            vertices.push(vertex);
        }
    }
    vertices
}

/// Model-view-projection transform. Also writes the world position and
/// moves the normal to world space for lighting.
pub fn transform_vertex(vertex: &mut Vertex, uniforms: &Uniforms) {
    let Some(position) = vertex.vec3(POSITION) else {
        return;
    };
    vertex.set_clip_space_position(uniforms.model_view_projection * position.extend(1.0));
    vertex.set_attribute(
        WORLD_POSITION,
        uniforms.model.transform_point3(position),
        Interpolation::Smooth,
    );
    if let Some(normal) = vertex.vec3(NORMAL) {
        let world_normal = (uniforms.normal_matrix * normal).normalize_or_zero();
        vertex.set_attribute(NORMAL, world_normal, Interpolation::Smooth);
    }
}

/// Replaces the vertex normals with the geometric normal of the triangle,
/// constant over its surface.
pub fn flat_normal_geometry(triangle: Triangle, _uniforms: &Uniforms) -> Vec<Primitive> {
    let [mut a, mut b, mut c] = triangle.into_vertices();
    if let (Some(pa), Some(pb), Some(pc)) = (
        a.vec3(WORLD_POSITION),
        b.vec3(WORLD_POSITION),
        c.vec3(WORLD_POSITION),
    ) {
        let normal = (pb - pa).cross(pc - pa).normalize_or_zero();
        for vertex in [&mut a, &mut b, &mut c] {
            vertex.set_attribute(NORMAL, normal, Interpolation::Flat);
        }
    }
    vec![Triangle::new(a, b, c).into()]
}

pub fn flat_color_fragment(_fragment: &Vertex, uniforms: &Uniforms) -> Option<Vec4> {
    Some(uniforms.material.color)
}

pub fn vertex_color_fragment(fragment: &Vertex, uniforms: &Uniforms) -> Option<Vec4> {
    let color = fragment.vec4(COLOR).unwrap_or(Vec4::ONE);
    Some(color * uniforms.material.color)
}

/// Texture (or vertex color) modulated by the material color.
fn base_color(fragment: &Vertex, uniforms: &Uniforms) -> Vec4 {
    let material = &uniforms.material;
    let base = match (&material.texture, fragment.vec2(UV)) {
        (Some(texture), Some(uv)) => texture.sample(uv, material.sampler),
        _ => fragment.vec4(COLOR).unwrap_or(Vec4::ONE),
    };
    base * material.color
}

/// Unlit texture lookup. Fully transparent texels are discarded.
pub fn textured_fragment(fragment: &Vertex, uniforms: &Uniforms) -> Option<Vec4> {
    let color = base_color(fragment, uniforms);
    (color.w > 0.0).then_some(color)
}

/// Ambient, Lambert diffuse and Blinn-Phong specular from the uniform light.
pub fn blinn_phong_fragment(fragment: &Vertex, uniforms: &Uniforms) -> Option<Vec4> {
    let base = base_color(fragment, uniforms);
    if base.w <= 0.0 {
        return None;
    }
    let Some(normal) = fragment.vec3(NORMAL) else {
        return Some(base);
    };
    let view_dir = fragment
        .vec3(WORLD_POSITION)
        .map_or(Vec3::ZERO, |p| uniforms.camera_position - p);
    let material = &uniforms.material;
    Some(uniforms.lighting.shade(
        base,
        normal,
        view_dir,
        material.shininess,
        material.specular,
    ))
}
