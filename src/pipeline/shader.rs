//! Shader stages and the per-draw data they read.
//!
//! A stage is a plain function. Everything a stage may depend on is passed in
//! explicitly through [`Uniforms`], so one [`ShaderProgram`] can be shared by
//! any number of objects and run on any number of threads.

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::primitive::{Primitive, Triangle, TriangleAssembly};
use super::shaders;
use super::vertex::Vertex;
use crate::camera::Camera;
use crate::meshing::Mesh;
use crate::rendering::{BlendFunction, Lighting, Sampler, Texture};

/// Builds unprojected vertices from mesh data.
pub type VertexAssemblyFn = fn(&Mesh, &Uniforms) -> Vec<Vertex>;

/// Must set the clip-space position and must not touch the screen-space one.
pub type VertexShaderFn = fn(&mut Vertex, &Uniforms);

/// Replaces one triangle with zero or more primitives. Only triangles are
/// rasterized; other primitives are dropped.
pub type GeometryShaderFn = fn(Triangle, &Uniforms) -> Vec<Primitive>;

/// Color of one fragment, `None` to discard it.
pub type FragmentShaderFn = fn(&Vertex, &Uniforms) -> Option<Vec4>;

/// Which triangles are dropped after projection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    None,
    /// Drop clockwise (back-facing) triangles.
    #[default]
    Back,
    /// Drop counter-clockwise (front-facing) triangles.
    Front,
}

impl CullMode {
    #[inline]
    pub fn culls(self, front_facing: bool) -> bool {
        match self {
            CullMode::None => false,
            CullMode::Back => !front_facing,
            CullMode::Front => front_facing,
        }
    }
}

/// Surface parameters of one object.
#[derive(Clone, Debug)]
pub struct Material {
    /// Multiplied into the texture or vertex color.
    pub color: Vec4,
    pub texture: Option<Arc<Texture>>,
    pub sampler: Sampler,
    pub shininess: f32,
    /// Strength of the specular highlight, 0 disables it.
    pub specular: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            texture: None,
            sampler: Sampler::Nearest,
            shininess: 32.0,
            specular: 0.0,
        }
    }
}

impl Material {
    pub fn colored(color: Vec4) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn textured(texture: Arc<Texture>) -> Self {
        Self {
            texture: Some(texture),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_specular(mut self, specular: f32, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }
}

/// Per-object, per-frame inputs of every stage.
#[derive(Clone, Debug)]
pub struct Uniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub model_view_projection: Mat4,
    /// Inverse transpose of the model matrix, for normals.
    pub normal_matrix: Mat3,
    pub camera_position: Vec3,
    pub lighting: Lighting,
    pub material: Material,
}

impl Uniforms {
    pub fn new(model: Mat4, camera: &Camera, lighting: Lighting, material: Material) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        Self {
            model,
            view,
            projection,
            model_view_projection: projection * view * model,
            normal_matrix: Mat3::from_mat4(model.inverse().transpose()),
            camera_position: camera.position,
            lighting,
            material,
        }
    }
}

/// The stages run for one object, in pipeline order.
#[derive(Copy, Clone, Debug)]
pub struct ShaderProgram {
    pub vertex_assembly: VertexAssemblyFn,
    pub vertex_shader: VertexShaderFn,
    pub primitive_assembly: TriangleAssembly,
    pub geometry_shader: Option<GeometryShaderFn>,
    pub fragment_shader: FragmentShaderFn,
    pub blend: BlendFunction,
    /// Lets the renderer skip objects whose transformed mesh bounds miss
    /// the view frustum. Only sound while clip positions are the mesh
    /// positions under the model-view-projection transform, so replacing
    /// the vertex assembly or vertex stage turns it off.
    pub frustum_culling: bool,
}

impl ShaderProgram {
    /// Mesh assembly and the model-view-projection transform around a
    /// custom fragment stage.
    pub fn new(fragment_shader: FragmentShaderFn) -> Self {
        Self {
            vertex_assembly: shaders::assemble_mesh,
            vertex_shader: shaders::transform_vertex,
            primitive_assembly: TriangleAssembly::List,
            geometry_shader: None,
            fragment_shader,
            blend: BlendFunction::Replace,
            frustum_culling: true,
        }
    }

    /// Unlit, one color per object.
    pub fn flat_color() -> Self {
        Self::new(shaders::flat_color_fragment)
    }

    /// Unlit, interpolated per-vertex colors.
    pub fn vertex_color() -> Self {
        Self::new(shaders::vertex_color_fragment)
    }

    /// Unlit texture lookup.
    pub fn textured() -> Self {
        Self::new(shaders::textured_fragment)
    }

    /// Blinn-Phong with interpolated normals.
    pub fn lit() -> Self {
        Self::new(shaders::blinn_phong_fragment)
    }

    /// Blinn-Phong with one normal per triangle.
    pub fn lit_flat() -> Self {
        Self::lit().with_geometry_shader(shaders::flat_normal_geometry)
    }

    pub fn with_vertex_assembly(mut self, assembly: VertexAssemblyFn) -> Self {
        self.vertex_assembly = assembly;
        self.frustum_culling = false;
        self
    }

    pub fn with_vertex_shader(mut self, shader: VertexShaderFn) -> Self {
        self.vertex_shader = shader;
        self.frustum_culling = false;
        self
    }

    /// Opt back into bounds culling for custom stages that keep geometry
    /// inside the transformed mesh bounds.
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }

    pub fn with_primitive_assembly(mut self, assembly: TriangleAssembly) -> Self {
        self.primitive_assembly = assembly;
        self
    }

    pub fn with_geometry_shader(mut self, shader: GeometryShaderFn) -> Self {
        self.geometry_shader = Some(shader);
        self
    }

    pub fn with_fragment_shader(mut self, shader: FragmentShaderFn) -> Self {
        self.fragment_shader = shader;
        self
    }

    pub fn with_blend(mut self, blend: BlendFunction) -> Self {
        self.blend = blend;
        self
    }
}
