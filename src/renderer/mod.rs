//! Frame driver: runs every visible object through the shader stages and the
//! rasterizer, then draws overlays on top.
//!
//! Opaque objects are drawn first, in any order and concurrently, with depth
//! writes on. Transparent objects follow strictly back to front with the
//! depth buffer read-only, so they are hidden by opaque geometry but never by
//! each other.

use std::ops::{Add, AddAssign};
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::camera::{viewport_matrix, Camera, Frustum};
use crate::config::RendererConfig;
use crate::count_call;
use crate::error::{RenderError, Result};
use crate::meshing::Mesh;
use crate::perf::PerfTimer;
use crate::pipeline::{
    clip_line_against_clip_volume, clip_triangle_against_clip_volume, CullMode, Line, LineAssembly,
    Material, Primitive, ShaderProgram, Triangle, Uniforms, Vertex,
};
use crate::rendering::{project_to_screen, BitmapGraphics3D, BlendFunction, Framebuffer, Lighting};

/// An object submitted for drawing.
#[derive(Clone, Debug)]
pub struct Renderable {
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    pub program: ShaderProgram,
    pub material: Material,
    pub transparent: bool,
    pub cull_mode: CullMode,
    pub visible: bool,
}

impl Renderable {
    pub fn new(mesh: Arc<Mesh>, program: ShaderProgram) -> Self {
        Self {
            mesh,
            transform: Mat4::IDENTITY,
            program,
            material: Material::default(),
            transparent: false,
            cull_mode: CullMode::Back,
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Draw in the transparent pass. Both faces are drawn, so culling is
    /// turned off.
    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self.cull_mode = CullMode::None;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// World-space center of the mesh bounds.
    pub fn center(&self) -> Vec3 {
        let local = self
            .mesh
            .bounds()
            .map_or(Vec3::ZERO, |(min, max)| (min + max) * 0.5);
        self.transform.transform_point3(local)
    }

    /// Objects whose program places vertices itself are always kept.
    fn in_frustum(&self, frustum: &Frustum) -> bool {
        if !self.program.frustum_culling {
            return true;
        }
        self.mesh
            .bounds()
            .is_some_and(|(min, max)| frustum.intersects_transformed_aabb(min, max, &self.transform))
    }
}

/// Screen-space drawing after the 3D passes, with depth testing off.
pub trait Overlay: Send + Sync {
    fn draw(&self, graphics: &BitmapGraphics3D);
}

/// Two lines crossing at the center of the screen.
#[derive(Copy, Clone, Debug)]
pub struct Crosshair {
    /// Half-length of each arm, in pixels.
    pub size: f32,
    pub color: Vec4,
}

impl Default for Crosshair {
    fn default() -> Self {
        Self {
            size: 8.0,
            color: Vec4::ONE,
        }
    }
}

impl Overlay for Crosshair {
    fn draw(&self, graphics: &BitmapGraphics3D) {
        let cx = (graphics.width() / 2) as f32;
        let cy = (graphics.height() / 2) as f32;
        let color = self.color;
        let shader = move |_: &Vertex| Some(color);
        let point = |x: f32, y: f32| Vertex::from_screen_position(Vec3::new(x, y, 0.0));

        let horizontal = Line::new(point(cx - self.size, cy), point(cx + self.size + 1.0, cy));
        let vertical = Line::new(point(cx, cy - self.size), point(cx, cy + self.size + 1.0));
        graphics.draw_line(&horizontal, &shader, BlendFunction::Replace);
        graphics.draw_line(&vertical, &shader, BlendFunction::Replace);
    }
}

/// Counts for one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects_drawn: usize,
    /// Hidden or outside the view frustum.
    pub objects_skipped: usize,
    /// Triangles produced by primitive assembly and the geometry stage.
    pub triangles_submitted: usize,
    /// Submitted triangles with nothing left after clipping.
    pub triangles_clipped: usize,
    /// Clipped triangles dropped by the cull mode.
    pub triangles_culled: usize,
    pub triangles_rasterized: usize,
    pub fragments_written: usize,
}

impl Add for FrameStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            objects_drawn: self.objects_drawn + rhs.objects_drawn,
            objects_skipped: self.objects_skipped + rhs.objects_skipped,
            triangles_submitted: self.triangles_submitted + rhs.triangles_submitted,
            triangles_clipped: self.triangles_clipped + rhs.triangles_clipped,
            triangles_culled: self.triangles_culled + rhs.triangles_culled,
            triangles_rasterized: self.triangles_rasterized + rhs.triangles_rasterized,
            fragments_written: self.fragments_written + rhs.fragments_written,
        }
    }
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pass {
    Opaque,
    Transparent,
}

pub struct Renderer {
    graphics: BitmapGraphics3D,
    config: RendererConfig,
    viewport: Mat4,
    lighting: Lighting,
    overlays: Vec<Box<dyn Overlay>>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        config.validate()?;
        let mut graphics = BitmapGraphics3D::new(config.width, config.height);
        graphics.set_parallel_triangles(config.parallel_triangles);
        graphics.set_parallel_scanlines(config.parallel_scanlines);
        graphics.clear_depth_buffer(config.depth_clear_value);
        graphics.enable_depth_testing(true);

        debug!(
            width = config.width,
            height = config.height,
            parallel_objects = config.parallel_objects,
            "renderer created"
        );
        Ok(Self {
            graphics,
            viewport: viewport_matrix(config.width, config.height),
            config,
            lighting: Lighting::default(),
            overlays: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn graphics(&self) -> &BitmapGraphics3D {
        &self.graphics
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        self.graphics.framebuffer()
    }

    #[inline]
    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.lighting = lighting;
    }

    pub fn add_overlay(&mut self, overlay: Box<dyn Overlay>) {
        self.overlays.push(overlay);
    }

    pub fn clear_overlays(&mut self) {
        self.overlays.clear();
    }

    /// Resize the render target; the depth buffer follows.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let config = RendererConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;
        self.graphics.resize(width, height);
        self.viewport = viewport_matrix(width, height);
        self.config = config;
        Ok(())
    }

    /// Render one frame of `renderables` seen from `camera`.
    ///
    /// A shader contract violation aborts the frame and is returned as is;
    /// the framebuffer then holds a partial frame.
    pub fn update(&mut self, camera: &Camera, renderables: &[Renderable]) -> Result<FrameStats> {
        let timer = PerfTimer::new("renderer.update");
        let mut stats = FrameStats::default();

        self.graphics.clear(self.config.clear_color);
        self.graphics.clear_depth_buffer(self.config.depth_clear_value);
        self.graphics.enable_depth_testing(true);
        self.graphics.set_depth_read_only(false);

        let frustum = camera.extract_frustum();
        let (transparent, opaque): (Vec<&Renderable>, Vec<&Renderable>) = renderables
            .iter()
            .filter(|renderable| {
                let keep = renderable.visible && renderable.in_frustum(&frustum);
                if !keep {
                    stats.objects_skipped += 1;
                }
                keep
            })
            .partition(|renderable| renderable.transparent);

        stats += if self.config.parallel_objects {
            opaque
                .par_iter()
                .map(|renderable| self.draw_renderable(renderable, camera, Pass::Opaque))
                .try_reduce(FrameStats::default, |a, b| Ok(a + b))?
        } else {
            opaque.iter().try_fold(FrameStats::default(), |acc, renderable| {
                Ok::<_, RenderError>(acc + self.draw_renderable(renderable, camera, Pass::Opaque)?)
            })?
        };

        // Blending does not commute, so the far objects go first
        let mut transparent = transparent;
        transparent.sort_by(|a, b| {
            camera
                .distance_to(b.center())
                .total_cmp(&camera.distance_to(a.center()))
        });
        self.graphics.set_depth_read_only(true);
        let transparent_result = transparent.iter().try_fold(FrameStats::default(), |acc, renderable| {
            Ok::<_, RenderError>(acc + self.draw_renderable(renderable, camera, Pass::Transparent)?)
        });
        self.graphics.set_depth_read_only(false);
        stats += transparent_result?;

        self.graphics.enable_depth_testing(false);
        for overlay in &self.overlays {
            overlay.draw(&self.graphics);
        }
        self.graphics.enable_depth_testing(true);

        debug!(
            objects = stats.objects_drawn,
            skipped = stats.objects_skipped,
            triangles = stats.triangles_rasterized,
            fragments = stats.fragments_written,
            elapsed_us = timer.elapsed().as_micros() as u64,
            "frame rendered"
        );
        Ok(stats)
    }

    /// Draw a world-space line with depth testing against the current
    /// frame. Returns the number of pixels written.
    pub fn draw_line_3d(&self, camera: &Camera, start: Vec3, end: Vec3, color: Vec4) -> Result<usize> {
        self.draw_lines_3d(camera, &[start, end], LineAssembly::List, color)
    }

    /// Draw world-space lines through `points`, grouped by `assembly`.
    pub fn draw_lines_3d(
        &self,
        camera: &Camera,
        points: &[Vec3],
        assembly: LineAssembly,
        color: Vec4,
    ) -> Result<usize> {
        let view_projection = camera.view_projection_matrix();
        let vertices = points
            .iter()
            .map(|p| Vertex::from_clip_position(view_projection * p.extend(1.0)))
            .collect();
        let shader = move |_: &Vertex| Some(color);

        let mut written = 0;
        for line in assembly.assemble(vertices)? {
            let Some(line) = clip_line_against_clip_volume(&line) else {
                continue;
            };
            let [mut a, mut b] = line.into_vertices();
            project_to_screen(&mut a, &self.viewport)?;
            project_to_screen(&mut b, &self.viewport)?;
            written += self
                .graphics
                .draw_line(&Line::new(a, b), &shader, BlendFunction::Replace);
        }
        Ok(written)
    }

    /// Run one object through every stage.
    fn draw_renderable(&self, renderable: &Renderable, camera: &Camera, pass: Pass) -> Result<FrameStats> {
        let program = &renderable.program;
        let uniforms = Uniforms::new(
            renderable.transform,
            camera,
            self.lighting,
            renderable.material.clone(),
        );
        let mut stats = FrameStats {
            objects_drawn: 1,
            ..FrameStats::default()
        };

        let mut vertices = (program.vertex_assembly)(&renderable.mesh, &uniforms);
        for (index, vertex) in vertices.iter_mut().enumerate() {
            (program.vertex_shader)(vertex, &uniforms);
            if vertex.screen_space_position().is_some() {
                warn!(index, "vertex shader wrote the screen-space position");
                return Err(RenderError::VertexShaderSetScreenSpace { index });
            }
            if vertex.clip_space_position().is_none() {
                warn!(index, "vertex shader did not write a clip-space position");
                return Err(RenderError::MissingClipSpacePosition { index });
            }
        }

        let assembled = program.primitive_assembly.assemble(vertices)?;
        let triangles: Vec<Triangle> = match program.geometry_shader {
            Some(geometry_shader) => assembled
                .into_iter()
                .flat_map(|triangle| geometry_shader(triangle, &uniforms))
                .filter_map(Primitive::into_triangle)
                .collect(),
            None => assembled,
        };
        stats.triangles_submitted = triangles.len();

        let cull_mode = renderable.cull_mode;
        let mut visible = Vec::with_capacity(triangles.len());
        for triangle in &triangles {
            let clipped = clip_triangle_against_clip_volume(triangle);
            if clipped.is_empty() {
                stats.triangles_clipped += 1;
                continue;
            }
            for piece in clipped {
                let projected = self.project_triangle(piece)?;
                if cull_mode.culls(projected.is_front_facing()) {
                    count_call!(triangles_culled);
                    stats.triangles_culled += 1;
                } else {
                    visible.push(projected);
                }
            }
        }
        stats.triangles_rasterized = visible.len();

        let shader = |fragment: &Vertex| (program.fragment_shader)(fragment, &uniforms);
        stats.fragments_written = match pass {
            Pass::Opaque => self.graphics.shade_triangles(&visible, &shader, program.blend),
            Pass::Transparent => {
                // Back faces first, one triangle at a time
                let (front, back): (Vec<&Triangle>, Vec<&Triangle>) =
                    visible.iter().partition(|triangle| triangle.is_front_facing());
                back.into_iter()
                    .chain(front)
                    .map(|triangle| self.graphics.shade_triangle(triangle, &shader, program.blend))
                    .sum()
            }
        };

        trace!(
            triangles = stats.triangles_submitted,
            rasterized = stats.triangles_rasterized,
            fragments = stats.fragments_written,
            transparent = renderable.transparent,
            "object drawn"
        );
        Ok(stats)
    }

    fn project_triangle(&self, triangle: Triangle) -> Result<Triangle> {
        let [mut a, mut b, mut c] = triangle.into_vertices();
        for vertex in [&mut a, &mut b, &mut c] {
            project_to_screen(vertex, &self.viewport)?;
        }
        Ok(Triangle::new(a, b, c))
    }
}
