/// Software rasterizer using the scanline algorithm
/// Triangles are filled one horizontal span at a time with perspective-correct
/// attribute interpolation and an optional lock-per-pixel depth test.
///
/// Coverage rule: a pixel is sampled at its integer coordinates. A triangle
/// covers scanlines `y` with `top <= y < bottom` and, on each scanline, the
/// pixels `x` with `left(y) <= x < right(y)`. The half-open ranges give the
/// top-left tie-break, so two triangles sharing an edge never shade the same
/// pixel twice and never leave a gap between them.
use glam::{Mat4, Vec3, Vec4};
use rayon::prelude::*;
use tracing::trace;

use super::framebuffer::{DepthBuffer, Framebuffer};
use super::shading::BlendFunction;
use crate::count_call;
use crate::error::VertexError;
use crate::pipeline::{Line, Triangle, Vertex};

/// Perspective divide followed by the viewport transform. Writes the
/// vertex's screen-space position, which pre-divides its `Smooth`
/// attributes by `w`.
pub fn project_to_screen(vertex: &mut Vertex, viewport: &Mat4) -> Result<(), VertexError> {
    let clip = vertex
        .clip_space_position()
        .ok_or(VertexError::ClipSpaceNotSet)?;
    let ndc = clip.truncate() / clip.w;
    vertex.set_screen_space_position(viewport.transform_point3(ndc))
}

/// Interpolates one triangle edge at integer scanlines.
///
/// `alpha(y) = start_alpha + (y - first_scanline) / dy`, where `start_alpha`
/// accounts for the fractional gap between the edge start and the first
/// scanline at or below it. Both triangles sharing an edge build the same
/// stepper from the same endpoints, so they agree on every boundary pixel.
struct EdgeStepper<'a> {
    start: &'a Vertex,
    end: &'a Vertex,
    first_scanline: f32,
    start_alpha: f32,
    inv_dy: f32,
}

impl<'a> EdgeStepper<'a> {
    fn new(start: &'a Vertex, end: &'a Vertex, y_start: f32, y_end: f32) -> Self {
        let dy = y_end - y_start;
        let inv_dy = if dy > 0.0 { 1.0 / dy } else { 0.0 };
        let first_scanline = y_start.ceil();
        Self {
            start,
            end,
            first_scanline,
            start_alpha: (first_scanline - y_start) * inv_dy,
            inv_dy,
        }
    }

    #[inline]
    fn at(&self, y: f32) -> Vertex {
        let alpha = self.start_alpha + (y - self.first_scanline) * self.inv_dy;
        self.start.lerp(self.end, alpha)
    }
}

/// Bitmap render target with 3D rasterization and depth testing.
pub struct BitmapGraphics3D {
    framebuffer: Framebuffer,
    // Allocated on first use of depth testing
    depth_buffer: Option<DepthBuffer>,
    depth_testing: bool,
    depth_read_only: bool,
    depth_clear_value: f32,
    parallel_triangles: bool,
    parallel_scanlines: bool,
}

impl BitmapGraphics3D {
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_framebuffer(Framebuffer::new(width, height))
    }

    pub fn from_framebuffer(framebuffer: Framebuffer) -> Self {
        Self {
            framebuffer,
            depth_buffer: None,
            depth_testing: false,
            depth_read_only: false,
            depth_clear_value: f32::INFINITY,
            parallel_triangles: true,
            parallel_scanlines: true,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.framebuffer.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.framebuffer.height()
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    #[inline]
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Resize the color buffer and, if allocated, the depth buffer with it.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer.resize(width, height);
        if self.depth_buffer.is_some() {
            self.depth_buffer = Some(DepthBuffer::new(width, height, self.depth_clear_value));
        }
    }

    /// Fill the color buffer.
    pub fn clear(&mut self, clear_color: u32) {
        self.framebuffer.clear(clear_color);
    }

    /// Turn depth testing on or off. The depth buffer is allocated the first
    /// time testing is enabled and kept afterwards.
    pub fn enable_depth_testing(&mut self, enabled: bool) {
        if enabled && self.depth_buffer.is_none() {
            self.depth_buffer = Some(DepthBuffer::new(
                self.width(),
                self.height(),
                self.depth_clear_value,
            ));
        }
        self.depth_testing = enabled;
    }

    #[inline]
    pub fn is_depth_testing_enabled(&self) -> bool {
        self.depth_testing
    }

    /// Reset every depth cell to `value`. Also the initial value of a depth
    /// buffer allocated later.
    pub fn clear_depth_buffer(&mut self, value: f32) {
        self.depth_clear_value = value;
        if let Some(depth) = self.depth_buffer.as_mut() {
            depth.clear(value);
        }
    }

    /// In read-only mode fragments are still depth tested, but passing
    /// fragments do not update the stored depth.
    pub fn set_depth_read_only(&mut self, read_only: bool) {
        self.depth_read_only = read_only;
    }

    #[inline]
    pub fn is_depth_read_only(&self) -> bool {
        self.depth_read_only
    }

    pub fn set_parallel_triangles(&mut self, parallel: bool) {
        self.parallel_triangles = parallel;
    }

    pub fn set_parallel_scanlines(&mut self, parallel: bool) {
        self.parallel_scanlines = parallel;
    }

    /// Stored depth at pixel (x, y), if a depth buffer exists.
    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        self.depth_buffer.as_ref()?.depth(x, y)
    }

    #[inline]
    fn active_depth_buffer(&self) -> Option<&DepthBuffer> {
        if self.depth_testing {
            self.depth_buffer.as_ref()
        } else {
            None
        }
    }

    /// Depth test, shade and write a single fragment at pixel (x, y).
    ///
    /// With depth testing enabled the pixel lock is held from the depth
    /// comparison through shading to the color write, so competing fragments
    /// of different triangles resolve strictly by depth. A shader returning
    /// `None` discards the fragment. Returns whether a color was written.
    pub fn shade_fragment<F>(
        &self,
        x: usize,
        y: usize,
        fragment: &Vertex,
        shader: &F,
        blend: BlendFunction,
    ) -> bool
    where
        F: Fn(&Vertex) -> Option<Vec4> + Sync,
    {
        count_call!(fragments_tested);
        let Some(index) = self.framebuffer.index(x, y) else {
            return false;
        };

        match self.active_depth_buffer() {
            Some(depth_buffer) => {
                let depth = fragment.screen_space_position().map_or(0.0, |p| p.z);
                let mut stored = depth_buffer.lock(index);
                if !(depth < *stored) {
                    count_call!(depth_failed);
                    return false;
                }
                let Some(color) = shader(fragment) else {
                    count_call!(fragments_discarded);
                    return false;
                };
                count_call!(depth_passed);
                if !self.depth_read_only {
                    *stored = depth;
                }
                self.framebuffer.write(index, color, blend);
                true
            }
            None => match shader(fragment) {
                Some(color) => {
                    self.framebuffer.write(index, color, blend);
                    true
                }
                None => {
                    count_call!(fragments_discarded);
                    false
                }
            },
        }
    }

    /// Rasterize one projected triangle. Triangles without screen-space
    /// positions, with zero height or zero area are skipped. Returns the
    /// number of fragments written.
    pub fn shade_triangle<F>(&self, triangle: &Triangle, shader: &F, blend: BlendFunction) -> usize
    where
        F: Fn(&Vertex) -> Option<Vec4> + Sync,
    {
        // Edge and span interpolation keep the flat values of whichever
        // vertex they start from, so every vertex must carry v1's.
        let triangle = triangle.with_leading_flat_attributes();
        let [v1, v2, v3] = triangle.vertices();
        let (Some(p1), Some(p2), Some(p3)) = (
            v1.screen_space_position(),
            v2.screen_space_position(),
            v3.screen_space_position(),
        ) else {
            trace!("skipping triangle without screen-space positions");
            return 0;
        };

        // Stable sort keeps submission order on ties
        let mut sorted = [(p1, v1), (p2, v2), (p3, v3)];
        sorted.sort_by(|a, b| a.0.y.total_cmp(&b.0.y));
        let [(top_p, top), (mid_p, mid), (bottom_p, bottom)] = sorted;

        if !(bottom_p.y - top_p.y > 0.0) {
            return 0;
        }
        let area = (mid_p.x - top_p.x) * (bottom_p.y - top_p.y)
            - (mid_p.y - top_p.y) * (bottom_p.x - top_p.x);
        if area == 0.0 || !area.is_finite() {
            return 0;
        }
        // Positive area puts the middle vertex right of the long edge
        let long_edge_is_left = area > 0.0;

        let long = EdgeStepper::new(top, bottom, top_p.y, bottom_p.y);
        let upper = EdgeStepper::new(top, mid, top_p.y, mid_p.y);
        let lower = EdgeStepper::new(mid, bottom, mid_p.y, bottom_p.y);

        let y_first = top_p.y.ceil().max(0.0);
        let y_end = bottom_p.y.ceil().min(self.height() as f32);
        if !(y_first < y_end) {
            return 0;
        }

        let scanline = |y: usize| -> usize {
            let yf = y as f32;
            let long_vertex = long.at(yf);
            let short_vertex = if yf < mid_p.y {
                upper.at(yf)
            } else {
                lower.at(yf)
            };
            let (left, right) = if long_edge_is_left {
                (long_vertex, short_vertex)
            } else {
                (short_vertex, long_vertex)
            };
            self.shade_span(y, &left, &right, shader, blend)
        };

        let rows = y_first as usize..y_end as usize;
        if self.parallel_scanlines {
            rows.into_par_iter().map(scanline).sum()
        } else {
            rows.map(scanline).sum()
        }
    }

    /// Shade pixels `ceil(left.x) <= x < ceil(right.x)` on scanline `y`.
    fn shade_span<F>(
        &self,
        y: usize,
        left: &Vertex,
        right: &Vertex,
        shader: &F,
        blend: BlendFunction,
    ) -> usize
    where
        F: Fn(&Vertex) -> Option<Vec4> + Sync,
    {
        let (Some(lp), Some(rp)) = (left.screen_space_position(), right.screen_space_position())
        else {
            return 0;
        };
        let span = rp.x - lp.x;
        if !(span > 0.0) {
            return 0;
        }

        let inv_span = 1.0 / span;
        let x_start = lp.x.ceil();
        let start_alpha = (x_start - lp.x) * inv_span;
        let x_first = x_start.max(0.0);
        let x_end = rp.x.ceil().min(self.width() as f32);
        if !(x_first < x_end) {
            return 0;
        }

        let mut written = 0;
        for x in x_first as usize..x_end as usize {
            let alpha = start_alpha + (x as f32 - x_start) * inv_span;
            let fragment = left.lerp(right, alpha);
            if self.shade_fragment(x, y, &fragment, shader, blend) {
                written += 1;
            }
        }
        written
    }

    /// Rasterize a batch of projected triangles, in parallel when enabled.
    pub fn shade_triangles<F>(&self, triangles: &[Triangle], shader: &F, blend: BlendFunction) -> usize
    where
        F: Fn(&Vertex) -> Option<Vec4> + Sync,
    {
        if self.parallel_triangles {
            triangles
                .par_iter()
                .map(|triangle| self.shade_triangle(triangle, shader, blend))
                .sum()
        } else {
            triangles
                .iter()
                .map(|triangle| self.shade_triangle(triangle, shader, blend))
                .sum()
        }
    }

    /// Rasterize a projected line along its major axis. Pixels are sampled
    /// at integer major-axis positions in `[ceil(start), ceil(end))` and the
    /// minor coordinate is rounded. Zero-length lines are skipped.
    pub fn draw_line<F>(&self, line: &Line, shader: &F, blend: BlendFunction) -> usize
    where
        F: Fn(&Vertex) -> Option<Vec4> + Sync,
    {
        let line = line.with_leading_flat_attributes();
        let (a, b) = (line.start(), line.end());
        let (Some(pa), Some(pb)) = (a.screen_space_position(), b.screen_space_position()) else {
            return 0;
        };
        let delta = pb - pa;
        if delta.x == 0.0 && delta.y == 0.0 {
            return 0;
        }
        count_call!(lines_drawn);

        let x_major = delta.x.abs() >= delta.y.abs();
        let major = |p: Vec3| if x_major { p.x } else { p.y };
        let minor = |p: Vec3| if x_major { p.y } else { p.x };
        let (start, end, p_start, p_end) = if major(pa) <= major(pb) {
            (a, b, pa, pb)
        } else {
            (b, a, pb, pa)
        };

        let (major_limit, minor_limit) = if x_major {
            (self.width() as f32, self.height() as f32)
        } else {
            (self.height() as f32, self.width() as f32)
        };
        let inv_length = 1.0 / (major(p_end) - major(p_start));
        let first = major(p_start).ceil().max(0.0);
        let last = major(p_end).ceil().min(major_limit);
        if !(first < last) {
            return 0;
        }

        let mut written = 0;
        for m in first as usize..last as usize {
            let alpha = (m as f32 - major(p_start)) * inv_length;
            let fragment = start.lerp(end, alpha);
            let Some(p) = fragment.screen_space_position() else {
                continue;
            };
            let n = minor(p).round();
            if n < 0.0 || n >= minor_limit {
                continue;
            }
            let (x, y) = if x_major {
                (m, n as usize)
            } else {
                (n as usize, m)
            };
            if self.shade_fragment(x, y, &fragment, shader, blend) {
                written += 1;
            }
        }
        written
    }
}
