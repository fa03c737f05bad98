/// Color and depth storage shared by all rasterizer workers.
///
/// Both buffers are written through `&self` so triangles, scanlines and whole
/// objects can be rasterized concurrently:
/// - Color cells are `AtomicU32` (ARGB). Blended writes use a CAS loop so a
///   read-modify-write never loses an update.
/// - Depth cells are `parking_lot::Mutex<f32>`. The mutex is the per-pixel
///   lock of the depth test; holding it covers compare, shade and write.
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec4;
use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;

use super::shading::{pack_argb, unpack_argb, BlendFunction};
use crate::count_call;

pub struct Framebuffer {
    // Hot data: used for every bounds check and index calculation
    width: usize,
    height: usize,
    color: Vec<AtomicU32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            color: (0..width * height).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.color.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.color.is_empty()
    }

    /// Linear index of pixel (x, y), `None` when out of bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Fill the color buffer.
    pub fn clear(&mut self, clear_color: u32) {
        count_call!(framebuffer_clears);
        self.color
            .par_iter_mut()
            .for_each(|cell| *cell.get_mut() = clear_color);
    }

    /// Resize, discarding the previous contents.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.color = (0..width * height).map(|_| AtomicU32::new(0)).collect();
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        self.index(x, y)
            .map(|index| self.color[index].load(Ordering::Relaxed))
    }

    /// Set pixel without depth test (for overlays, etc.)
    #[inline]
    pub fn set_pixel(&self, x: usize, y: usize, color: u32) {
        if let Some(index) = self.index(x, y) {
            self.color[index].store(color, Ordering::Relaxed);
        }
    }

    /// Write a shaded color at `index`, combined with the stored color by
    /// `blend`.
    #[inline]
    pub fn write(&self, index: usize, color: Vec4, blend: BlendFunction) {
        let cell = &self.color[index];
        if !blend.reads_destination() {
            cell.store(pack_argb(color), Ordering::Relaxed);
            return;
        }
        // Infallible: the closure always returns Some.
        let _ = cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |dst| {
            Some(pack_argb(blend.blend(color, unpack_argb(dst))))
        });
    }

    /// Copy of the color buffer, row 0 first (bottom row of the image).
    pub fn to_argb_vec(&self) -> Vec<u32> {
        self.color
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect()
    }

    /// Copy of the color buffer with the top image row first, as image
    /// encoders and displays expect.
    pub fn to_argb_rows_top_down(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len());
        for y in (0..self.height).rev() {
            let row = &self.color[y * self.width..(y + 1) * self.width];
            out.extend(row.iter().map(|cell| cell.load(Ordering::Relaxed)));
        }
        out
    }

    /// Top-down RGBA8 bytes for image export.
    pub fn to_rgba8_top_down(&self) -> Vec<u8> {
        self.to_argb_rows_top_down()
            .into_iter()
            .flat_map(|argb| {
                [
                    (argb >> 16) as u8,
                    (argb >> 8) as u8,
                    argb as u8,
                    (argb >> 24) as u8,
                ]
            })
            .collect()
    }
}

/// Per-pixel depth values, each behind its own lock.
pub struct DepthBuffer {
    width: usize,
    height: usize,
    cells: Vec<Mutex<f32>>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize, clear_value: f32) -> Self {
        Self {
            width,
            height,
            cells: (0..width * height).map(|_| Mutex::new(clear_value)).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, value: f32) {
        self.cells
            .par_iter_mut()
            .for_each(|cell| *cell.get_mut() = value);
    }

    /// Acquire the lock of the pixel at `index`.
    #[inline]
    pub fn lock(&self, index: usize) -> MutexGuard<'_, f32> {
        self.cells[index].lock()
    }

    pub fn depth(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| *self.cells[y * self.width + x].lock())
    }
}
