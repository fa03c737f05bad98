//! Randomized coverage checks for the scanline rasterizer
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Vec2, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use raster_pipeline::{BitmapGraphics3D, BlendFunction, Interpolation, Triangle, Vertex};

const SIZE: usize = 64;

fn corner(p: Vec2, z: f32, t: f32) -> Vertex {
    let mut v = Vertex::from_screen_position(p.extend(z));
    v.set_attribute("t", t, Interpolation::NoPerspective);
    v
}

fn random_point(rng: &mut ChaCha8Rng) -> Vec2 {
    // Reaches past the target so clamping gets exercised too
    Vec2::new(rng.gen_range(-16.0..80.0), rng.gen_range(-16.0..80.0))
}

/// Shader counting shading calls per pixel and checking that interpolated
/// attributes stay within the vertex range.
struct Recorder {
    counts: Vec<AtomicU32>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            counts: (0..SIZE * SIZE).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn shade(&self, fragment: &Vertex) -> Option<Vec4> {
        let p = fragment.screen_space_position().unwrap();
        let (x, y) = (p.x.round() as usize, p.y.round() as usize);
        assert!(x < SIZE && y < SIZE, "fragment {p} outside the target");
        self.counts[y * SIZE + x].fetch_add(1, Ordering::Relaxed);

        let t = fragment.float("t").unwrap();
        assert!((-1e-3..=1.0 + 1e-3).contains(&t), "attribute {t} extrapolated");
        Some(Vec4::new(t, 0.0, 0.0, 1.0))
    }

    fn covered(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.counts.iter().enumerate().filter_map(|(i, c)| {
            let count = c.load(Ordering::Relaxed);
            (count > 0).then_some((i % SIZE, i / SIZE, count))
        })
    }
}

#[test]
fn random_triangles_stay_inside_their_bounds() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5CA7);
    for _ in 0..300 {
        let points = [random_point(&mut rng), random_point(&mut rng), random_point(&mut rng)];
        let triangle = Triangle::new(
            corner(points[0], 0.0, 0.0),
            corner(points[1], 0.0, 1.0),
            corner(points[2], 0.0, rng.gen()),
        );
        let min = points[0].min(points[1]).min(points[2]).floor();
        let max = points[0].max(points[1]).max(points[2]).ceil();

        let graphics = BitmapGraphics3D::new(SIZE, SIZE);
        let recorder = Recorder::new();
        let written = graphics.shade_triangle(&triangle, &|v: &Vertex| recorder.shade(v), BlendFunction::Replace);

        let mut total = 0;
        for (x, y, count) in recorder.covered() {
            assert_eq!(count, 1, "pixel ({x}, {y}) shaded {count} times");
            assert!(
                (min.x..=max.x).contains(&(x as f32)) && (min.y..=max.y).contains(&(y as f32)),
                "pixel ({x}, {y}) outside {min} - {max}"
            );
            total += 1;
        }
        assert_eq!(total, written);
    }
}

#[test]
fn random_convex_quads_cover_shared_edges_once() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x9A1D);
    for _ in 0..200 {
        let center = Vec2::new(rng.gen_range(8.0..56.0), rng.gen_range(8.0..56.0));
        let radius = rng.gen_range(2.0..30.0);
        let mut angles: Vec<f32> = (0..4).map(|_| rng.gen_range(0.0..std::f32::consts::TAU)).collect();
        angles.sort_by(f32::total_cmp);
        let p: Vec<Vec2> = angles
            .iter()
            .map(|a| center + Vec2::new(a.cos(), a.sin()) * radius)
            .collect();

        let triangles = [
            Triangle::new(corner(p[0], 0.0, 0.0), corner(p[1], 0.0, 0.5), corner(p[2], 0.0, 1.0)),
            Triangle::new(corner(p[0], 0.0, 0.0), corner(p[2], 0.0, 1.0), corner(p[3], 0.0, 0.25)),
        ];
        let graphics = BitmapGraphics3D::new(SIZE, SIZE);
        let recorder = Recorder::new();
        let written = graphics.shade_triangles(&triangles, &|v: &Vertex| recorder.shade(v), BlendFunction::Replace);

        let mut total = 0;
        for (x, y, count) in recorder.covered() {
            assert_eq!(count, 1, "pixel ({x}, {y}) shaded {count} times");
            total += 1;
        }
        assert_eq!(total, written);
    }
}

#[test]
fn parallel_and_sequential_rasterization_agree() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xA9EE);
    let mut sequential = BitmapGraphics3D::new(SIZE, SIZE);
    sequential.set_parallel_scanlines(false);
    let mut parallel = BitmapGraphics3D::new(SIZE, SIZE);

    for _ in 0..100 {
        let triangle = Triangle::new(
            corner(random_point(&mut rng), 0.0, 0.0),
            corner(random_point(&mut rng), 0.0, 1.0),
            corner(random_point(&mut rng), 0.0, 0.5),
        );
        let shader = |v: &Vertex| v.float("t").map(|t| Vec4::new(t, 1.0 - t, 0.0, 1.0));
        sequential.clear(0);
        parallel.clear(0);
        let a = sequential.shade_triangle(&triangle, &shader, BlendFunction::Replace);
        let b = parallel.shade_triangle(&triangle, &shader, BlendFunction::Replace);
        assert_eq!(a, b);
        assert_eq!(
            sequential.framebuffer().to_argb_vec(),
            parallel.framebuffer().to_argb_vec()
        );
    }
}

#[test]
fn depth_tested_scene_is_independent_of_scheduling() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xDE97);
    // Distinct constant depths give every pixel a single nearest triangle
    let triangles: Vec<Triangle> = (0..64)
        .map(|i| {
            let z = (i as f32 + rng.gen::<f32>() * 0.5) / 64.0;
            let t = rng.gen();
            Triangle::new(
                corner(random_point(&mut rng), z, t),
                corner(random_point(&mut rng), z, t),
                corner(random_point(&mut rng), z, t),
            )
        })
        .collect();
    let shader = |v: &Vertex| {
        let z = v.screen_space_position()?.z;
        Some(Vec4::new(z, v.float("t")?, 1.0 - z, 1.0))
    };

    let render = |parallel: bool| {
        let mut graphics = BitmapGraphics3D::new(SIZE, SIZE);
        graphics.set_parallel_triangles(parallel);
        graphics.set_parallel_scanlines(parallel);
        graphics.enable_depth_testing(true);
        graphics.shade_triangles(&triangles, &shader, BlendFunction::Replace);
        graphics.framebuffer().to_argb_vec()
    };

    let reference = render(false);
    for _ in 0..4 {
        assert_eq!(render(true), reference);
    }
}

#[test]
fn degenerate_slivers_never_panic() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x51F3);
    let graphics = BitmapGraphics3D::new(SIZE, SIZE);
    let shader = |_: &Vertex| Some(Vec4::ONE);
    for _ in 0..200 {
        let a = random_point(&mut rng);
        let direction = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        // Nearly collinear points
        let b = a + direction * rng.gen_range(0.0..40.0);
        let c = a + direction * rng.gen_range(0.0..40.0) + Vec2::splat(rng.gen_range(0.0..1e-3));
        let triangle = Triangle::new(
            Vertex::from_screen_position(Vec3::new(a.x, a.y, 0.0)),
            Vertex::from_screen_position(Vec3::new(b.x, b.y, 0.0)),
            Vertex::from_screen_position(Vec3::new(c.x, c.y, 0.0)),
        );
        graphics.shade_triangle(&triangle, &shader, BlendFunction::Replace);
    }
}
