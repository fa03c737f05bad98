//! Per-pixel depth testing, read-only depth and concurrent writers
use glam::{Vec3, Vec4};
use rayon::prelude::*;
use raster_pipeline::{BitmapGraphics3D, BlendFunction, Triangle, Vertex};

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

fn fragment(x: f32, y: f32, depth: f32) -> Vertex {
    Vertex::from_screen_position(Vec3::new(x, y, depth))
}

fn flat(color: Vec4) -> impl Fn(&Vertex) -> Option<Vec4> + Sync {
    move |_: &Vertex| Some(color)
}

fn depth_tested(width: usize, height: usize) -> BitmapGraphics3D {
    let mut graphics = BitmapGraphics3D::new(width, height);
    graphics.enable_depth_testing(true);
    graphics.clear_depth_buffer(1.0);
    graphics
}

#[test]
fn nearer_fragment_wins_regardless_of_order() {
    let graphics = depth_tested(2, 1);

    // Near first, far second: the far fragment fails
    assert!(graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.3), &flat(RED), BlendFunction::Replace));
    assert!(!graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.7), &flat(BLUE), BlendFunction::Replace));
    assert_eq!(graphics.framebuffer().pixel(0, 0), Some(0xFFFF0000));
    assert_eq!(graphics.depth_at(0, 0), Some(0.3));

    // Far first, near second: the near fragment replaces it
    assert!(graphics.shade_fragment(1, 0, &fragment(1.0, 0.0, 0.7), &flat(BLUE), BlendFunction::Replace));
    assert!(graphics.shade_fragment(1, 0, &fragment(1.0, 0.0, 0.3), &flat(RED), BlendFunction::Replace));
    assert_eq!(graphics.framebuffer().pixel(1, 0), Some(0xFFFF0000));
    assert_eq!(graphics.depth_at(1, 0), Some(0.3));
}

#[test]
fn equal_depth_fails_the_test() {
    let graphics = depth_tested(1, 1);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.5), &flat(RED), BlendFunction::Replace);
    assert!(!graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.5), &flat(BLUE), BlendFunction::Replace));
    assert_eq!(graphics.framebuffer().pixel(0, 0), Some(0xFFFF0000));
}

#[test]
fn read_only_depth_tests_without_writing() {
    let mut graphics = depth_tested(1, 1);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.5), &flat(RED), BlendFunction::Replace);

    graphics.set_depth_read_only(true);
    assert!(graphics.is_depth_read_only());
    // Behind the stored depth: rejected
    assert!(!graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.8), &flat(BLUE), BlendFunction::Replace));
    // In front: colored, but the stored depth stays
    assert!(graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.2), &flat(BLUE), BlendFunction::Replace));
    assert_eq!(graphics.framebuffer().pixel(0, 0), Some(0xFF0000FF));
    assert_eq!(graphics.depth_at(0, 0), Some(0.5));

    // A second fragment in front of the first read-only one still passes
    assert!(graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.4), &flat(RED), BlendFunction::Replace));
}

#[test]
fn disabled_depth_testing_keeps_last_write() {
    let graphics = BitmapGraphics3D::new(1, 1);
    assert!(!graphics.is_depth_testing_enabled());
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.1), &flat(RED), BlendFunction::Replace);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.9), &flat(BLUE), BlendFunction::Replace);
    assert_eq!(graphics.framebuffer().pixel(0, 0), Some(0xFF0000FF));
    // Never enabled, so never allocated
    assert_eq!(graphics.depth_at(0, 0), None);
}

#[test]
fn depth_buffer_survives_disabling() {
    let mut graphics = depth_tested(1, 1);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.25), &flat(RED), BlendFunction::Replace);
    graphics.enable_depth_testing(false);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.9), &flat(BLUE), BlendFunction::Replace);

    // Untested writes leave the stored depth alone
    assert_eq!(graphics.depth_at(0, 0), Some(0.25));
    graphics.enable_depth_testing(true);
    assert!(!graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.5), &flat(RED), BlendFunction::Replace));
}

#[test]
fn lazily_allocated_depth_buffer_uses_clear_value() {
    let mut graphics = BitmapGraphics3D::new(3, 3);
    graphics.clear_depth_buffer(0.75);
    assert_eq!(graphics.depth_at(1, 1), None);

    graphics.enable_depth_testing(true);
    assert_eq!(graphics.depth_at(2, 2), Some(0.75));
    assert!(!graphics.shade_fragment(1, 1, &fragment(1.0, 1.0, 0.8), &flat(RED), BlendFunction::Replace));
    assert!(graphics.shade_fragment(1, 1, &fragment(1.0, 1.0, 0.7), &flat(RED), BlendFunction::Replace));
}

#[test]
fn default_clear_value_accepts_any_finite_depth() {
    let mut graphics = BitmapGraphics3D::new(1, 1);
    graphics.enable_depth_testing(true);
    assert_eq!(graphics.depth_at(0, 0), Some(f32::INFINITY));
    assert!(graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 1e30), &flat(RED), BlendFunction::Replace));
}

#[test]
fn resize_reallocates_depth_buffer() {
    let mut graphics = depth_tested(2, 2);
    graphics.shade_fragment(0, 0, &fragment(0.0, 0.0, 0.1), &flat(RED), BlendFunction::Replace);
    graphics.resize(4, 3);
    assert_eq!(graphics.width(), 4);
    assert_eq!(graphics.height(), 3);
    assert_eq!(graphics.depth_at(0, 0), Some(1.0));
    assert_eq!(graphics.depth_at(3, 2), Some(1.0));
}

#[test]
fn concurrent_fragments_resolve_to_the_nearest() {
    const SIZE: usize = 16;
    let graphics = depth_tested(SIZE, SIZE);

    // Fragment k has depth k / 100 and red channel k
    (1..=100u32).into_par_iter().for_each(|k| {
        let depth = k as f32 / 100.0;
        let color = Vec4::new(k as f32 / 255.0, 0.0, 0.0, 1.0);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let f = fragment(x as f32, y as f32, depth);
                graphics.shade_fragment(x, y, &f, &flat(color), BlendFunction::Replace);
            }
        }
    });

    for y in 0..SIZE {
        for x in 0..SIZE {
            let pixel = graphics.framebuffer().pixel(x, y).unwrap();
            assert_eq!((pixel >> 16) & 0xFF, 1, "pixel ({x}, {y})");
            assert_eq!(graphics.depth_at(x, y), Some(0.01));
        }
    }
}

#[test]
fn overlapping_triangles_resolve_by_depth_in_parallel() {
    let graphics = depth_tested(32, 32);
    let square = |z: f32| {
        [
            Triangle::new(fragment(0.0, 0.0, z), fragment(32.0, 0.0, z), fragment(32.0, 32.0, z)),
            Triangle::new(fragment(0.0, 0.0, z), fragment(32.0, 32.0, z), fragment(0.0, 32.0, z)),
        ]
    };
    let far = square(0.8);
    let near = square(0.2);
    let shader = |v: &Vertex| {
        let z = v.screen_space_position()?.z;
        Some(if z < 0.5 { RED } else { BLUE })
    };

    // Submitted far after near, interleaved across rayon workers
    let triangles = [near[0].clone(), far[0].clone(), near[1].clone(), far[1].clone()];
    graphics.shade_triangles(&triangles, &shader, BlendFunction::Replace);

    assert!(graphics
        .framebuffer()
        .to_argb_vec()
        .iter()
        .all(|&pixel| pixel == 0xFFFF0000));
    let depth = graphics.depth_at(16, 16).unwrap();
    assert!((depth - 0.2).abs() < 1e-6, "{depth}");
}

#[test]
fn intersecting_triangles_split_by_interpolated_depth() {
    let graphics = depth_tested(16, 1);
    // Depth runs 0 -> 1 left to right in one, 1 -> 0 in the other
    let rising = Triangle::new(fragment(0.0, 0.0, 0.0), fragment(16.0, 0.0, 1.0), fragment(16.0, 1.0, 1.0));
    let falling = Triangle::new(fragment(0.0, 0.0, 1.0), fragment(16.0, 0.0, 0.0), fragment(16.0, 1.0, 0.0));
    graphics.shade_triangle(&rising, &flat(RED), BlendFunction::Replace);
    graphics.shade_triangle(&falling, &flat(BLUE), BlendFunction::Replace);

    let fb = graphics.framebuffer();
    assert_eq!(fb.pixel(2, 0), Some(0xFFFF0000));
    assert_eq!(fb.pixel(13, 0), Some(0xFF0000FF));
}
