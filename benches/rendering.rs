/// Benchmark suite for the rendering pipeline
/// Whole frames through the renderer plus the rasterizer hot paths.
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Quat, Vec3, Vec4};
use raster_pipeline::rendering::rgb_to_u32;
use raster_pipeline::{
    BitmapGraphics3D, BlendFunction, Camera, Framebuffer, Material, Mesh, Renderable, Renderer,
    RendererConfig, ShaderProgram, Texture, Triangle, Vertex,
};

fn scene() -> Vec<Renderable> {
    let checker = Arc::new(Texture::checkerboard(8, 8, rgb_to_u32(230, 230, 230), rgb_to_u32(200, 60, 40)));
    let cube = Arc::new(Mesh::cube(1.0));
    let mut scene = Vec::new();
    for x in -2..=2 {
        for z in -2..=2 {
            scene.push(
                Renderable::new(Arc::clone(&cube), ShaderProgram::lit())
                    .with_transform(
                        Mat4::from_translation(Vec3::new(x as f32 * 1.5, 0.0, z as f32 * 1.5))
                            * Mat4::from_quat(Quat::from_rotation_y((x * z) as f32 * 0.3)),
                    )
                    .with_material(Material::textured(Arc::clone(&checker))),
            );
        }
    }
    scene.push(
        Renderable::new(Arc::new(Mesh::plane(12.0)), ShaderProgram::lit_flat())
            .with_transform(Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0))),
    );
    scene
}

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    let scene = scene();
    let mut transparent_scene = scene.clone();
    transparent_scene.push(
        Renderable::new(
            Arc::new(Mesh::quad(6.0)),
            ShaderProgram::flat_color().with_blend(BlendFunction::Alpha),
        )
        .with_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 3.0)))
        .with_material(Material::colored(Vec4::new(0.2, 0.4, 1.0, 0.4)))
        .transparent(),
    );

    for (width, height) in [(320, 240), (1280, 720)] {
        let mut renderer = Renderer::new(RendererConfig {
            width,
            height,
            ..RendererConfig::default()
        })
        .unwrap();
        let camera = Camera::new(Vec3::new(0.0, 4.0, 8.0), width as f32 / height as f32).looking_at(Vec3::ZERO);

        group.bench_with_input(BenchmarkId::new("opaque", width), &scene, |b, scene| {
            b.iter(|| black_box(renderer.update(&camera, scene).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("with_transparent", width), &transparent_scene, |b, scene| {
            b.iter(|| black_box(renderer.update(&camera, scene).unwrap()));
        });
    }
    group.finish();
}

fn bench_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallelism");
    let scene = scene();
    let camera = Camera::new(Vec3::new(0.0, 4.0, 8.0), 1280.0 / 720.0).looking_at(Vec3::ZERO);

    for parallel in [false, true] {
        let mut renderer = Renderer::new(RendererConfig {
            width: 1280,
            height: 720,
            parallel_objects: parallel,
            parallel_triangles: parallel,
            parallel_scanlines: parallel,
            ..RendererConfig::default()
        })
        .unwrap();
        group.bench_function(BenchmarkId::new("frame", parallel), |b| {
            b.iter(|| black_box(renderer.update(&camera, &scene).unwrap()));
        });
    }
    group.finish();
}

fn bench_shade_triangle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shade_triangle");
    let screen = |x: f32, y: f32| Vertex::from_screen_position(Vec3::new(x, y, 0.5));
    let shader = |_: &Vertex| Some(Vec4::ONE);

    for size in [16.0f32, 128.0, 512.0] {
        let triangle = Triangle::new(screen(4.0, 4.0), screen(4.0 + size, 4.0), screen(4.0, 4.0 + size));
        let mut graphics = BitmapGraphics3D::new(640, 640);
        graphics.enable_depth_testing(true);

        group.bench_with_input(BenchmarkId::from_parameter(size), &triangle, |b, triangle| {
            b.iter(|| {
                graphics.clear_depth_buffer(f32::INFINITY);
                black_box(graphics.shade_triangle(black_box(triangle), &shader, BlendFunction::Replace))
            });
        });
    }
    group.finish();
}

fn bench_framebuffer_clear(c: &mut Criterion) {
    c.bench_function("framebuffer_clear", |b| {
        let mut framebuffer = Framebuffer::new(1280, 720);

        b.iter(|| {
            framebuffer.clear(black_box(0xFF87CEEB));
        });
    });
}

fn bench_vertex_lerp(c: &mut Criterion) {
    c.bench_function("vertex_lerp", |b| {
        let mut start = Vertex::from_screen_position(Vec3::ZERO);
        let mut end = Vertex::from_screen_position(Vec3::ONE);
        for name in ["uv", "normal", "color"] {
            start.set_attribute(name, Vec4::ZERO, raster_pipeline::Interpolation::Smooth);
            end.set_attribute(name, Vec4::ONE, raster_pipeline::Interpolation::Smooth);
        }

        b.iter(|| black_box(start.lerp(black_box(&end), black_box(0.37))));
    });
}

criterion_group!(
    benches,
    bench_render_frame,
    bench_parallelism,
    bench_shade_triangle,
    bench_framebuffer_clear,
    bench_vertex_lerp,
);
criterion_main!(benches);
