/// Demo renderer
/// Renders a small scene headless for a number of frames and writes the last
/// one as a PNG
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Mat4, Quat, Vec3, Vec4};
use mimalloc::MiMalloc;
use raster_pipeline::rendering::rgb_to_u32;
use raster_pipeline::*;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "raster-demo", about = "Render a test scene with the CPU pipeline")]
struct Args {
    /// Renderer configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured width
    #[arg(long)]
    width: Option<usize>,

    /// Override the configured height
    #[arg(long)]
    height: Option<usize>,

    /// Number of frames to render; the cube turns between frames
    #[arg(short, long, default_value_t = 1)]
    frames: usize,

    /// Where to write the last frame
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,
}

fn build_scene(config: &RendererConfig) -> Vec<Renderable> {
    let checker = Arc::new(Texture::checkerboard(
        8,
        8,
        rgb_to_u32(230, 230, 230),
        rgb_to_u32(200, 60, 40),
    ));
    let cube = Arc::new(Mesh::cube(1.5));
    let plane = Arc::new(Mesh::plane(8.0));
    let quad = Arc::new(Mesh::quad(1.5));

    let cube = Renderable::new(cube, ShaderProgram::lit())
        .with_material(
            Material::textured(checker)
                .with_sampler(config.default_sampler)
                .with_specular(0.4, 24.0),
        );
    let floor = Renderable::new(plane, ShaderProgram::lit_flat())
        .with_transform(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)))
        .with_material(Material::colored(Vec4::new(0.35, 0.55, 0.35, 1.0)));
    let glass = Renderable::new(quad, ShaderProgram::flat_color().with_blend(BlendFunction::Alpha))
        .with_transform(Mat4::from_translation(Vec3::new(0.6, 0.2, 1.6)))
        .with_material(Material::colored(Vec4::new(0.2, 0.4, 1.0, 0.45)))
        .transparent();

    vec![cube, floor, glass]
}

fn main() -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => RendererConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RendererConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }

    let mut scene = build_scene(&config);
    let mut renderer = Renderer::new(config.clone()).context("Failed to create renderer")?;
    renderer.add_overlay(Box::new(Crosshair::default()));

    let camera = Camera::new(Vec3::new(2.5, 2.0, 5.0), config.aspect_ratio()).looking_at(Vec3::ZERO);

    tracing::info!(
        width = config.width,
        height = config.height,
        frames = args.frames,
        "rendering"
    );

    let start = Instant::now();
    for frame in 0..args.frames.max(1) {
        let angle = frame as f32 * 0.05;
        scene[0].transform = Mat4::from_quat(Quat::from_rotation_y(angle));

        let stats = renderer
            .update(&camera, &scene)
            .with_context(|| format!("Frame {frame} failed"))?;
        // Y axis marker, depth tested against the frame
        renderer.draw_line_3d(
            &camera,
            Vec3::ZERO,
            Vec3::new(0.0, 2.0, 0.0),
            Vec4::new(1.0, 1.0, 0.0, 1.0),
        )?;

        tracing::info!(
            frame,
            objects = stats.objects_drawn,
            triangles = stats.triangles_rasterized,
            clipped = stats.triangles_clipped,
            culled = stats.triangles_culled,
            fragments = stats.fragments_written,
            "frame"
        );
    }
    let elapsed = start.elapsed();
    tracing::info!(
        avg_ms = elapsed.as_secs_f64() * 1000.0 / args.frames.max(1) as f64,
        "done"
    );

    #[cfg(feature = "profiling")]
    PIPELINE_COUNTERS.snapshot().log_report();

    let framebuffer = renderer.framebuffer();
    let image = image::RgbaImage::from_raw(
        framebuffer.width() as u32,
        framebuffer.height() as u32,
        framebuffer.to_rgba8_top_down(),
    )
    .context("Framebuffer size does not match its pixel data")?;
    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), "frame written");

    Ok(())
}
