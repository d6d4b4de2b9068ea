//! Rotating sphere demo: transform a point cloud every frame and draw it
//! into an offscreen canvas

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use rotating_sphere_demo::{
    config::{Cli, Commands, RunArgs},
    frame_loop::FRAME_PERIOD,
    point_cloud, FrameLoop, FrameScheduler, FrameTransformer, PixelCanvas, Point3D,
};
use tracing::{info, warn};

fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=rotating_sphere_demo=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run(args)) => run(args),
        Some(Commands::Devices) => list_devices(),
        None => run(cli.run),
    }
}

#[cfg(feature = "wgpu")]
fn list_devices() -> Result<()> {
    let devices = rotating_sphere_demo::list_devices(wgpu::Backends::all());
    if devices.is_empty() {
        println!("No compute adapters found");
        return Ok(());
    }
    let candidates: Vec<_> = devices.iter().map(|d| (d.backend, d.class)).collect();
    let selected = rotating_sphere_demo::runners::wgpu::device::select_device(&candidates);
    for (i, device) in devices.iter().enumerate() {
        let mark = if selected == Some(i) { '*' } else { ' ' };
        println!("{mark}[{i}] {device}");
    }
    Ok(())
}

#[cfg(not(feature = "wgpu"))]
fn list_devices() -> Result<()> {
    println!("Built without accelerator support");
    Ok(())
}

#[cfg(feature = "wgpu")]
fn build_transformer(points: Arc<[Point3D]>, cpu_only: bool) -> FrameTransformer {
    if cpu_only {
        return FrameTransformer::new(points);
    }
    FrameTransformer::initialize(points, &rotating_sphere_demo::AcceleratorOptions::default())
}

#[cfg(not(feature = "wgpu"))]
fn build_transformer(points: Arc<[Point3D]>, cpu_only: bool) -> FrameTransformer {
    if cpu_only {
        return FrameTransformer::new(points);
    }
    FrameTransformer::initialize(points)
}

fn run(args: RunArgs) -> Result<()> {
    args.validate()?;

    let points: Arc<[Point3D]> = point_cloud::generate(args.lat_steps, args.lon_steps)?.into();
    info!(
        "Generated {} points ({}x{})",
        points.len(),
        args.lat_steps,
        args.lon_steps
    );

    let transformer = build_transformer(points, args.cpu_only);
    if !transformer.has_accelerator() {
        warn!(
            "No GPU acceleration, transforming on {}",
            transformer.fallback_info()
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("installing ctrl-c handler")?;
    }

    let mut frame_loop = FrameLoop::new(transformer);
    let mut canvas = PixelCanvas::new(args.width, args.height);
    let scheduler = FrameScheduler::new(FRAME_PERIOD, args.frames);

    let ticks = scheduler.run(&mut frame_loop, &mut canvas, &stop);
    let state = frame_loop.state();
    info!(
        "Rendered {ticks} frames, final angle {:.3}, accelerator {}, {} points drawn last frame",
        state.angle,
        if state.accelerator_available { "active" } else { "inactive" },
        canvas.drawn()
    );

    if let Some(path) = &args.snapshot {
        canvas
            .save_png(path)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        info!("Saved snapshot to {}", path.display());
    }

    Ok(())
}
