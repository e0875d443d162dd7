#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Reelspin slot machine.

mod config;
mod machine;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use reelspin_rendering::{Color, Presentation, RenderingBackend, TextureManifest};
use reelspin_rendering_macroquad::MacroquadBackend;

use self::{
    config::{FileConfig, MachineOverrides},
    machine::SlotMachine,
};

/// Command-line arguments accepted by the `reelspin` binary.
#[derive(Debug, Parser)]
#[command(name = "reelspin", version, about = "Spin a row-stacked slot machine")]
struct Cli {
    /// Number of reels stacked vertically.
    #[arg(long)]
    reels: Option<u32>,
    /// Visible symbols per reel.
    #[arg(long)]
    symbols: Option<u32>,
    /// Edge length of a symbol cell in pixels.
    #[arg(long)]
    cell_size: Option<f32>,
    /// Seed for filler symbols and stop grids; omit for entropy.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file with `[machine]` and `[tuning]` sections.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run one spin without a window, printing the landed grid.
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u32>,
    /// Synchronise presentation with the display refresh rate.
    #[arg(long, overrides_with = "no_vsync")]
    vsync: bool,
    /// Render as fast as possible.
    #[arg(long = "no-vsync", overrides_with = "vsync")]
    no_vsync: bool,
    /// Log frame timing once per second.
    #[arg(long)]
    show_fps: bool,
    /// Draw flat colored tiles instead of loading textures.
    #[arg(long)]
    no_sprites: bool,
    /// Texture manifest mapping symbol texture names to files.
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,
    /// Enable debug logging unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> MachineOverrides {
        MachineOverrides {
            reels: self.reels,
            symbols: self.symbols,
            cell_size: self.cell_size,
            seed: self.seed,
            manifest: self.manifest.clone(),
            ..MachineOverrides::default()
        }
    }

    fn vsync(&self) -> Option<bool> {
        match (self.vsync, self.no_vsync) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Entry point for the Reelspin command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let overrides = cli.overrides().or(file.machine);
    let manifest = match &overrides.manifest {
        Some(path) => TextureManifest::load(path)?,
        None => TextureManifest::empty(),
    };
    let settings = overrides.into_settings(file.tuning)?;
    debug!("machine settings: {settings:?}");

    let frame_rate = settings.tuning.frame_rate;
    let mut machine =
        SlotMachine::new(settings, manifest).context("failed to build slot machine")?;

    if let Some(frames) = cli.headless {
        return run_headless(&mut machine, frames, frame_rate);
    }

    let presentation = Presentation::new(
        "Reelspin",
        Color::from_rgb_u8(18, 24, 38),
        machine.scene(),
    );
    let mut backend = MacroquadBackend::default()
        .with_show_fps(cli.show_fps)
        .with_texture_loading(!cli.no_sprites);
    if let Some(enabled) = cli.vsync() {
        backend = backend.with_vsync(enabled);
    }

    backend.run(presentation, move |elapsed, input, scene| {
        if input.spin_requested {
            let _ = machine.request_spin();
        }
        machine.advance(elapsed);
        machine.refresh_scene(scene);
    })
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run_headless(machine: &mut SlotMachine, frames: u32, frame_rate: f32) -> Result<()> {
    let frame = Duration::from_secs_f32(1.0 / frame_rate);
    let _ = machine.request_spin();

    for elapsed in 1..=frames {
        machine.advance(frame);
        if machine.is_ready() {
            info!("reels settled after {elapsed} frames");
            break;
        }
    }

    let Some(grid) = machine.landed_grid() else {
        bail!("reels were still spinning after {frames} frames");
    };
    println!("{grid}");
    Ok(())
}
