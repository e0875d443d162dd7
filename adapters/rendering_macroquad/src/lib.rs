#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Reelspin.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! Each reel is drawn inside a masked window: tiles that straddle the window
//! edge are cropped so only the visible cells appear. The spin button lives in
//! the local `ui` module to avoid leaking Macroquad UI types throughout the
//! renderer.

mod textures;
mod ui;

use self::{
    textures::TextureCache,
    ui::{draw_spin_button_ui, SpinButtonUiContext, SpinButtonUiResult},
};
use anyhow::Result;
use glam::Vec2;
use log::info;
use macroquad::{
    color::{Color as MacroquadColor, WHITE},
    input::{is_key_pressed, KeyCode},
    math::{Rect, Vec2 as MacroquadVec2},
    shapes::{draw_rectangle, draw_rectangle_lines},
    text::draw_text,
    texture::{draw_texture_ex, DrawTextureParams},
};
use reelspin_rendering::{
    symbol_color, Color, FrameInput, Presentation, ReelPresentation, RenderingBackend, Scene,
    TilePresentation,
};
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const SCREEN_PADDING: f32 = 24.0;
const BUTTON_GAP: f32 = 24.0;
const BUTTON_SIZE: Vec2 = Vec2::new(220.0, 72.0);

/// Tracks spin-button clicks so they can be merged with keyboard input on the next frame.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinButtonLatch {
    spin_latched: bool,
}

impl SpinButtonLatch {
    /// Returns whether the button requested a spin and clears the latch so the
    /// request fires only once.
    pub fn take_spin(&mut self) -> bool {
        let latched = self.spin_latched;
        self.spin_latched = false;
        latched
    }

    /// Records that the spin button was clicked this frame.
    pub fn register_spin(&mut self) {
        self.spin_latched = true;
    }
}

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the loop.
    quit_requested: bool,
    /// `Space` or `Enter` to spin.
    spin_requested: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            spin_requested: is_key_pressed(KeyCode::Space) || is_key_pressed(KeyCode::Enter),
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    load_textures: bool,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            load_textures: true,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Configures whether symbol textures are loaded from disk.
    ///
    /// When disabled every tile is drawn as a flat colored square.
    #[must_use]
    pub fn with_texture_loading(mut self, enabled: bool) -> Self {
        self.load_textures = enabled;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameBreakdown {
    frame: Duration,
    update: Duration,
    render: Duration,
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    frame_times: VecDeque<Duration>,
    window_duration: Duration,
    update_accum: Duration,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    trailing_ten_seconds: f32,
    avg_update: Duration,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second and trailing ten-second averages once
    /// one second has elapsed.
    fn record_frame(&mut self, breakdown: FrameBreakdown) -> Option<FpsMetrics> {
        self.elapsed += breakdown.frame;
        self.frames = self.frames.saturating_add(1);
        self.update_accum += breakdown.update;
        self.render_accum += breakdown.render;

        self.frame_times.push_back(breakdown.frame);
        self.window_duration += breakdown.frame;

        let trailing_window = Duration::from_secs(10);
        while self.window_duration > trailing_window {
            if let Some(removed) = self.frame_times.pop_front() {
                self.window_duration = self.window_duration.saturating_sub(removed);
            } else {
                break;
            }
        }

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames.max(1);
        let per_second = self.frames as f32 / seconds;
        let window_seconds = self.window_duration.as_secs_f32();
        let trailing_ten_seconds = if window_seconds <= f32::EPSILON {
            per_second
        } else {
            self.frame_times.len() as f32 / window_seconds
        };
        let metrics = FpsMetrics {
            per_second,
            trailing_ten_seconds,
            avg_update: self.update_accum / frames,
            avg_render: self.render_accum / frames,
        };

        self.elapsed = Duration::ZERO;
        self.frames = 0;
        self.update_accum = Duration::ZERO;
        self.render_accum = Duration::ZERO;
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            load_textures,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let world = world_size(&scene);
        let mut config = macroquad::window::Conf {
            window_title,
            window_width: (world.x + SCREEN_PADDING * 2.0).ceil() as i32,
            window_height: (world.y + SCREEN_PADDING * 2.0).ceil() as i32,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let mut texture_cache = TextureCache::new(load_textures);
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();
            let mut spin_button = SpinButtonLatch::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                macroquad::window::clear_background(background);

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let frame_input = FrameInput {
                    spin_requested: spin_button.take_spin() || keyboard.spin_requested,
                };

                let update_start = Instant::now();
                update_scene(frame_dt, frame_input, &mut scene);
                let update_duration = update_start.elapsed();

                let metrics = SceneMetrics::from_scene(
                    &scene,
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );

                let render_start = Instant::now();
                draw_backdrop(&scene, &metrics);
                for reel in &scene.reels {
                    draw_reel(reel, &metrics, &mut texture_cache);
                }

                let mut button_ui = macroquad::ui::root_ui();
                let SpinButtonUiResult { pressed } = draw_spin_button_ui(
                    &mut button_ui,
                    SpinButtonUiContext {
                        origin: to_macroquad_vec(metrics.button_origin),
                        size: to_macroquad_vec(metrics.button_size),
                        enabled: scene.spin_button.enabled,
                    },
                );
                drop(button_ui);
                if pressed {
                    spin_button.register_spin();
                }
                let render_duration = render_start.elapsed();

                let fps_metrics = fps_counter.record_frame(FrameBreakdown {
                    frame: frame_dt,
                    update: update_duration,
                    render: render_duration,
                });
                if show_fps {
                    if let Some(FpsMetrics {
                        per_second,
                        trailing_ten_seconds,
                        avg_update,
                        avg_render,
                    }) = fps_metrics
                    {
                        info!(
                            "FPS: {:.2} (10s avg: {:.2}) | update: {:>6.2}ms render: {:>6.2}ms",
                            per_second,
                            trailing_ten_seconds,
                            avg_update.as_secs_f64() * 1_000.0,
                            avg_render.as_secs_f64() * 1_000.0,
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Unscaled size of everything the backend draws: the reel backdrop plus the
/// spin button row.
fn world_size(scene: &Scene) -> Vec2 {
    let extent = scene.reel_extent() + Vec2::splat(scene.backdrop_margin * 2.0);
    Vec2::new(
        extent.x.max(BUTTON_SIZE.x),
        extent.y + BUTTON_GAP + BUTTON_SIZE.y,
    )
}

/// Mapping from scene units to screen pixels for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    scale: f32,
    origin: Vec2,
    backdrop_size: Vec2,
    button_origin: Vec2,
    button_size: Vec2,
}

impl SceneMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        let world = world_size(scene);
        let available = Vec2::new(
            (screen_width - SCREEN_PADDING * 2.0).max(1.0),
            (screen_height - SCREEN_PADDING * 2.0).max(1.0),
        );
        let scale = if world.x <= f32::EPSILON || world.y <= f32::EPSILON {
            1.0
        } else {
            (available.x / world.x).min(available.y / world.y)
        };

        let drawn = world * scale;
        let top_left = Vec2::new(
            (screen_width - drawn.x) * 0.5,
            (screen_height - drawn.y) * 0.5,
        );
        let backdrop_size =
            (scene.reel_extent() + Vec2::splat(scene.backdrop_margin * 2.0)) * scale;
        let origin = top_left
            + Vec2::new((drawn.x - backdrop_size.x) * 0.5, 0.0)
            + Vec2::splat(scene.backdrop_margin * scale);
        let button_size = BUTTON_SIZE * scale;
        let button_origin = Vec2::new(
            (screen_width - button_size.x) * 0.5,
            top_left.y + backdrop_size.y + BUTTON_GAP * scale,
        );

        Self {
            scale,
            origin,
            backdrop_size,
            button_origin,
            button_size,
        }
    }

    fn to_screen(&self, point: Vec2) -> Vec2 {
        self.origin + point * self.scale
    }
}

/// Screen-space rectangle of the visible part of a tile plus the matching
/// horizontal texture range, expressed as fractions of the texture width.
#[derive(Clone, Copy, Debug, PartialEq)]
struct MaskedTile {
    position: Vec2,
    size: Vec2,
    u_start: f32,
    u_end: f32,
}

fn mask_tile(
    reel: &ReelPresentation,
    tile: &TilePresentation,
    metrics: &SceneMetrics,
) -> Option<MaskedTile> {
    let (start, end) = reel.visible_span(tile)?;
    let left = tile.center.x - tile.size * 0.5;
    let top = tile.center.y - tile.size * 0.5;

    let position = metrics.to_screen(reel.origin + Vec2::new(start, top));
    let size = Vec2::new(end - start, tile.size) * metrics.scale;
    let u_start = ((start - left) / tile.size).clamp(0.0, 1.0);
    let u_end = ((end - left) / tile.size).clamp(0.0, 1.0);

    Some(MaskedTile {
        position,
        size,
        u_start,
        u_end,
    })
}

fn draw_backdrop(scene: &Scene, metrics: &SceneMetrics) {
    let margin = scene.backdrop_margin * metrics.scale;
    draw_rectangle(
        metrics.origin.x - margin,
        metrics.origin.y - margin,
        metrics.backdrop_size.x,
        metrics.backdrop_size.y,
        to_macroquad_color(scene.backdrop),
    );
}

fn draw_reel(reel: &ReelPresentation, metrics: &SceneMetrics, textures: &mut TextureCache) {
    for tile in &reel.tiles {
        let Some(masked) = mask_tile(reel, tile, metrics) else {
            continue;
        };

        match textures.texture(&tile.texture) {
            Some(texture) => {
                let texture_width = texture.width();
                let source = Rect::new(
                    masked.u_start * texture_width,
                    0.0,
                    (masked.u_end - masked.u_start) * texture_width,
                    texture.height(),
                );
                draw_texture_ex(
                    texture,
                    masked.position.x,
                    masked.position.y,
                    WHITE,
                    DrawTextureParams {
                        dest_size: Some(to_macroquad_vec(masked.size)),
                        source: Some(source),
                        ..DrawTextureParams::default()
                    },
                );
            }
            None => draw_flat_tile(tile, &masked, metrics),
        }
    }
}

fn draw_flat_tile(tile: &TilePresentation, masked: &MaskedTile, metrics: &SceneMetrics) {
    let inset = 4.0 * metrics.scale;
    let color = symbol_color(tile.symbol);
    draw_rectangle(
        masked.position.x,
        masked.position.y + inset,
        masked.size.x,
        (masked.size.y - inset * 2.0).max(0.0),
        to_macroquad_color(color),
    );
    draw_rectangle_lines(
        masked.position.x,
        masked.position.y + inset,
        masked.size.x,
        (masked.size.y - inset * 2.0).max(0.0),
        2.0,
        to_macroquad_color(color.lighten(0.4)),
    );

    if masked.u_start <= 0.25 && masked.u_end >= 0.75 {
        let font_size = tile.size * metrics.scale * 0.4;
        let label = (tile.symbol.get() + 1).to_string();
        let visible = masked.u_end - masked.u_start;
        let center = masked.position.x + masked.size.x * (0.5 - masked.u_start) / visible;
        draw_text(
            &label,
            center - font_size * 0.25,
            masked.position.y + masked.size.y * 0.5 + font_size * 0.3,
            font_size,
            WHITE,
        );
    }
}

fn to_macroquad_vec(vector: Vec2) -> MacroquadVec2 {
    MacroquadVec2::new(vector.x, vector.y)
}

fn to_macroquad_color(color: Color) -> MacroquadColor {
    MacroquadColor::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelspin_core::{SymbolId, TileIndex};
    use reelspin_rendering::{SpinButtonPresentation, SymbolTexture, TextureSource};
    use std::path::PathBuf;

    fn tile(x: f32) -> TilePresentation {
        TilePresentation {
            tile: TileIndex::new(0),
            center: Vec2::new(x, 50.0),
            size: 100.0,
            symbol: SymbolId::new(2),
            texture: SymbolTexture {
                name: "symbol3.png".to_string(),
                path: PathBuf::from("assets/images/symbol3.png"),
                source: TextureSource::Fallback,
            },
        }
    }

    fn scene(reels: usize) -> Scene {
        let reels = (0..reels)
            .map(|row| ReelPresentation {
                origin: Vec2::new(0.0, row as f32 * 110.0),
                window: Vec2::new(300.0, 100.0),
                tiles: Vec::new(),
            })
            .collect();
        Scene::new(
            reels,
            Color::new(0.0, 0.0, 0.0, 0.5),
            20.0,
            SpinButtonPresentation { enabled: true },
        )
    }

    #[test]
    fn world_size_includes_backdrop_margin_and_button_row() {
        let size = world_size(&scene(2));
        assert_eq!(size, Vec2::new(340.0, 250.0 + BUTTON_GAP + BUTTON_SIZE.y));
    }

    #[test]
    fn metrics_scale_the_scene_to_fit_the_screen() {
        let scene = scene(2);
        let world = world_size(&scene);
        let screen = (world + Vec2::splat(SCREEN_PADDING * 2.0)) * 2.0;
        let metrics = SceneMetrics::from_scene(&scene, screen.x, screen.y);

        assert!(metrics.scale > 1.9);
        assert!(metrics.origin.x > 0.0 && metrics.origin.y > 0.0);
        assert!(metrics.button_origin.y > metrics.origin.y + 210.0 * metrics.scale);
    }

    #[test]
    fn masking_crops_tiles_at_the_window_edges() {
        let scene = scene(1);
        let reel = &scene.reels[0];
        let metrics = SceneMetrics {
            scale: 1.0,
            origin: Vec2::ZERO,
            backdrop_size: Vec2::ZERO,
            button_origin: Vec2::ZERO,
            button_size: Vec2::ZERO,
        };

        let inside = mask_tile(reel, &tile(150.0), &metrics).expect("fully visible");
        assert_eq!(inside.position, Vec2::new(100.0, 0.0));
        assert_eq!(inside.size, Vec2::new(100.0, 100.0));
        assert_eq!((inside.u_start, inside.u_end), (0.0, 1.0));

        let entering = mask_tile(reel, &tile(-20.0), &metrics).expect("partly visible");
        assert_eq!(entering.position, Vec2::new(0.0, 0.0));
        assert_eq!(entering.size.x, 30.0);
        assert!((entering.u_start - 0.7).abs() < 1e-6);
        assert_eq!(entering.u_end, 1.0);

        let leaving = mask_tile(reel, &tile(275.0), &metrics).expect("partly visible");
        assert_eq!(leaving.size.x, 75.0);
        assert_eq!(leaving.u_end, 0.75);

        assert!(mask_tile(reel, &tile(350.0), &metrics).is_none());
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        let frame = FrameBreakdown {
            frame: Duration::from_millis(250),
            update: Duration::from_millis(2),
            render: Duration::from_millis(4),
        };

        for _ in 0..3 {
            assert!(counter.record_frame(frame).is_none());
        }
        let metrics = counter.record_frame(frame).expect("one second elapsed");
        assert!((metrics.per_second - 4.0).abs() < 1e-3);
        assert_eq!(metrics.avg_update, Duration::from_millis(2));
        assert_eq!(metrics.avg_render, Duration::from_millis(4));
        assert!(counter.record_frame(frame).is_none());
    }

    #[test]
    fn spin_latch_fires_once() {
        let mut latch = SpinButtonLatch::default();
        assert!(!latch.take_spin());
        latch.register_spin();
        assert!(latch.take_spin());
        assert!(!latch.take_spin());
    }
}
