//! Multi-reel slot machine driving staggered spins and stops.

use std::{fmt, time::Duration};

use anyhow::{ensure, Result};
use glam::Vec2;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use reelspin_core::{ReelConfig, ReelTuning, SymbolId, SymbolPalette};
use reelspin_rendering::{
    Color, ReelPresentation, Scene, SceneSurface, SpinButtonPresentation, SymbolSkin,
    TextureManifest,
};
use reelspin_system_reel::{RandomSymbols, Reel};

/// Delays between the steps of a spin cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MachineTiming {
    /// Gap between consecutive reels starting to spin.
    pub(crate) start_stagger: Duration,
    /// Pause after the last reel starts before stops are requested.
    pub(crate) stop_delay: Duration,
    /// Gap between consecutive reels receiving their stop symbols.
    pub(crate) stop_stagger: Duration,
}

impl Default for MachineTiming {
    fn default() -> Self {
        Self {
            start_stagger: Duration::from_millis(200),
            stop_delay: Duration::from_millis(500),
            stop_stagger: Duration::from_millis(400),
        }
    }
}

/// Layout, timing and tuning of a slot machine.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MachineSettings {
    pub(crate) reels: u32,
    pub(crate) symbols_per_reel: u32,
    pub(crate) palette: SymbolPalette,
    pub(crate) cell_size: f32,
    pub(crate) reel_spacing: f32,
    pub(crate) timing: MachineTiming,
    pub(crate) tuning: ReelTuning,
    pub(crate) seed: Option<u64>,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            reels: 4,
            symbols_per_reel: 6,
            palette: SymbolPalette::default(),
            cell_size: 150.0,
            reel_spacing: 10.0,
            timing: MachineTiming::default(),
            tuning: ReelTuning::default(),
            seed: None,
        }
    }
}

impl MachineSettings {
    /// Vertical distance between the tops of consecutive reels.
    fn row_pitch(&self) -> f32 {
        self.cell_size + self.reel_spacing
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Command {
    Start { reel: usize },
    RequestStops,
    Stop { reel: usize, symbols: Vec<SymbolId> },
}

#[derive(Clone, Debug, PartialEq)]
struct Scheduled {
    at: Duration,
    command: Command,
}

/// Symbols shown by every reel, one row per reel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SymbolGrid(Vec<Vec<SymbolId>>);

impl SymbolGrid {
    /// Rows of the grid, top reel first.
    pub(crate) fn rows(&self) -> &[Vec<SymbolId>] {
        &self.0
    }
}

impl fmt::Display for SymbolGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            write!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Slot machine made of vertically stacked reels that spin together.
///
/// A spin starts the reels one after another, requests a random stop grid once
/// every reel is moving and hands each reel its row with a growing delay. The
/// machine accepts a new spin once every reel rests again.
#[derive(Debug)]
pub(crate) struct SlotMachine {
    settings: MachineSettings,
    reels: Vec<Reel<SceneSurface, RandomSymbols>>,
    stops: ChaCha8Rng,
    clock: Duration,
    schedule: Vec<Scheduled>,
    spinning: bool,
    requested: Option<SymbolGrid>,
    landed: Option<SymbolGrid>,
}

impl SlotMachine {
    /// Builds a resting machine whose tiles resolve textures via `manifest`.
    pub(crate) fn new(settings: MachineSettings, manifest: TextureManifest) -> Result<Self> {
        ensure!(settings.reels > 0, "a slot machine needs at least one reel");
        ensure!(
            settings.reel_spacing.is_finite() && settings.reel_spacing >= 0.0,
            "reel spacing must be a non-negative number (received {})",
            settings.reel_spacing
        );

        let config = ReelConfig::new(settings.symbols_per_reel, settings.cell_size)?
            .with_palette(settings.palette);
        let skin = SymbolSkin::new(settings.palette, manifest);

        let reels = (0..settings.reels)
            .map(|index| {
                let symbols = match settings.seed {
                    Some(seed) => RandomSymbols::seeded(seed.wrapping_add(u64::from(index) + 1)),
                    None => RandomSymbols::from_entropy(),
                };
                Reel::with_tuning(
                    config,
                    settings.tuning,
                    SceneSurface::new(skin.clone()),
                    symbols,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stops = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            settings,
            reels,
            stops,
            clock: Duration::ZERO,
            schedule: Vec::new(),
            spinning: false,
            requested: None,
            landed: None,
        })
    }

    /// Starts a spin cycle. Returns `false` when a cycle is already running.
    pub(crate) fn request_spin(&mut self) -> bool {
        if self.spinning {
            debug!("spin request ignored while reels are busy");
            return false;
        }

        self.spinning = true;
        self.landed = None;
        self.requested = None;

        let timing = self.settings.timing;
        for reel in 0..self.reels.len() {
            self.schedule_in(timing.start_stagger * reel as u32, Command::Start { reel });
        }
        let last_start = timing.start_stagger * (self.reels.len() as u32 - 1);
        self.schedule_in(last_start + timing.stop_delay, Command::RequestStops);
        info!("spinning {} reels", self.reels.len());
        true
    }

    /// Advances the machine clock by `elapsed` and animates every reel.
    pub(crate) fn advance(&mut self, elapsed: Duration) {
        self.clock += elapsed;
        self.run_due_commands();

        let delta = self.settings.tuning.delta_from(elapsed);
        for reel in &mut self.reels {
            reel.update(delta);
        }

        if self.spinning && self.schedule.is_empty() && self.all_idle() {
            self.finish_cycle();
        }
    }

    /// Whether a new spin would be accepted.
    pub(crate) fn is_ready(&self) -> bool {
        !self.spinning
    }

    /// Grid shown after the most recent completed spin.
    pub(crate) fn landed_grid(&self) -> Option<&SymbolGrid> {
        self.landed.as_ref()
    }

    /// Stop grid requested during the current or most recent spin.
    #[cfg(test)]
    fn requested_grid(&self) -> Option<&SymbolGrid> {
        self.requested.as_ref()
    }

    /// Builds a scene describing the current state of every reel.
    pub(crate) fn scene(&self) -> Scene {
        Scene::new(
            self.reel_presentations(),
            Color::new(0.0, 0.0, 0.0, 0.5),
            20.0,
            SpinButtonPresentation {
                enabled: self.is_ready(),
            },
        )
    }

    /// Refreshes `scene` in place with the current reel state.
    pub(crate) fn refresh_scene(&self, scene: &mut Scene) {
        scene.reels = self.reel_presentations();
        scene.spin_button.enabled = self.is_ready();
    }

    fn reel_presentations(&self) -> Vec<ReelPresentation> {
        self.reels
            .iter()
            .enumerate()
            .map(|(row, reel)| {
                let origin = Vec2::new(0.0, row as f32 * self.settings.row_pitch());
                ReelPresentation::capture(origin, reel.config(), reel.surface())
            })
            .collect()
    }

    fn schedule_in(&mut self, delay: Duration, command: Command) {
        self.schedule.push(Scheduled {
            at: self.clock + delay,
            command,
        });
    }

    fn run_due_commands(&mut self) {
        while let Some(position) = self.next_due() {
            let Scheduled { command, .. } = self.schedule.remove(position);
            self.execute(command);
        }
    }

    fn next_due(&self) -> Option<usize> {
        self.schedule
            .iter()
            .enumerate()
            .filter(|(_, scheduled)| scheduled.at <= self.clock)
            .min_by_key(|(_, scheduled)| scheduled.at)
            .map(|(position, _)| position)
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Start { reel } => {
                if let Some(target) = self.reels.get_mut(reel) {
                    target.start_spin();
                }
            }
            Command::RequestStops => {
                let grid = self.random_stop_grid();
                let stagger = self.settings.timing.stop_stagger;
                for (reel, symbols) in grid.rows().iter().enumerate() {
                    self.schedule_in(
                        stagger * reel as u32,
                        Command::Stop {
                            reel,
                            symbols: symbols.clone(),
                        },
                    );
                }
                self.requested = Some(grid);
            }
            Command::Stop { reel, symbols } => {
                if let Some(target) = self.reels.get_mut(reel) {
                    if let Err(error) = target.stop_spin(&symbols) {
                        warn!("reel {reel} ignored its stop symbols: {error}");
                    }
                }
            }
        }
    }

    fn random_stop_grid(&mut self) -> SymbolGrid {
        let kinds = self.settings.palette.len();
        let columns = self.settings.symbols_per_reel;
        let rows = (0..self.reels.len())
            .map(|_| {
                (0..columns)
                    .map(|_| SymbolId::new(self.stops.gen_range(0..kinds)))
                    .collect()
            })
            .collect();
        SymbolGrid(rows)
    }

    fn all_idle(&self) -> bool {
        self.reels.iter().all(|reel| reel.phase().is_idle())
    }

    fn finish_cycle(&mut self) {
        self.spinning = false;
        let rows: Option<Vec<Vec<SymbolId>>> =
            self.reels.iter().map(Reel::landed_symbols).collect();
        let Some(rows) = rows else {
            return;
        };

        let grid = SymbolGrid(rows);
        if self.requested.as_ref() != Some(&grid) {
            warn!("landed grid differs from the requested stops");
        }
        info!("landed grid:\n{grid}");
        self.landed = Some(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelspin_core::ReelPhase;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn seeded(seed: u64) -> SlotMachine {
        let settings = MachineSettings {
            seed: Some(seed),
            ..MachineSettings::default()
        };
        SlotMachine::new(settings, TextureManifest::empty()).expect("valid machine")
    }

    fn run_until_ready(machine: &mut SlotMachine, max_frames: u32) -> u32 {
        for frame in 1..=max_frames {
            machine.advance(FRAME);
            if machine.is_ready() {
                return frame;
            }
        }
        panic!("machine still spinning after {max_frames} frames");
    }

    fn phases(machine: &SlotMachine) -> Vec<ReelPhase> {
        machine.reels.iter().map(Reel::phase).collect()
    }

    #[test]
    fn stock_layout_stacks_four_reels_of_six_cells() {
        let machine = seeded(3);
        let scene = machine.scene();

        assert_eq!(scene.reels.len(), 4);
        for (row, reel) in scene.reels.iter().enumerate() {
            assert_eq!(reel.origin, Vec2::new(0.0, row as f32 * 160.0));
            assert_eq!(reel.window, Vec2::new(900.0, 150.0));
            assert_eq!(reel.tiles.len(), 7);
        }
        assert!(scene.spin_button.enabled);
        assert_eq!(scene.reel_extent(), Vec2::new(900.0, 630.0));
    }

    #[test]
    fn reels_start_one_after_another() {
        let mut machine = seeded(5);
        assert!(machine.request_spin());

        machine.advance(Duration::from_millis(100));
        assert_eq!(
            phases(&machine),
            vec![ReelPhase::Spinning, ReelPhase::Idle, ReelPhase::Idle, ReelPhase::Idle]
        );

        machine.advance(Duration::from_millis(150));
        assert_eq!(
            phases(&machine),
            vec![
                ReelPhase::Spinning,
                ReelPhase::Spinning,
                ReelPhase::Idle,
                ReelPhase::Idle
            ]
        );
    }

    #[test]
    fn spin_requests_are_ignored_until_every_reel_rests() {
        let mut machine = seeded(9);
        assert!(machine.request_spin());
        assert!(!machine.request_spin());
        assert!(!machine.scene().spin_button.enabled);

        let _ = run_until_ready(&mut machine, 600);
        assert!(machine.request_spin());
    }

    #[test]
    fn completed_spin_lands_the_requested_grid() {
        let mut machine = seeded(11);
        assert!(machine.request_spin());
        let frames = run_until_ready(&mut machine, 600);

        // The last reel receives its stop 2.3 seconds into the cycle.
        assert!(frames > 130, "finished after only {frames} frames");

        let landed = machine.landed_grid().expect("grid after landing").clone();
        assert_eq!(Some(&landed), machine.requested_grid());
        assert_eq!(landed.rows().len(), 4);
        assert!(landed.rows().iter().all(|row| row.len() == 6));
        assert!(phases(&machine).iter().all(|phase| phase.is_idle()));

        let config = *machine.reels[0].config();
        for reel in &machine.reels {
            let mut xs: Vec<f32> = reel.tiles().iter().map(|tile| tile.x()).collect();
            xs.sort_by(f32::total_cmp);
            let expected: Vec<f32> = (0..7).map(|slot| config.slot_center(slot)).collect();
            assert_eq!(xs, expected);
        }
    }

    #[test]
    fn same_seed_lands_the_same_grids() {
        let mut first = seeded(21);
        let mut second = seeded(21);

        for _ in 0..2 {
            assert!(first.request_spin());
            assert!(second.request_spin());
            let _ = run_until_ready(&mut first, 600);
            let _ = run_until_ready(&mut second, 600);
            assert_eq!(first.landed_grid(), second.landed_grid());
        }
    }

    #[test]
    fn scene_refresh_tracks_reel_motion() {
        let mut machine = seeded(2);
        let mut scene = machine.scene();
        let before = scene.reels[0].tiles[0].center;

        assert!(machine.request_spin());
        for _ in 0..10 {
            machine.advance(FRAME);
        }
        machine.refresh_scene(&mut scene);

        assert!(scene.reels[0].tiles[0].center.x < before.x);
        assert!(!scene.spin_button.enabled);
    }

    #[test]
    fn grid_display_prints_one_row_per_reel() {
        let grid = SymbolGrid(vec![
            vec![SymbolId::new(0), SymbolId::new(4)],
            vec![SymbolId::new(2), SymbolId::new(1)],
        ]);
        assert_eq!(grid.to_string(), "0 4\n2 1");
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        let no_reels = MachineSettings {
            reels: 0,
            ..MachineSettings::default()
        };
        assert!(SlotMachine::new(no_reels, TextureManifest::empty()).is_err());

        let no_cells = MachineSettings {
            symbols_per_reel: 0,
            ..MachineSettings::default()
        };
        assert!(SlotMachine::new(no_cells, TextureManifest::empty()).is_err());
    }
}
