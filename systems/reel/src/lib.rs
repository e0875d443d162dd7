#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven reel system that spins, stops and settles a strip of symbol tiles.
//!
//! A [`Reel`] owns `symbol_count + 1` tiles laid out left to right; the extra
//! tile sits just beyond the visible window so tiles can wrap from the left
//! edge to the right edge without becoming visible. Each call to
//! [`Reel::update`] scrolls the strip left. Once a stop is requested, every tile
//! that wraps receives the next queued stop symbol, and as soon as every tile
//! carries its final symbol the strip eases onto the grid and comes to rest.

mod grid;
mod settle;
mod symbols;

use std::{collections::VecDeque, mem};

use log::{debug, trace, warn};
use reelspin_core::{
    ConfigError, ReelConfig, ReelPhase, ReelTuning, StopSpinError, SymbolId, TileIndex,
    TileSurface,
};

pub use settle::ease_out_cubic;
pub use symbols::{RandomSymbols, ScriptedSymbols, SymbolSource};

use self::settle::SettleTween;

/// Single symbol slot on the reel strip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub(crate) index: TileIndex,
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) symbol: SymbolId,
    pub(crate) size: f32,
}

impl Tile {
    /// Permanent index of the tile within the reel's collection.
    #[must_use]
    pub const fn index(&self) -> TileIndex {
        self.index
    }

    /// Horizontal center of the tile.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical center of the tile.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Symbol currently shown by the tile.
    #[must_use]
    pub const fn symbol(&self) -> SymbolId {
        self.symbol
    }

    /// Width and height of the tile; always the reel's cell size.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Horizontal coordinate of the tile's left edge.
    #[must_use]
    pub fn left_edge(&self) -> f32 {
        self.x - self.size * 0.5
    }
}

#[derive(Clone, Debug, PartialEq)]
struct StopPlan {
    sequence: Vec<SymbolId>,
    queue: VecDeque<SymbolId>,
    injected: u32,
}

impl StopPlan {
    fn new(sequence: Vec<SymbolId>) -> Self {
        Self {
            queue: sequence.iter().copied().collect(),
            sequence,
            injected: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Motion {
    Idle,
    Spinning { speed: f32 },
    SlowingDown { speed: f32, plan: StopPlan },
    Settling(SettleTween),
}

/// Animated strip of symbol tiles driven once per frame.
#[derive(Debug)]
pub struct Reel<S, R> {
    config: ReelConfig,
    tuning: ReelTuning,
    tiles: Vec<Tile>,
    motion: Motion,
    surface: S,
    symbols: R,
}

impl<S, R> Reel<S, R>
where
    S: TileSurface,
    R: SymbolSource,
{
    /// Creates a resting reel using the default motion tuning.
    ///
    /// Tiles receive symbols drawn from `symbols` and are placed on their
    /// canonical cell centers; `surface` receives one visual per tile.
    #[must_use]
    pub fn new(config: ReelConfig, surface: S, symbols: R) -> Self {
        Self::build(config, ReelTuning::default(), surface, symbols)
    }

    /// Creates a resting reel using custom motion tuning.
    ///
    /// Returns an error when the tuning fails validation or when the fastest
    /// frame would carry a tile further than the whole strip is long.
    pub fn with_tuning(
        config: ReelConfig,
        tuning: ReelTuning,
        surface: S,
        symbols: R,
    ) -> Result<Self, ConfigError> {
        tuning.validate()?;

        let (field, fastest) = if tuning.spin_speed >= tuning.min_injection_speed {
            ("spin_speed", tuning.spin_speed)
        } else {
            ("min_injection_speed", tuning.min_injection_speed)
        };
        if fastest * tuning.max_frame_delta > config.tile_count() as f32 {
            return Err(ConfigError::InvalidTuning {
                field,
                value: fastest,
            });
        }

        Ok(Self::build(config, tuning, surface, symbols))
    }

    fn build(config: ReelConfig, tuning: ReelTuning, mut surface: S, mut symbols: R) -> Self {
        let palette = config.palette();
        let size = config.cell_size();
        let y = config.row_center();

        let tiles = (0..config.tile_count())
            .map(|slot| {
                let index = TileIndex::new(slot);
                let symbol = symbols.next_symbol(palette);
                let x = config.slot_center(slot);
                surface.create_tile(index, symbol, size);
                surface.set_position(index, x, y);
                Tile {
                    index,
                    x,
                    y,
                    symbol,
                    size,
                }
            })
            .collect();

        Self {
            config,
            tuning,
            tiles,
            motion: Motion::Idle,
            surface,
            symbols,
        }
    }

    /// Starts scrolling at the nominal spin speed.
    ///
    /// Any stop cycle in flight is abandoned, including queued stop symbols
    /// and a partially completed settle.
    pub fn start_spin(&mut self) {
        let previous = self.phase();
        self.motion = Motion::Spinning {
            speed: self.tuning.spin_speed,
        };
        debug!("reel {previous} -> spinning");
    }

    /// Schedules a stop on `targets`, read left to right.
    ///
    /// One random symbol is appended for the hidden buffer tile. The request is
    /// rejected without side effects when the reel is not spinning, when the
    /// number of targets differs from the visible cell count, or when a target
    /// lies outside the palette.
    pub fn stop_spin(&mut self, targets: &[SymbolId]) -> Result<(), StopSpinError> {
        let speed = match self.validate_stop(targets) {
            Ok(speed) => speed,
            Err(error) => {
                warn!("rejected stop request: {error}");
                return Err(error);
            }
        };

        let mut sequence = Vec::with_capacity(self.tiles.len());
        sequence.extend_from_slice(targets);
        sequence.push(self.symbols.next_symbol(self.config.palette()));
        debug!("reel spinning -> slowing down, stop sequence {sequence:?}");

        self.motion = Motion::SlowingDown {
            speed,
            plan: StopPlan::new(sequence),
        };
        Ok(())
    }

    /// Checks a stop request and returns the current spin speed.
    fn validate_stop(&self, targets: &[SymbolId]) -> Result<f32, StopSpinError> {
        let Motion::Spinning { speed } = self.motion else {
            return Err(StopSpinError::NotSpinning {
                phase: self.phase(),
            });
        };

        let expected = self.config.symbol_count();
        if targets.len() != expected as usize {
            return Err(StopSpinError::LengthMismatch {
                expected,
                received: targets.len(),
            });
        }

        let palette = self.config.palette();
        if let Some(&symbol) = targets.iter().find(|symbol| !palette.contains(**symbol)) {
            return Err(StopSpinError::UnknownSymbol {
                symbol,
                palette_len: palette.len(),
            });
        }

        Ok(speed)
    }

    /// Advances the animation by one frame.
    ///
    /// `delta` is the frame time relative to the reference frame rate: `1.0`
    /// for a nominal frame, larger on slow frames. Deltas above the tuning's
    /// `max_frame_delta` are clamped; non-positive or non-finite deltas are
    /// ignored.
    pub fn update(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            trace!("ignoring frame delta {delta}");
            return;
        }
        let delta = delta.min(self.tuning.max_frame_delta);

        self.motion = match mem::replace(&mut self.motion, Motion::Idle) {
            Motion::Idle => Motion::Idle,
            Motion::Spinning { speed } => {
                self.spin_frame(speed, delta);
                Motion::Spinning { speed }
            }
            Motion::SlowingDown { speed, plan } => self.slow_down_frame(speed, plan, delta),
            Motion::Settling(tween) => self.settle_frame(tween, delta),
        };
    }

    fn spin_frame(&mut self, speed: f32, delta: f32) {
        let mut rightmost = self.translate(speed * self.config.cell_size() * delta);
        let palette = self.config.palette();

        for index in self.wrapping_tiles() {
            rightmost += self.config.cell_size();
            self.tiles[index].x = rightmost;
            let symbol = self.symbols.next_symbol(palette);
            self.assign_symbol(index, symbol);
        }

        self.sync_positions();
    }

    fn slow_down_frame(&mut self, speed: f32, mut plan: StopPlan, delta: f32) -> Motion {
        let mut rightmost = self.translate(speed * self.config.cell_size() * delta);
        let tile_count = self.config.tile_count();

        for index in self.wrapping_tiles() {
            rightmost += self.config.cell_size();
            self.tiles[index].x = rightmost;

            let Some(symbol) = plan.queue.pop_front() else {
                continue;
            };
            self.assign_symbol(index, symbol);
            plan.injected += 1;
            trace!(
                "injected symbol {symbol} into tile {} ({}/{tile_count})",
                index,
                plan.injected
            );

            if plan.injected >= tile_count {
                self.sync_positions();
                return self.begin_settle(plan.sequence);
            }
        }

        self.sync_positions();

        if !plan.queue.is_empty() {
            return Motion::SlowingDown {
                speed: speed.max(self.tuning.min_injection_speed),
                plan,
            };
        }

        let speed = speed * self.tuning.slowdown_rate;
        if speed < self.tuning.stop_threshold {
            debug!("reel slowed to a halt without settling; snapping to grid");
            self.snap_to_grid();
            return Motion::Idle;
        }
        Motion::SlowingDown { speed, plan }
    }

    fn begin_settle(&mut self, sequence: Vec<SymbolId>) -> Motion {
        let anchor = sequence
            .first()
            .and_then(|&lead| grid::leftmost_with_symbol(&self.tiles, lead));

        let Some(anchor) = anchor else {
            warn!(
                "no tile carries the leading stop symbol of {sequence:?}; snapping without settle"
            );
            self.snap_to_grid();
            return Motion::Idle;
        };

        let start_x = self.tiles[anchor].x;
        let target_x = self.config.slot_center(0);
        debug!("reel slowing down -> settling, anchor tile {anchor} from x={start_x}");

        Motion::Settling(SettleTween::new(
            anchor,
            start_x,
            target_x,
            self.tuning.settle_duration_ms,
            sequence,
        ))
    }

    fn settle_frame(&mut self, mut tween: SettleTween, delta: f32) -> Motion {
        let progress = tween.advance(delta * self.tuning.frame_millis());
        let shift = tween.anchor_x_at(progress) - self.tiles[tween.anchor()].x;
        for tile in &mut self.tiles {
            tile.x += shift;
        }

        if progress < 1.0 {
            self.sync_positions();
            return Motion::Settling(tween);
        }

        self.snap_to_grid();
        let landed = grid::symbols_in_strip_order(&self.tiles);
        if landed.as_slice() != tween.sequence() {
            warn!(
                "reel settled on {landed:?} but the stop sequence was {:?}",
                tween.sequence()
            );
        }
        debug!("reel settling -> idle on {landed:?}");
        Motion::Idle
    }

    /// Shifts every tile left by `distance` and returns the rightmost x afterwards.
    fn translate(&mut self, distance: f32) -> f32 {
        let mut rightmost = f32::NEG_INFINITY;
        for tile in &mut self.tiles {
            tile.x -= distance;
            rightmost = rightmost.max(tile.x);
        }
        rightmost
    }

    /// Tiles whose left edge crossed one cell past the window's left edge, in strip order.
    fn wrapping_tiles(&self) -> Vec<usize> {
        let boundary = -self.config.cell_size();
        grid::strip_order(&self.tiles)
            .into_iter()
            .take_while(|&index| self.tiles[index].left_edge() < boundary)
            .collect()
    }

    fn assign_symbol(&mut self, index: usize, symbol: SymbolId) {
        let tile = &mut self.tiles[index];
        tile.symbol = symbol;
        self.surface.set_symbol(tile.index, symbol);
    }

    fn snap_to_grid(&mut self) {
        grid::snap_to_grid(&mut self.tiles, &self.config);
        self.sync_positions();
    }

    fn sync_positions(&mut self) {
        for tile in &self.tiles {
            self.surface.set_position(tile.index, tile.x, tile.y);
        }
    }

    /// Replaces the symbol shown by `tile`, returning the previous symbol.
    ///
    /// Returns `None` without side effects when the index does not belong to
    /// this reel.
    pub fn set_tile_symbol(&mut self, tile: TileIndex, symbol: SymbolId) -> Option<SymbolId> {
        let index = tile.as_usize();
        let previous = self.tiles.get(index)?.symbol;
        self.assign_symbol(index, symbol);
        Some(previous)
    }

    /// Releases every tile visual and hands the surface back to the caller.
    #[must_use]
    pub fn teardown(mut self) -> S {
        for tile in &self.tiles {
            self.surface.release_tile(tile.index);
        }
        self.surface
    }
}

impl<S, R> Reel<S, R> {
    /// Tiles in collection order; sort by [`Tile::x`] for strip order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Current phase of the reel.
    #[must_use]
    pub fn phase(&self) -> ReelPhase {
        match self.motion {
            Motion::Idle => ReelPhase::Idle,
            Motion::Spinning { .. } => ReelPhase::Spinning,
            Motion::SlowingDown { .. } => ReelPhase::SlowingDown,
            Motion::Settling(_) => ReelPhase::Settling,
        }
    }

    /// Current scroll speed in cells per reference frame.
    #[must_use]
    pub fn speed(&self) -> f32 {
        match &self.motion {
            Motion::Spinning { speed } | Motion::SlowingDown { speed, .. } => *speed,
            Motion::Idle | Motion::Settling(_) => 0.0,
        }
    }

    /// Stop sequence of the active stop cycle, hidden symbol last.
    #[must_use]
    pub fn stop_sequence(&self) -> Option<&[SymbolId]> {
        match &self.motion {
            Motion::SlowingDown { plan, .. } => Some(&plan.sequence),
            Motion::Settling(tween) => Some(tween.sequence()),
            Motion::Idle | Motion::Spinning { .. } => None,
        }
    }

    /// Number of stop symbols already injected during the active stop cycle.
    #[must_use]
    pub fn injected_count(&self) -> u32 {
        match &self.motion {
            Motion::SlowingDown { plan, .. } => plan.injected,
            Motion::Settling(_) => self.config.tile_count(),
            Motion::Idle | Motion::Spinning { .. } => 0,
        }
    }

    /// Visible symbols read left to right, available only while the reel rests.
    #[must_use]
    pub fn landed_symbols(&self) -> Option<Vec<SymbolId>> {
        if !matches!(self.motion, Motion::Idle) {
            return None;
        }
        let mut symbols = grid::symbols_in_strip_order(&self.tiles);
        symbols.truncate(self.config.symbol_count() as usize);
        Some(symbols)
    }

    /// Geometry the reel was built with.
    #[must_use]
    pub fn config(&self) -> &ReelConfig {
        &self.config
    }

    /// Motion tuning in effect.
    #[must_use]
    pub fn tuning(&self) -> &ReelTuning {
        &self.tuning
    }

    /// Visual collaborator receiving tile updates.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }
}
