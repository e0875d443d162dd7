#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Reelspin engine.
//!
//! This crate defines the vocabulary that connects the reel system with the
//! adapters that drive and draw it. The reel system owns the authoritative tile
//! strip and mirrors every visual change onto a [`TileSurface`] supplied by an
//! adapter. Adapters never mutate tiles directly; they request spins and stops
//! and read immutable state back for presentation.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hidden tiles kept beyond the visible window of every reel.
pub const BUFFER_TILES: u32 = 1;

/// Frame rate at which a frame delta of `1.0` represents exactly one frame.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

/// Identifier of a symbol kind within the active [`SymbolPalette`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Creates a new symbol identifier with the provided palette index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the palette index represented by the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a tile within a reel's fixed tile collection.
///
/// Indices are allocated once at construction and stay attached to the same
/// tile for the reel's lifetime, regardless of where the tile currently sits
/// on the strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex(u32);

impl TileIndex {
    /// Creates a new tile index wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying numeric index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index converted for slice access.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Fixed set of symbol kinds a reel may display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolPalette {
    kinds: u32,
}

impl SymbolPalette {
    /// Palette used by the stock machine: five symbol kinds.
    pub const DEFAULT_KINDS: u32 = 5;

    /// Creates a palette holding `kinds` distinct symbols.
    ///
    /// Returns an error when the palette would be empty.
    pub fn new(kinds: u32) -> Result<Self, ConfigError> {
        if kinds == 0 {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(Self { kinds })
    }

    /// Number of symbol kinds in the palette.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.kinds
    }

    /// Reports whether the palette holds no symbols, which [`SymbolPalette::new`] rules out.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kinds == 0
    }

    /// Reports whether the symbol belongs to the palette.
    #[must_use]
    pub const fn contains(&self, symbol: SymbolId) -> bool {
        symbol.get() < self.kinds
    }

    /// Texture name conventionally associated with the symbol.
    ///
    /// Symbol `0` maps to `symbol1.png`, symbol `1` to `symbol2.png` and so on.
    #[must_use]
    pub fn texture_name(&self, symbol: SymbolId) -> String {
        format!("symbol{}.png", symbol.get() + 1)
    }
}

impl Default for SymbolPalette {
    fn default() -> Self {
        Self {
            kinds: Self::DEFAULT_KINDS,
        }
    }
}

/// Immutable geometry of a single reel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReelConfig {
    symbol_count: u32,
    cell_size: f32,
    palette: SymbolPalette,
}

impl ReelConfig {
    /// Creates a reel configuration with `symbol_count` visible cells of `cell_size` world units.
    ///
    /// Returns an error when the reel would have no visible cells or the cell
    /// size is not a positive finite number.
    pub fn new(symbol_count: u32, cell_size: f32) -> Result<Self, ConfigError> {
        if symbol_count == 0 {
            return Err(ConfigError::ZeroSymbolCount);
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize { cell_size });
        }

        Ok(Self {
            symbol_count,
            cell_size,
            palette: SymbolPalette::default(),
        })
    }

    /// Replaces the symbol palette used by the reel.
    #[must_use]
    pub fn with_palette(mut self, palette: SymbolPalette) -> Self {
        self.palette = palette;
        self
    }

    /// Number of visible cells.
    #[must_use]
    pub const fn symbol_count(&self) -> u32 {
        self.symbol_count
    }

    /// Total number of tiles, visible cells plus the hidden buffer.
    #[must_use]
    pub const fn tile_count(&self) -> u32 {
        self.symbol_count + BUFFER_TILES
    }

    /// Side length of a single cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Palette the reel draws symbols from.
    #[must_use]
    pub const fn palette(&self) -> SymbolPalette {
        self.palette
    }

    /// Canonical center of the cell at `slot`, counted from the left edge.
    #[must_use]
    pub fn slot_center(&self, slot: u32) -> f32 {
        (slot as f32 + 0.5) * self.cell_size
    }

    /// Vertical center shared by every tile of the reel.
    #[must_use]
    pub fn row_center(&self) -> f32 {
        self.cell_size * 0.5
    }

    /// Width of the visible window in world units.
    #[must_use]
    pub fn visible_width(&self) -> f32 {
        self.symbol_count as f32 * self.cell_size
    }
}

/// Tuning constants shaping reel motion.
///
/// Speeds are expressed in cells per frame at [`REFERENCE_FRAME_RATE`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelTuning {
    /// Constant scroll speed while spinning.
    pub spin_speed: f32,
    /// Lowest speed allowed while stop symbols are still waiting for injection.
    pub min_injection_speed: f32,
    /// Multiplicative decay applied per frame when no injection is pending.
    pub slowdown_rate: f32,
    /// Speed below which the fallback slowdown halts the reel.
    pub stop_threshold: f32,
    /// Duration of the settle tween in milliseconds.
    pub settle_duration_ms: f32,
    /// Frame rate that a delta of `1.0` corresponds to.
    pub frame_rate: f32,
    /// Largest frame delta honoured by a single update; larger values are clamped.
    pub max_frame_delta: f32,
}

impl ReelTuning {
    /// Validates that every constant lies inside its usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("spin_speed", self.spin_speed),
            ("min_injection_speed", self.min_injection_speed),
            ("frame_rate", self.frame_rate),
            ("max_frame_delta", self.max_frame_delta),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }

        if !(self.slowdown_rate > 0.0 && self.slowdown_rate < 1.0) {
            return Err(ConfigError::InvalidTuning {
                field: "slowdown_rate",
                value: self.slowdown_rate,
            });
        }

        let non_negative = [
            ("stop_threshold", self.stop_threshold),
            ("settle_duration_ms", self.settle_duration_ms),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }

        Ok(())
    }

    /// Milliseconds represented by a frame delta of `1.0`.
    #[must_use]
    pub fn frame_millis(&self) -> f32 {
        1_000.0 / self.frame_rate
    }

    /// Converts wall-clock frame time into a frame delta multiplier.
    #[must_use]
    pub fn delta_from(&self, elapsed: Duration) -> f32 {
        elapsed.as_secs_f32() * self.frame_rate
    }
}

impl Default for ReelTuning {
    fn default() -> Self {
        Self {
            spin_speed: 0.5,
            min_injection_speed: 0.25,
            slowdown_rate: 0.95,
            stop_threshold: 0.005,
            settle_duration_ms: 400.0,
            frame_rate: REFERENCE_FRAME_RATE,
            max_frame_delta: 4.0,
        }
    }
}

/// Externally observable phase of a reel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReelPhase {
    /// Tiles rest on the grid.
    Idle,
    /// Tiles scroll at constant speed and receive random symbols on wrap.
    Spinning,
    /// A stop was requested; wrapping tiles receive the queued stop symbols.
    SlowingDown,
    /// Every stop symbol is placed; the strip eases onto the grid.
    Settling,
}

impl ReelPhase {
    /// Reports whether the reel is at rest.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for ReelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Spinning => "spinning",
            Self::SlowingDown => "slowing down",
            Self::Settling => "settling",
        };
        f.write_str(label)
    }
}

/// Errors raised while validating reel configuration.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Reels require at least one visible cell.
    #[error("a reel needs at least one visible symbol")]
    ZeroSymbolCount,
    /// Cell size must be a positive finite number.
    #[error("cell size must be positive and finite (received {cell_size})")]
    InvalidCellSize {
        /// Provided cell size that failed validation.
        cell_size: f32,
    },
    /// Palettes must contain at least one symbol.
    #[error("symbol palette must contain at least one symbol")]
    EmptyPalette,
    /// A tuning constant lies outside its usable range.
    #[error("tuning value `{field}` is out of range (received {value})")]
    InvalidTuning {
        /// Name of the offending field.
        field: &'static str,
        /// Provided value that failed validation.
        value: f32,
    },
}

/// Reasons a stop request may be rejected by a reel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StopSpinError {
    /// The number of stop symbols differs from the reel's visible cell count.
    #[error("expected {expected} stop symbols, received {received}")]
    LengthMismatch {
        /// Visible cell count of the reel.
        expected: u32,
        /// Number of symbols supplied by the caller.
        received: usize,
    },
    /// A stop symbol lies outside the reel's palette.
    #[error("stop symbol {symbol} is outside the palette of {palette_len} symbols")]
    UnknownSymbol {
        /// Offending symbol.
        symbol: SymbolId,
        /// Number of symbols in the palette.
        palette_len: u32,
    },
    /// Stops can only be scheduled while the reel is spinning.
    #[error("cannot stop a reel that is {phase}")]
    NotSpinning {
        /// Phase the reel was in when the stop was requested.
        phase: ReelPhase,
    },
}

/// Visual collaborator that owns the drawable counterpart of every tile.
///
/// The reel system creates one visual per tile at construction and mirrors
/// every position and symbol change onto it. Implementations resolve symbols to
/// textures however they see fit; the reel never reads anything back.
pub trait TileSurface {
    /// Creates the visual for `tile` showing `symbol`, sized `size` × `size`.
    fn create_tile(&mut self, tile: TileIndex, symbol: SymbolId, size: f32);

    /// Moves the visual's center to (`x`, `y`).
    fn set_position(&mut self, tile: TileIndex, x: f32, y: f32);

    /// Changes the symbol, and therefore the texture, shown by the visual.
    fn set_symbol(&mut self, tile: TileIndex, symbol: SymbolId);

    /// Releases the visual when the reel is torn down.
    fn release_tile(&mut self, _tile: TileIndex) {}
}

/// Surface that discards every update, used for headless simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullSurface;

impl TileSurface for NullSurface {
    fn create_tile(&mut self, _tile: TileIndex, _symbol: SymbolId, _size: f32) {}

    fn set_position(&mut self, _tile: TileIndex, _x: f32, _y: f32) {}

    fn set_symbol(&mut self, _tile: TileIndex, _symbol: SymbolId) {}
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, ReelConfig, ReelPhase, ReelTuning, StopSpinError, SymbolId, SymbolPalette,
    };
    use std::time::Duration;

    #[test]
    fn reel_config_rejects_zero_symbols() {
        assert_eq!(
            ReelConfig::new(0, 100.0),
            Err(ConfigError::ZeroSymbolCount)
        );
    }

    #[test]
    fn reel_config_rejects_non_positive_cell_size() {
        assert!(matches!(
            ReelConfig::new(3, 0.0),
            Err(ConfigError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            ReelConfig::new(3, f32::NAN),
            Err(ConfigError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn reel_config_counts_hidden_buffer_tile() {
        let config = ReelConfig::new(3, 100.0).expect("valid config");
        assert_eq!(config.tile_count(), 4);
        assert_eq!(config.slot_center(0), 50.0);
        assert_eq!(config.slot_center(3), 350.0);
        assert_eq!(config.row_center(), 50.0);
        assert_eq!(config.visible_width(), 300.0);
    }

    #[test]
    fn palette_maps_symbols_to_one_based_texture_names() {
        let palette = SymbolPalette::default();
        assert_eq!(palette.len(), 5);
        assert_eq!(palette.texture_name(SymbolId::new(0)), "symbol1.png");
        assert_eq!(palette.texture_name(SymbolId::new(4)), "symbol5.png");
        assert!(palette.contains(SymbolId::new(4)));
        assert!(!palette.contains(SymbolId::new(5)));
        assert!(!palette.is_empty());
        assert_eq!(SymbolPalette::new(0), Err(ConfigError::EmptyPalette));
    }

    #[test]
    fn default_tuning_is_valid() {
        ReelTuning::default()
            .validate()
            .expect("default tuning should validate");
    }

    #[test]
    fn tuning_rejects_zero_injection_speed() {
        let tuning = ReelTuning {
            min_injection_speed: 0.0,
            ..ReelTuning::default()
        };
        assert_eq!(
            tuning.validate(),
            Err(ConfigError::InvalidTuning {
                field: "min_injection_speed",
                value: 0.0,
            })
        );
    }

    #[test]
    fn tuning_rejects_slowdown_rate_outside_unit_interval() {
        let tuning = ReelTuning {
            slowdown_rate: 1.0,
            ..ReelTuning::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn tuning_converts_wall_clock_to_frame_delta() {
        let tuning = ReelTuning::default();
        let delta = tuning.delta_from(Duration::from_millis(50));
        assert!((delta - 3.0).abs() < 1e-4);
        assert!((tuning.frame_millis() - 16.666_666).abs() < 1e-3);
    }

    #[test]
    fn tuning_round_trips_through_bincode() {
        let tuning = ReelTuning {
            settle_duration_ms: 250.0,
            ..ReelTuning::default()
        };
        let bytes = bincode::serialize(&tuning).expect("serialize");
        let restored: ReelTuning = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, tuning);
    }

    #[test]
    fn stop_errors_describe_the_rejection() {
        let error = StopSpinError::LengthMismatch {
            expected: 3,
            received: 2,
        };
        assert_eq!(error.to_string(), "expected 3 stop symbols, received 2");

        let error = StopSpinError::NotSpinning {
            phase: ReelPhase::Settling,
        };
        assert_eq!(error.to_string(), "cannot stop a reel that is settling");
    }
}
