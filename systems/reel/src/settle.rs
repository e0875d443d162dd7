//! Eased settle tween that carries the strip onto the grid.

use reelspin_core::SymbolId;

/// Cubic ease-out curve, `1 - (1 - t)^3`, with `t` clamped to `0.0..=1.0`.
#[must_use]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Scratch state of an in-flight settle.
///
/// The anchor is chosen once when the tween starts and stays fixed until the
/// tween completes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SettleTween {
    anchor: usize,
    start_x: f32,
    target_x: f32,
    elapsed_ms: f32,
    duration_ms: f32,
    sequence: Vec<SymbolId>,
}

impl SettleTween {
    pub(crate) fn new(
        anchor: usize,
        start_x: f32,
        target_x: f32,
        duration_ms: f32,
        sequence: Vec<SymbolId>,
    ) -> Self {
        Self {
            anchor,
            start_x,
            target_x,
            elapsed_ms: 0.0,
            duration_ms,
            sequence,
        }
    }

    /// Collection index of the anchor tile.
    pub(crate) fn anchor(&self) -> usize {
        self.anchor
    }

    /// Stop sequence the strip is settling onto, hidden symbol last.
    pub(crate) fn sequence(&self) -> &[SymbolId] {
        &self.sequence
    }

    /// Advances the tween clock and returns the eased progress.
    pub(crate) fn advance(&mut self, elapsed_ms: f32) -> f32 {
        self.elapsed_ms += elapsed_ms;
        self.progress()
    }

    /// Eased progress in `0.0..=1.0`.
    pub(crate) fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ease_out_cubic(self.elapsed_ms / self.duration_ms)
    }

    /// Anchor x coordinate at the provided eased progress.
    pub(crate) fn anchor_x_at(&self, progress: f32) -> f32 {
        self.start_x + (self.target_x - self.start_x) * progress
    }
}
