//! Symbol generators feeding filler and hidden-buffer symbols to reels.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use reelspin_core::{SymbolId, SymbolPalette};

/// Source of symbols for tiles that are not part of a stop sequence.
///
/// Reels draw from the source when tiles are created, when a tile wraps while
/// spinning freely, and once per stop request for the hidden buffer tile.
pub trait SymbolSource {
    /// Produces the next symbol drawn from `palette`.
    fn next_symbol(&mut self, palette: SymbolPalette) -> SymbolId;
}

impl<F> SymbolSource for F
where
    F: FnMut(SymbolPalette) -> SymbolId,
{
    fn next_symbol(&mut self, palette: SymbolPalette) -> SymbolId {
        self(palette)
    }
}

/// Uniformly random symbols drawn from a seedable ChaCha generator.
#[derive(Clone, Debug)]
pub struct RandomSymbols {
    rng: ChaCha8Rng,
}

impl RandomSymbols {
    /// Creates a generator producing a reproducible sequence for `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl SymbolSource for RandomSymbols {
    fn next_symbol(&mut self, palette: SymbolPalette) -> SymbolId {
        SymbolId::new(self.rng.gen_range(0..palette.len()))
    }
}

/// Replays a fixed script of symbols, cycling when exhausted.
///
/// Scripted values are folded into the palette so the produced symbols are
/// always valid. An empty script yields symbol `0` forever.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSymbols {
    script: Vec<SymbolId>,
    cursor: usize,
}

impl ScriptedSymbols {
    /// Creates a source replaying `script` in order.
    #[must_use]
    pub fn new(script: Vec<SymbolId>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Creates a source that always produces `symbol`.
    #[must_use]
    pub fn constant(symbol: SymbolId) -> Self {
        Self::new(vec![symbol])
    }
}

impl SymbolSource for ScriptedSymbols {
    fn next_symbol(&mut self, palette: SymbolPalette) -> SymbolId {
        let Some(symbol) = self.script.get(self.cursor % self.script.len().max(1)) else {
            return SymbolId::new(0);
        };
        self.cursor = self.cursor.wrapping_add(1);
        SymbolId::new(symbol.get() % palette.len().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generators_agree() {
        let palette = SymbolPalette::default();
        let mut first = RandomSymbols::seeded(7);
        let mut second = RandomSymbols::seeded(7);

        let a: Vec<_> = (0..32).map(|_| first.next_symbol(palette)).collect();
        let b: Vec<_> = (0..32).map(|_| second.next_symbol(palette)).collect();

        assert_eq!(a, b);
        assert!(a.iter().all(|symbol| palette.contains(*symbol)));
    }

    #[test]
    fn scripted_symbols_cycle_through_script() {
        let palette = SymbolPalette::default();
        let mut source = ScriptedSymbols::new(vec![SymbolId::new(1), SymbolId::new(3)]);

        let produced: Vec<_> = (0..5).map(|_| source.next_symbol(palette).get()).collect();
        assert_eq!(produced, vec![1, 3, 1, 3, 1]);
    }

    #[test]
    fn scripted_symbols_fold_into_palette() {
        let palette = SymbolPalette::new(3).expect("non-empty palette");
        let mut source = ScriptedSymbols::constant(SymbolId::new(7));
        assert_eq!(source.next_symbol(palette), SymbolId::new(1));
    }

    #[test]
    fn empty_script_yields_first_symbol() {
        let mut source = ScriptedSymbols::default();
        assert_eq!(
            source.next_symbol(SymbolPalette::default()),
            SymbolId::new(0)
        );
    }

    #[test]
    fn closures_act_as_sources() {
        let mut calls = 0;
        let mut source = |_palette: SymbolPalette| {
            calls += 1;
            SymbolId::new(2)
        };
        assert_eq!(
            source.next_symbol(SymbolPalette::default()),
            SymbolId::new(2)
        );
        assert_eq!(calls, 1);
    }
}
