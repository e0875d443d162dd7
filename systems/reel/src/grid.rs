//! Strip-order helpers shared by the motion and settle phases.

use reelspin_core::{ReelConfig, SymbolId};

use crate::Tile;

/// Indices of `tiles` ordered left to right by their current x coordinate.
pub(crate) fn strip_order(tiles: &[Tile]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tiles.len()).collect();
    order.sort_by(|&a, &b| tiles[a].x.total_cmp(&tiles[b].x));
    order
}

/// Places every tile exactly on its canonical cell center, preserving strip order.
pub(crate) fn snap_to_grid(tiles: &mut [Tile], config: &ReelConfig) {
    let row = config.row_center();
    for (slot, index) in strip_order(tiles).into_iter().enumerate() {
        let tile = &mut tiles[index];
        tile.x = config.slot_center(slot as u32);
        tile.y = row;
    }
}

/// Leftmost tile currently showing `symbol`.
pub(crate) fn leftmost_with_symbol(tiles: &[Tile], symbol: SymbolId) -> Option<usize> {
    strip_order(tiles)
        .into_iter()
        .find(|&index| tiles[index].symbol == symbol)
}

/// Symbols of `tiles` read left to right.
pub(crate) fn symbols_in_strip_order(tiles: &[Tile]) -> Vec<SymbolId> {
    strip_order(tiles)
        .into_iter()
        .map(|index| tiles[index].symbol)
        .collect()
}
