//! Immediate-mode UI helpers for the Macroquad rendering backend.
//!
//! This module hosts all uses of `macroquad::ui` so the rest of the adapter can
//! remain agnostic of Macroquad's UI types.

use macroquad::{
    color::{Color, WHITE},
    math::{RectOffset, Vec2},
    ui::{hash, Ui},
};

/// Outcome of drawing the spin button for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SpinButtonUiResult {
    /// Whether the button was clicked while enabled.
    pub(crate) pressed: bool,
}

/// Layout and state of the spin button for the current frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpinButtonUiContext {
    /// Top-left corner of the button panel in screen coordinates.
    pub(crate) origin: Vec2,
    /// Panel dimensions in screen space.
    pub(crate) size: Vec2,
    /// Whether a click should start a spin.
    pub(crate) enabled: bool,
}

/// Draws the spin button, greyed out and inert while the reels are busy.
pub(crate) fn draw_spin_button_ui(ui: &mut Ui, context: SpinButtonUiContext) -> SpinButtonUiResult {
    let transparent = Color::new(0.0, 0.0, 0.0, 0.0);
    let (idle, hovered, clicked, text) = if context.enabled {
        (
            Color::from_rgba(196, 48, 48, 255),
            Color::from_rgba(224, 72, 72, 255),
            Color::from_rgba(160, 32, 32, 255),
            WHITE,
        )
    } else {
        let grey = Color::from_rgba(90, 90, 90, 200);
        (grey, grey, grey, Color::from_rgba(200, 200, 200, 255))
    };

    let mut skin = ui.default_skin();
    skin.margin = 0.0;
    skin.window_style = ui
        .style_builder()
        .color(transparent)
        .color_hovered(transparent)
        .color_clicked(transparent)
        .color_inactive(transparent)
        .margin(RectOffset::new(0.0, 0.0, 0.0, 0.0))
        .build();
    skin.button_style = ui
        .style_builder()
        .text_color(text)
        .text_color_hovered(text)
        .text_color_clicked(text)
        .color(idle)
        .color_hovered(hovered)
        .color_clicked(clicked)
        .color_inactive(idle)
        .font_size(28)
        .margin(RectOffset::new(24.0, 24.0, 12.0, 12.0))
        .build();

    ui.push_skin(&skin);

    let mut clicked = false;
    let _ = ui.window(hash!("spin_button"), context.origin, context.size, |ui| {
        let label = if context.enabled { "SPIN" } else { "SPINNING" };
        clicked = ui.button(None, label);
    });

    ui.pop_skin();

    SpinButtonUiResult {
        pressed: context.enabled && clicked,
    }
}
