//! Theme definitions for the Pluck Scope UI
//!
//! Provides color constants, styling utilities, and theme configuration
//! for a dark, audio-software aesthetic.

use eframe::egui::{self, Color32, Rounding, Stroke, Vec2};

use crate::source::SourceId;

/// Background colors
pub mod background {
    use super::Color32;

    /// Main window background - deep dark blue
    pub const MAIN: Color32 = Color32::from_rgb(26, 26, 46);

    /// Panel background - slightly lighter than main
    pub const PANEL: Color32 = Color32::from_rgb(35, 35, 55);

    /// Scope surface
    pub const SCOPE: Color32 = Color32::from_rgb(20, 22, 30);

    /// Widget background (buttons, inputs)
    pub const WIDGET: Color32 = Color32::from_rgb(45, 45, 70);

    /// Widget background when hovered
    pub const WIDGET_HOVERED: Color32 = Color32::from_rgb(55, 55, 85);

    /// Widget background when active/pressed
    pub const WIDGET_ACTIVE: Color32 = Color32::from_rgb(65, 65, 100);
}

/// Scope trace colors, one per source
pub mod trace {
    use super::{Color32, SourceId};

    /// Note traces cycle through this palette by interval.
    pub const PALETTE: [Color32; 6] = [
        Color32::from_rgb(66, 165, 245),
        Color32::from_rgb(129, 199, 132),
        Color32::from_rgb(255, 183, 77),
        Color32::from_rgb(186, 104, 200),
        Color32::from_rgb(77, 208, 225),
        Color32::from_rgb(240, 98, 146),
    ];

    /// The microphone trace
    pub const MIC: Color32 = Color32::from_rgb(240, 240, 245);

    pub fn color_for(id: SourceId) -> Color32 {
        match id.interval() {
            Some(interval) => PALETTE[interval as usize % PALETTE.len()],
            None => MIC,
        }
    }
}

/// Text colors
pub mod text {
    use super::Color32;

    /// Primary text - bright white
    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Secondary text - dimmed
    pub const SECONDARY: Color32 = Color32::from_rgb(160, 160, 175);

    /// Disabled text
    pub const DISABLED: Color32 = Color32::from_rgb(100, 100, 115);

    /// Accent/highlight text
    pub const ACCENT: Color32 = Color32::from_rgb(130, 180, 255);
}

/// UI accent colors
pub mod accent {
    use super::Color32;

    /// Primary accent - blue
    pub const PRIMARY: Color32 = Color32::from_rgb(66, 165, 245);

    /// Success/active - green
    pub const SUCCESS: Color32 = Color32::from_rgb(129, 199, 132);

    /// Warning - orange
    pub const WARNING: Color32 = Color32::from_rgb(255, 183, 77);

    /// Error - red
    pub const ERROR: Color32 = Color32::from_rgb(239, 83, 80);
}

/// Smaller rounding for compact elements
pub const ROUNDING_SMALL: Rounding = Rounding {
    nw: 4.0,
    ne: 4.0,
    sw: 4.0,
    se: 4.0,
};

/// Apply the dark theme to an egui context
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let visuals = &mut style.visuals;
    visuals.dark_mode = true;

    visuals.window_fill = background::PANEL;
    visuals.window_stroke = Stroke::new(1.0, Color32::from_rgb(60, 60, 80));
    visuals.panel_fill = background::MAIN;

    visuals.widgets.noninteractive.bg_fill = background::WIDGET;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, text::SECONDARY);
    visuals.widgets.noninteractive.rounding = ROUNDING_SMALL;

    visuals.widgets.inactive.bg_fill = background::WIDGET;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, text::PRIMARY);
    visuals.widgets.inactive.rounding = ROUNDING_SMALL;

    visuals.widgets.hovered.bg_fill = background::WIDGET_HOVERED;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, text::PRIMARY);
    visuals.widgets.hovered.rounding = ROUNDING_SMALL;

    visuals.widgets.active.bg_fill = background::WIDGET_ACTIVE;
    visuals.widgets.active.fg_stroke = Stroke::new(1.5, accent::PRIMARY);
    visuals.widgets.active.rounding = ROUNDING_SMALL;

    visuals.widgets.open.bg_fill = background::WIDGET_ACTIVE;
    visuals.widgets.open.fg_stroke = Stroke::new(1.0, text::PRIMARY);
    visuals.widgets.open.rounding = ROUNDING_SMALL;

    visuals.selection.bg_fill = accent::PRIMARY.gamma_multiply(0.3);
    visuals.selection.stroke = Stroke::new(1.0, accent::PRIMARY);
    visuals.hyperlink_color = text::ACCENT;
    visuals.extreme_bg_color = Color32::from_rgb(20, 20, 35);

    style.spacing.item_spacing = Vec2::new(8.0, 6.0);
    style.spacing.button_padding = Vec2::new(12.0, 6.0);

    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_palette_is_distinct() {
        for (i, a) in trace::PALETTE.iter().enumerate() {
            for b in &trace::PALETTE[i + 1..] {
                assert_ne!(a, b);
            }
            assert_ne!(*a, trace::MIC);
        }
    }

    #[test]
    fn trace_colors_cycle_by_interval() {
        let len = trace::PALETTE.len() as u32;
        assert_eq!(
            trace::color_for(SourceId::note(1)),
            trace::color_for(SourceId::note(1 + len))
        );
        assert_eq!(trace::color_for(SourceId::MIC), trace::MIC);
    }
}
