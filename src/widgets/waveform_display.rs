//! Scope widget for visualizing source waveforms.
//!
//! Draws every live source as one trace over a shared grid. Traces are
//! already decimated; the widget only maps sample index to x so that a
//! full-length trace spans the whole width.

use eframe::egui::{self, Color32, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};

use crate::app::theme;
use crate::dsp::analyser::MIN_DECIBELS;

/// Grid style for the scope background.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GridStyle {
    /// No grid background.
    None,
    /// Subtle grid lines.
    Subtle,
    /// More visible grid with major/minor divisions.
    #[default]
    Detailed,
}

/// Configuration for the scope widgets.
#[derive(Clone, Debug)]
pub struct ScopeConfig {
    /// Line thickness.
    pub line_thickness: f32,
    /// Whether to draw a glow behind each trace.
    pub glow: bool,
    pub grid_style: GridStyle,
    /// Vertical scale (1.0 = full range).
    pub scale: f32,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            line_thickness: 1.5,
            glow: true,
            grid_style: GridStyle::Detailed,
            scale: 0.9,
        }
    }
}

impl ScopeConfig {
    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn with_glow(mut self, glow: bool) -> Self {
        self.glow = glow;
        self
    }
}

/// One line on the scope.
#[derive(Clone, Copy, Debug)]
pub struct Trace<'a> {
    pub samples: &'a [f32],
    pub color: Color32,
}

/// Draws `traces` filling the available width and `height`.
///
/// `span` is the number of samples a full-width trace holds. The response
/// senses drags so the caller can turn them into zoom gestures.
pub fn scope(
    ui: &mut Ui,
    traces: &[Trace<'_>],
    span: usize,
    height: f32,
    config: &ScopeConfig,
) -> Response {
    let size = Vec2::new(ui.available_width(), height);
    let (rect, response) = ui.allocate_exact_size(size, Sense::drag());

    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        draw_scope_background(painter, rect, config.grid_style);

        for trace in traces {
            let points = trace_points(trace.samples, span, rect, config.scale);
            if points.len() < 2 {
                continue;
            }
            if config.glow {
                let c = trace.color;
                let glow = Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), 60);
                draw_polyline(painter, &points, glow, config.line_thickness * 3.0);
            }
            draw_polyline(painter, &points, trace.color, config.line_thickness);
        }

        // Zero line
        painter.line_segment(
            [
                Pos2::new(rect.left(), rect.center().y),
                Pos2::new(rect.right(), rect.center().y),
            ],
            Stroke::new(0.5, Color32::from_rgba_unmultiplied(255, 255, 255, 30)),
        );
    }

    response
}

/// Draws magnitude spectra (dB bins) filling the available width and `height`.
pub fn spectrum(ui: &mut Ui, traces: &[Trace<'_>], height: f32, config: &ScopeConfig) -> Response {
    let size = Vec2::new(ui.available_width(), height);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());

    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        draw_scope_background(painter, rect, GridStyle::Subtle);

        for trace in traces {
            let points = spectrum_points(trace.samples, rect);
            if points.len() >= 2 {
                draw_polyline(painter, &points, trace.color, config.line_thickness);
            }
        }
    }

    response
}

/// Maps samples to screen points; sample `i` sits at `i / (span - 1)` of the width.
pub fn trace_points(samples: &[f32], span: usize, rect: Rect, scale: f32) -> Vec<Pos2> {
    let span = span.max(samples.len()).max(2);
    let step = rect.width() / (span - 1) as f32;
    let amplitude = rect.height() * 0.5 * scale;
    let center_y = rect.center().y;

    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            Pos2::new(
                rect.left() + i as f32 * step,
                center_y - sample.clamp(-1.0, 1.0) * amplitude,
            )
        })
        .collect()
}

/// Maps dB bins (floor [`MIN_DECIBELS`], ceiling 0) to screen points.
pub fn spectrum_points(bins: &[f32], rect: Rect) -> Vec<Pos2> {
    if bins.len() < 2 {
        return Vec::new();
    }
    let step = rect.width() / (bins.len() - 1) as f32;
    bins.iter()
        .enumerate()
        .map(|(i, db)| {
            let level = ((db - MIN_DECIBELS) / -MIN_DECIBELS).clamp(0.0, 1.0);
            Pos2::new(rect.left() + i as f32 * step, rect.bottom() - level * rect.height())
        })
        .collect()
}

fn draw_scope_background(painter: &egui::Painter, rect: Rect, style: GridStyle) {
    painter.rect_filled(rect, 2.0, theme::background::SCOPE);

    match style {
        GridStyle::None => {}
        GridStyle::Subtle => {
            let grid_color = Color32::from_rgba_unmultiplied(255, 255, 255, 15);
            let num_divisions = 4;
            for i in 1..num_divisions {
                let x = rect.left() + rect.width() * (i as f32 / num_divisions as f32);
                let y = rect.top() + rect.height() * (i as f32 / num_divisions as f32);
                painter.line_segment(
                    [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                    Stroke::new(0.5, grid_color),
                );
                painter.line_segment(
                    [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                    Stroke::new(0.5, grid_color),
                );
            }
        }
        GridStyle::Detailed => {
            let major_color = Color32::from_rgba_unmultiplied(255, 255, 255, 25);
            let minor_color = Color32::from_rgba_unmultiplied(255, 255, 255, 10);
            let num_major = 4;
            let num_minor = 8;

            for i in 1..num_minor {
                let x = rect.left() + rect.width() * (i as f32 / num_minor as f32);
                let y = rect.top() + rect.height() * (i as f32 / num_minor as f32);
                let color = if i % (num_minor / num_major) == 0 {
                    major_color
                } else {
                    minor_color
                };
                painter.line_segment(
                    [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                    Stroke::new(0.5, color),
                );
                painter.line_segment(
                    [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                    Stroke::new(0.5, color),
                );
            }
        }
    }

    painter.rect_stroke(rect, 2.0, Stroke::new(1.0, Color32::from_rgb(50, 55, 70)));
}

fn draw_polyline(painter: &egui::Painter, points: &[Pos2], color: Color32, thickness: f32) {
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], Stroke::new(thickness, color));
    }
}
