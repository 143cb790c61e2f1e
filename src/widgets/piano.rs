//! Piano keyboard widget.
//!
//! Shows the thirteen playable intervals (one octave, both ends included)
//! with their computer-key labels, lights up the sounding ones, and reports
//! clicks as interval indices.

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Ui, Vec2};

/// Interval index of each white key, left to right.
const WHITE_KEY_INTERVALS: [u32; 8] = [0, 2, 4, 5, 7, 9, 11, 12];
/// Interval index of each black key.
const BLACK_KEY_INTERVALS: [u32; 5] = [1, 3, 6, 8, 10];
/// Black key centres in white-key widths from the left edge.
const BLACK_KEY_POSITIONS: [f32; 5] = [1.0, 2.0, 4.0, 5.0, 6.0];

/// Computer key bound to each interval index.
pub const KEY_LABELS: [char; 13] = [
    'A', 'W', 'S', 'E', 'D', 'F', 'T', 'G', 'Y', 'H', 'U', 'J', 'K',
];

/// Label of the computer key for `interval`, if it has one.
pub fn key_label(interval: u32) -> Option<char> {
    KEY_LABELS.get(interval as usize).copied()
}

/// Configuration for the piano keyboard widget.
#[derive(Clone, Debug)]
pub struct PianoConfig {
    pub width: f32,
    pub height: f32,
    pub white_key_color: Color32,
    pub black_key_color: Color32,
    pub white_key_active: Color32,
    pub black_key_active: Color32,
    pub glow_color: Color32,
    /// Draw the computer-key label on each key.
    pub show_labels: bool,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 90.0,
            white_key_color: Color32::from_rgb(240, 240, 235),  // Off-white
            black_key_color: Color32::from_rgb(30, 30, 35),     // Near-black
            white_key_active: Color32::from_rgb(100, 180, 255), // Blue tint
            black_key_active: Color32::from_rgb(80, 140, 200),  // Darker blue
            glow_color: Color32::from_rgb(100, 180, 255),
            show_labels: true,
        }
    }
}

/// Geometry of the keys inside a keyboard rect.
struct KeyLayout {
    rect: Rect,
    white_width: f32,
    black_width: f32,
    black_height: f32,
}

impl KeyLayout {
    fn new(rect: Rect) -> Self {
        let white_width = rect.width() / WHITE_KEY_INTERVALS.len() as f32;
        Self {
            rect,
            white_width,
            black_width: white_width * 0.6,
            black_height: rect.height() * 0.6,
        }
    }

    fn white_key(&self, index: usize) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.rect.left() + index as f32 * self.white_width, self.rect.top()),
            Vec2::new(self.white_width - 1.0, self.rect.height()),
        )
    }

    fn black_key(&self, index: usize) -> Rect {
        let x = self.rect.left() + BLACK_KEY_POSITIONS[index] * self.white_width
            - self.black_width / 2.0;
        Rect::from_min_size(
            Pos2::new(x, self.rect.top()),
            Vec2::new(self.black_width, self.black_height),
        )
    }

    /// Interval under `pos`. Black keys sit on top, so they win.
    fn hit(&self, pos: Pos2) -> Option<u32> {
        (0..BLACK_KEY_INTERVALS.len())
            .find(|&i| self.black_key(i).contains(pos))
            .map(|i| BLACK_KEY_INTERVALS[i])
            .or_else(|| {
                (0..WHITE_KEY_INTERVALS.len())
                    .find(|&i| self.white_key(i).contains(pos))
                    .map(|i| WHITE_KEY_INTERVALS[i])
            })
    }
}

/// Draws the keyboard. Returns the interval that was clicked this frame, if any.
pub fn piano(ui: &mut Ui, active: &[u32], config: &PianoConfig) -> Option<u32> {
    let (rect, response) =
        ui.allocate_exact_size(Vec2::new(config.width, config.height), Sense::click());
    let layout = KeyLayout::new(rect);

    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        let is_active = |interval: u32| active.contains(&interval);

        for (i, &interval) in WHITE_KEY_INTERVALS.iter().enumerate() {
            let key_rect = layout.white_key(i);
            let lit = is_active(interval);

            if lit {
                for layer in 0..3 {
                    let glow_alpha = 40 - layer * 12;
                    let expand = (3 - layer) as f32 * 2.0;
                    let glow_color = Color32::from_rgba_unmultiplied(
                        config.glow_color.r(),
                        config.glow_color.g(),
                        config.glow_color.b(),
                        glow_alpha as u8,
                    );
                    painter.rect_filled(key_rect.expand(expand), 2.0, glow_color);
                }
            }

            let key_color = if lit {
                config.white_key_active
            } else {
                config.white_key_color
            };
            painter.rect_filled(key_rect, 2.0, key_color);
            painter.rect_stroke(
                key_rect,
                2.0,
                egui::Stroke::new(0.5, Color32::from_gray(120)),
            );

            if config.show_labels {
                draw_label(painter, key_rect, interval, Color32::from_gray(70));
            }
        }

        for (i, &interval) in BLACK_KEY_INTERVALS.iter().enumerate() {
            let key_rect = layout.black_key(i);
            let key_color = if is_active(interval) {
                config.black_key_active
            } else {
                config.black_key_color
            };
            painter.rect_filled(key_rect, 1.5, key_color);

            if config.show_labels {
                draw_label(painter, key_rect, interval, Color32::from_gray(190));
            }
        }
    }

    if response.clicked() {
        response.interact_pointer_pos().and_then(|pos| layout.hit(pos))
    } else {
        None
    }
}

fn draw_label(painter: &egui::Painter, key_rect: Rect, interval: u32, color: Color32) {
    if let Some(label) = key_label(interval) {
        painter.text(
            Pos2::new(key_rect.center().x, key_rect.bottom() - 10.0),
            egui::Align2::CENTER_CENTER,
            label,
            egui::FontId::proportional(11.0),
            color,
        );
    }
}
