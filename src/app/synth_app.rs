//! Main application struct for Pluck Scope
//!
//! Contains the SynthApp which implements eframe::App. It turns keyboard,
//! mouse and layout changes into events for the session, pumps the session
//! once per frame, and paints whatever the app state holds.

use std::io;
use std::sync::Arc;

use eframe::egui::{self, Align, Key, Layout, RichText};
use tracing::warn;

use super::theme;
use crate::config::SynthConfig;
use crate::dsp::WaveShape;
use crate::engine::{AudioEngine, AudioError, CpalCapture};
use crate::protocol::Event;
use crate::session::Session;
use crate::source::SourceId;
use crate::state::{Point, ViewportGeometry};
use crate::widgets::{piano, scope, spectrum, PianoConfig, ScopeConfig, Trace};

/// Sample rate assumed for analysis when no output device is available.
const FALLBACK_SAMPLE_RATE: f32 = 44100.0;

/// Computer keys that play notes, in interval order.
const NOTE_KEYS: [Key; 13] = [
    Key::A,
    Key::W,
    Key::S,
    Key::E,
    Key::D,
    Key::F,
    Key::T,
    Key::G,
    Key::Y,
    Key::H,
    Key::U,
    Key::J,
    Key::K,
];

/// Interval index played by a computer key.
pub fn interval_for_key(key: Key) -> Option<u32> {
    NOTE_KEYS.iter().position(|&k| k == key).map(|i| i as u32)
}

/// Event for one key transition, if any.
///
/// A note sounds while its key is held: press and release both toggle it.
/// `M` latches the microphone on press. Key repeat is ignored.
pub fn key_event(key: Key, pressed: bool, repeat: bool) -> Option<Event> {
    if repeat {
        return None;
    }
    if key == Key::M {
        return pressed.then_some(Event::ToggleMic);
    }
    interval_for_key(key).map(|interval| Event::ToggleKey(SourceId::note(interval)))
}

/// Main application state for Pluck Scope
pub struct SynthApp {
    session: Session,
    /// Audio output; the app keeps running without one, just silently.
    audio_engine: Result<AudioEngine, AudioError>,
    audio_error_message: Option<String>,
    window_size: usize,
    scope_config: ScopeConfig,
    piano_config: PianoConfig,
    /// Last scope size reported to the session.
    viewport: Option<ViewportGeometry>,
    theme_applied: bool,
}

impl SynthApp {
    pub fn new(config: SynthConfig) -> io::Result<Self> {
        let mut audio_engine = AudioEngine::new();
        let sample_rate = audio_engine
            .as_ref()
            .map(|engine| engine.sample_rate() as f32)
            .unwrap_or(FALLBACK_SAMPLE_RATE);

        let (session, processor) =
            Session::build(&config, sample_rate, Arc::new(CpalCapture::default()))?;

        let audio_error_message = match &mut audio_engine {
            Ok(engine) => match engine.start_with_processor(processor) {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, "audio output failed to start");
                    Some(e.to_string())
                }
            },
            Err(e) => {
                warn!(error = %e, "no audio output");
                Some(e.to_string())
            }
        };

        Ok(Self {
            session,
            audio_engine,
            audio_error_message,
            window_size: config.window_size,
            scope_config: ScopeConfig::default(),
            piano_config: PianoConfig::default(),
            viewport: None,
            theme_applied: false,
        })
    }

    /// Turns this frame's key presses and releases into events.
    fn collect_key_events(&self, ctx: &egui::Context, events: &mut Vec<Event>) {
        if ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|input| {
            events.extend(input.events.iter().filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed,
                    repeat,
                    ..
                } => key_event(*key, *pressed, *repeat),
                _ => None,
            }));
        });
    }

    /// Draw the top toolbar with the mic toggle, shape selector and device status
    fn draw_toolbar(&self, ui: &mut egui::Ui, events: &mut Vec<Event>) {
        let registry = self.session.state().registry();

        ui.horizontal(|ui| {
            ui.add_space(8.0);
            ui.label(
                RichText::new("PLUCK SCOPE")
                    .size(18.0)
                    .color(theme::text::PRIMARY)
                    .strong(),
            );

            ui.add_space(20.0);
            ui.separator();
            ui.add_space(20.0);

            let (mic_text, mic_color) = if registry.is_live(SourceId::MIC) {
                ("🎤 Mic ON", theme::accent::SUCCESS)
            } else if registry.contains(SourceId::MIC) {
                ("🎤 Mic …", theme::accent::WARNING)
            } else {
                ("🎤 Mic OFF", theme::text::SECONDARY)
            };
            if ui
                .button(RichText::new(mic_text).color(mic_color))
                .on_hover_text("Toggle the microphone (M)")
                .clicked()
            {
                events.push(Event::ToggleMic);
            }

            ui.add_space(10.0);

            let current = self.session.state().wave_shape();
            egui::ComboBox::from_label("Shape")
                .selected_text(current.name())
                .show_ui(ui, |ui| {
                    for shape in WaveShape::ALL {
                        if ui.selectable_label(shape == current, shape.name()).clicked()
                            && shape != current
                        {
                            events.push(Event::SelectWaveShape(shape));
                        }
                    }
                });

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| match &self.audio_engine {
                Ok(engine) => {
                    let (status_text, status_color) = if engine.is_running() {
                        ("● Running", theme::accent::SUCCESS)
                    } else {
                        ("○ Stopped", theme::text::DISABLED)
                    };
                    ui.label(RichText::new(status_text).color(status_color).small());
                    ui.label(
                        RichText::new(format!(
                            "{} • {}Hz • {}ch",
                            engine.current_device_name(),
                            engine.sample_rate(),
                            engine.channels()
                        ))
                        .color(theme::text::SECONDARY)
                        .small(),
                    );
                }
                Err(_) => {
                    ui.label(
                        RichText::new("⚠ Audio unavailable")
                            .color(theme::accent::ERROR)
                            .small(),
                    );
                }
            });
        });
    }

    /// Draw the scope, reporting its size and any zoom drag.
    fn draw_main_area(&mut self, ui: &mut egui::Ui, events: &mut Vec<Event>) {
        let state = self.session.state();
        let spectrum_height = if state.spectrum_enabled() { 120.0 } else { 0.0 };
        let piano_height = self.piano_config.height + 16.0;
        let scope_height =
            (ui.available_height() - spectrum_height - piano_height).max(80.0);

        let traces: Vec<Trace<'_>> = state
            .registry()
            .waveforms()
            .map(|(id, samples)| Trace {
                samples,
                color: theme::trace::color_for(id),
            })
            .collect();
        let span = state.target_length(self.window_size);
        let response = scope(ui, &traces, span, scope_height, &self.scope_config);

        let measured = ViewportGeometry::new(response.rect.width(), response.rect.height());
        match self.viewport {
            None => events.push(Event::ViewportMeasured(measured)),
            Some(previous) if previous != measured => events.push(Event::Resized(measured)),
            Some(_) => {}
        }
        self.viewport = Some(measured);

        if let Some(pos) = response.interact_pointer_pos() {
            let point = Point::new(pos.x, pos.y);
            if response.drag_started() {
                events.push(Event::ZoomStart(point));
            } else if response.dragged() {
                events.push(Event::ZoomChange(point));
            }
        }
        if response.drag_stopped() {
            events.push(Event::ZoomStop);
        }

        if state.spectrum_enabled() {
            ui.add_space(4.0);
            let spectra: Vec<Trace<'_>> = state
                .registry()
                .spectra()
                .map(|(id, samples)| Trace {
                    samples,
                    color: theme::trace::color_for(id),
                })
                .collect();
            spectrum(ui, &spectra, spectrum_height - 4.0, &self.scope_config);
        }

        ui.add_space(8.0);
        let active: Vec<u32> = state
            .registry()
            .live()
            .filter_map(|handle| handle.id.interval())
            .collect();
        ui.vertical_centered(|ui| {
            if let Some(interval) = piano(ui, &active, &self.piano_config) {
                events.push(Event::ToggleKey(SourceId::note(interval)));
            }
        });
    }

    /// Draw the bottom status bar
    fn draw_status_bar(&self, ui: &mut egui::Ui) -> bool {
        let mut dismiss = false;

        ui.horizontal(|ui| {
            ui.add_space(8.0);

            if let Some(message) = self.session.state().status_message() {
                ui.label(
                    RichText::new(format!("⚠ {}", message))
                        .color(theme::accent::WARNING)
                        .small(),
                );
                if ui.small_button("✕").clicked() {
                    dismiss = true;
                }
            } else if let Some(ref error) = self.audio_error_message {
                ui.label(
                    RichText::new(format!("⚠ {}", error))
                        .color(theme::accent::ERROR)
                        .small(),
                );
            } else {
                ui.label(
                    RichText::new("Hold A W S E D F T G Y H U J K to play, M toggles the mic")
                        .color(theme::text::SECONDARY)
                        .small(),
                );
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(
                    RichText::new(format!(
                        "{} live • zoom {:.2}× • peak {:.2} • CPU {:.0}%",
                        self.session.state().registry().live_count(),
                        self.session.state().zoom().factor(),
                        self.session.output_peak(),
                        self.session.cpu_load()
                    ))
                    .color(theme::text::DISABLED)
                    .small(),
                );
            });
        });

        dismiss
    }
}

impl Drop for SynthApp {
    fn drop(&mut self) {
        if let Ok(engine) = &mut self.audio_engine {
            if let Err(e) = engine.stop() {
                warn!(error = %e, "audio output failed to stop");
            }
        }
    }
}

impl eframe::App for SynthApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.session.pump();

        // UI events are applied after drawing, so the frame paints one consistent state
        let mut events = Vec::new();
        self.collect_key_events(ctx, &mut events);

        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 8.0)),
            )
            .show(ctx, |ui| self.draw_toolbar(ui, &mut events));

        let dismiss = egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 4.0)),
            )
            .show(ctx, |ui| self.draw_status_bar(ui))
            .inner;

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(theme::background::MAIN)
                    .inner_margin(egui::Margin::same(12.0)),
            )
            .show(ctx, |ui| self.draw_main_area(ui, &mut events));

        if dismiss {
            self.session.clear_status_message();
        }
        for event in events {
            self.session.handle(event);
        }

        // Replies arrive continuously while sources are live
        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dsp::AnalyserTap;
    use crate::protocol::Command;
    use crate::source::{AudioSourceHandle, GraphRef};
    use crate::state::AppState;

    #[test]
    fn test_note_keys_cover_thirteen_intervals() {
        assert_eq!(interval_for_key(Key::A), Some(0));
        assert_eq!(interval_for_key(Key::W), Some(1));
        assert_eq!(interval_for_key(Key::K), Some(12));
        assert_eq!(interval_for_key(Key::M), None);
        assert_eq!(interval_for_key(Key::Z), None);
    }

    #[test]
    fn test_note_key_press_and_release_both_toggle() {
        let press = key_event(Key::A, true, false);
        let release = key_event(Key::A, false, false);
        assert_eq!(press, Some(Event::ToggleKey(SourceId::note(0))));
        assert_eq!(release, Some(Event::ToggleKey(SourceId::note(0))));

        assert_eq!(key_event(Key::A, true, true), None);
        assert_eq!(key_event(Key::Z, true, false), None);
    }

    #[test]
    fn test_mic_key_toggles_on_press_only() {
        assert_eq!(key_event(Key::M, true, false), Some(Event::ToggleMic));
        assert_eq!(key_event(Key::M, false, false), None);
        assert_eq!(key_event(Key::M, true, true), None);
    }

    #[test]
    fn test_held_key_sounds_until_released() {
        let mut state = AppState::new(&SynthConfig::default());
        let id = SourceId::note(2);
        let press = key_event(Key::S, true, false).unwrap();
        let release = key_event(Key::S, false, false).unwrap();

        let commands = state.apply(press);
        assert!(matches!(commands.as_slice(), [Command::Create { .. }]));
        let graph = GraphRef::new(1, Arc::new(AnalyserTap::new(8)));
        let handle = AudioSourceHandle::new(id, graph);
        state.apply(Event::AudioSourceAdded(handle.clone()));
        assert!(state.registry().is_live(id));

        let commands = state.apply(release);
        assert_eq!(commands, vec![Command::Release(handle)]);
        assert!(!state.registry().contains(id));
    }

    #[test]
    fn test_quick_tap_before_graph_arrives_is_released() {
        let mut state = AppState::new(&SynthConfig::default());
        let id = SourceId::note(0);

        state.apply(key_event(Key::A, true, false).unwrap());
        assert!(state.apply(key_event(Key::A, false, false).unwrap()).is_empty());

        let graph = GraphRef::new(1, Arc::new(AnalyserTap::new(8)));
        let handle = AudioSourceHandle::new(id, graph);
        let commands = state.apply(Event::AudioSourceAdded(handle.clone()));
        assert_eq!(commands, vec![Command::Release(handle)]);
        assert!(!state.registry().contains(id));
    }

    #[test]
    fn test_note_keys_match_piano_labels() {
        for (i, key) in NOTE_KEYS.iter().enumerate() {
            let label = crate::widgets::piano::key_label(i as u32).unwrap();
            assert_eq!(key.name(), label.to_string());
        }
    }
}
