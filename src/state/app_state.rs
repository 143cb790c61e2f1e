//! App state
//!
//! The single writer of UI-facing state. [`AppState::apply`] folds one event
//! at a time into the state and returns the commands it wants issued; it
//! never touches the audio graph or the worker itself.

use tracing::{debug, info, trace, warn};

use crate::analysis::{decimate, target_length, AnalysisKind, AnalysisReply};
use crate::config::SynthConfig;
use crate::dsp::WaveShape;
use crate::protocol::{Command, Event};
use crate::source::{tone_frequency, AudioSourceHandle, EnvelopeParams, SourceDescriptor, SourceId};

use super::registry::{Resolution, SourceRegistry};
use super::zoom::{Point, ViewportGeometry, ZoomState};

#[derive(Debug)]
pub struct AppState {
    registry: SourceRegistry,
    zoom: ZoomState,
    viewport: Option<ViewportGeometry>,
    wave_shape: WaveShape,
    envelope: EnvelopeParams,
    reference_hz: f32,
    interval_offset: i32,
    spectrum_enabled: bool,
    /// Latest snapshot request per kind. Only its reply re-issues.
    in_flight: [Option<u64>; 2],
    next_request_id: u64,
    status_message: Option<String>,
}

impl AppState {
    pub fn new(config: &SynthConfig) -> Self {
        Self {
            registry: SourceRegistry::new(),
            zoom: ZoomState::default(),
            viewport: None,
            wave_shape: config.wave_shape,
            envelope: config.envelope,
            reference_hz: config.reference_hz,
            interval_offset: config.interval_offset,
            spectrum_enabled: config.spectrum_enabled,
            in_flight: [None; 2],
            next_request_id: 1,
            status_message: None,
        }
    }

    /// Applies one event and returns the commands it produced.
    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::ToggleKey(id) => {
                if id.is_mic() {
                    warn!("the mic id is not a key, ignoring");
                    return Vec::new();
                }
                let descriptor = self.tone_descriptor(id.0);
                self.toggle(id, descriptor)
            }
            Event::ToggleMic => {
                let descriptor = SourceDescriptor::InputDevice {
                    envelope: self.envelope,
                };
                self.toggle(SourceId::MIC, descriptor)
            }
            Event::AudioSourceAdded(handle) => self.source_added(handle),
            Event::SourceFailed { id, reason } => {
                if self.registry.fail_pending(id) {
                    self.status_message = Some(format!("Could not start {}: {}", id, reason));
                } else {
                    debug!(%id, "failure for an id that was not pending");
                }
                Vec::new()
            }
            Event::AnalysisReply(reply) => self.analysis_reply(reply),
            Event::ZoomStart(point) => {
                self.zoom.start(point);
                Vec::new()
            }
            Event::ZoomChange(point) => {
                self.zoom_change(point);
                Vec::new()
            }
            Event::ZoomStop => {
                self.zoom.stop();
                Vec::new()
            }
            Event::ViewportMeasured(geometry) | Event::Resized(geometry) => {
                self.viewport = Some(geometry);
                Vec::new()
            }
            Event::SelectWaveShape(shape) => {
                debug!(shape = shape.name(), "wave shape selected");
                self.wave_shape = shape;
                Vec::new()
            }
        }
    }

    /// Descriptor for the note at `interval` with the current shape and envelope.
    pub fn tone_descriptor(&self, interval: u32) -> SourceDescriptor {
        SourceDescriptor::Tone {
            frequency: tone_frequency(self.reference_hz, interval, self.interval_offset),
            wave_shape: self.wave_shape,
            envelope: self.envelope,
        }
    }

    fn toggle(&mut self, id: SourceId, descriptor: SourceDescriptor) -> Vec<Command> {
        if let Some(handle) = self.registry.remove_live(id) {
            info!(%id, "releasing source");
            return vec![Command::Release(handle)];
        }
        if let Some(cancelled) = self.registry.toggle_pending(id) {
            debug!(%id, cancelled, "toggled while pending");
            return Vec::new();
        }
        self.registry.begin_pending(id);
        debug!(%id, "creating source");
        vec![Command::Create { id, descriptor }]
    }

    fn source_added(&mut self, handle: AudioSourceHandle) -> Vec<Command> {
        match self.registry.resolve_pending(handle.clone()) {
            Resolution::Registered => {
                if handle.id.is_mic() {
                    self.status_message = None;
                }
                self.enabled_kinds()
                    .filter_map(|kind| self.request_snapshot(kind))
                    .collect()
            }
            Resolution::Cancelled => {
                debug!(id = %handle.id, "source arrived after cancel, releasing");
                vec![Command::Release(handle)]
            }
            Resolution::Unexpected => {
                warn!(id = %handle.id, instance = handle.instance(), "unexpected source, releasing");
                vec![Command::Release(handle)]
            }
        }
    }

    fn analysis_reply(&mut self, reply: AnalysisReply) -> Vec<Command> {
        let AnalysisReply {
            request_id,
            kind,
            analyses,
        } = reply;
        let slot = &mut self.in_flight[kind_index(kind)];
        let answers_in_flight = request_id.is_some() && request_id == *slot;
        if answers_in_flight {
            *slot = None;
        } else {
            trace!(?request_id, kind = kind.name(), "reply is not for the latest request");
        }

        for analysis in analyses {
            let data = match kind {
                AnalysisKind::Waveform => {
                    let target = self.target_length(analysis.data.len());
                    decimate(&analysis.data, target)
                }
                AnalysisKind::Spectrum => analysis.data,
            };
            if !self
                .registry
                .apply_analysis(analysis.id, analysis.instance, kind, data)
            {
                trace!(id = %analysis.id, instance = analysis.instance, "stale analysis dropped");
            }
        }

        if answers_in_flight && self.kind_enabled(kind) {
            self.request_snapshot(kind).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn zoom_change(&mut self, point: Point) {
        let width = self.viewport.map(|v| v.width_px);
        if !self.zoom.change(point, width) {
            trace!(?point, "zoom change ignored");
        }
    }

    /// Batches every live source into one request, or None if nothing is live.
    ///
    /// The new request supersedes any earlier one of the same kind, so a
    /// single request loop per kind stays alive.
    fn request_snapshot(&mut self, kind: AnalysisKind) -> Option<Command> {
        let items = self.registry.batch_items();
        if items.is_empty() {
            return None;
        }
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight[kind_index(kind)] = Some(request_id);
        Some(Command::RequestSnapshot {
            request_id,
            kind,
            items,
        })
    }

    fn enabled_kinds(&self) -> impl Iterator<Item = AnalysisKind> {
        let spectrum = self.spectrum_enabled;
        AnalysisKind::ALL
            .into_iter()
            .filter(move |kind| *kind == AnalysisKind::Waveform || spectrum)
    }

    fn kind_enabled(&self, kind: AnalysisKind) -> bool {
        kind == AnalysisKind::Waveform || self.spectrum_enabled
    }

    /// Number of display points for a raw buffer of `raw_len` samples.
    ///
    /// Without a measured viewport the whole buffer is kept.
    pub fn target_length(&self, raw_len: usize) -> usize {
        match self.viewport {
            Some(viewport) => target_length(viewport.width_px, self.zoom.factor()),
            None => raw_len,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn viewport(&self) -> Option<ViewportGeometry> {
        self.viewport
    }

    pub fn wave_shape(&self) -> WaveShape {
        self.wave_shape
    }

    pub fn spectrum_enabled(&self) -> bool {
        self.spectrum_enabled
    }

    /// Id of the request whose reply will re-issue the next one.
    pub fn in_flight(&self, kind: AnalysisKind) -> Option<u64> {
        self.in_flight[kind_index(kind)]
    }

    /// Message for the UI to show, e.g. a refused microphone.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }
}

fn kind_index(kind: AnalysisKind) -> usize {
    match kind {
        AnalysisKind::Waveform => 0,
        AnalysisKind::Spectrum => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::Analysis;
    use crate::dsp::AnalyserTap;
    use crate::source::GraphRef;

    fn state() -> AppState {
        AppState::new(&SynthConfig::default())
    }

    fn handle(id: SourceId, instance: u64) -> AudioSourceHandle {
        AudioSourceHandle::new(id, GraphRef::new(instance, Arc::new(AnalyserTap::new(8))))
    }

    fn waveform_reply(entries: &[(SourceId, u64, Vec<f32>)]) -> Event {
        waveform_reply_to(None, entries)
    }

    fn waveform_reply_to(request_id: Option<u64>, entries: &[(SourceId, u64, Vec<f32>)]) -> Event {
        Event::AnalysisReply(AnalysisReply {
            request_id,
            kind: AnalysisKind::Waveform,
            analyses: entries
                .iter()
                .map(|(id, instance, data)| Analysis {
                    id: *id,
                    instance: *instance,
                    data: data.clone(),
                })
                .collect(),
        })
    }

    /// Toggles `id` on and delivers its graph.
    fn make_live(state: &mut AppState, id: SourceId, instance: u64) -> AudioSourceHandle {
        let event = if id.is_mic() {
            Event::ToggleMic
        } else {
            Event::ToggleKey(id)
        };
        state.apply(event);
        let h = handle(id, instance);
        state.apply(Event::AudioSourceAdded(h.clone()));
        h
    }

    #[test]
    fn test_toggle_key_creates_base_tone() {
        let mut state = state();
        let commands = state.apply(Event::ToggleKey(SourceId::note(0)));

        assert_eq!(commands.len(), 1);
        match &commands[0] {
            Command::Create {
                id,
                descriptor:
                    SourceDescriptor::Tone {
                        frequency,
                        wave_shape,
                        envelope,
                    },
            } => {
                assert_eq!(*id, SourceId::note(0));
                let expected = 220.0 * 2.0_f32.powf(3.0 / 12.0);
                assert!((frequency - expected).abs() < 1e-3);
                assert_eq!(*wave_shape, WaveShape::Sine);
                assert_eq!(*envelope, EnvelopeParams::default());
            }
            other => panic!("expected tone create, got {:?}", other),
        }
        // Registry only gains a pending entry, nothing live yet
        assert!(state.registry().contains(SourceId::note(0)));
        assert!(!state.registry().is_live(SourceId::note(0)));
    }

    #[test]
    fn test_source_added_requests_snapshot_of_exactly_that_source() {
        let mut state = state();
        state.apply(Event::ToggleKey(SourceId::note(0)));

        let commands = state.apply(Event::AudioSourceAdded(handle(SourceId::note(0), 1)));

        assert_eq!(commands.len(), 1);
        match &commands[0] {
            Command::RequestSnapshot {
                request_id,
                kind,
                items,
            } => {
                assert_eq!(*request_id, 1);
                assert_eq!(*kind, AnalysisKind::Waveform);
                let ids: Vec<_> = items.iter().map(|i| i.id).collect();
                assert_eq!(ids, vec![SourceId::note(0)]);
            }
            other => panic!("expected snapshot request, got {:?}", other),
        }
        assert_eq!(state.in_flight(AnalysisKind::Waveform), Some(1));
    }

    #[test]
    fn test_snapshot_batches_all_live_sources() {
        let mut state = state();
        make_live(&mut state, SourceId::note(0), 1);
        state.apply(Event::ToggleKey(SourceId::note(4)));

        let commands = state.apply(Event::AudioSourceAdded(handle(SourceId::note(4), 2)));
        match &commands[0] {
            Command::RequestSnapshot { items, .. } => {
                let ids: Vec<_> = items.iter().map(|i| i.id).collect();
                assert_eq!(ids, vec![SourceId::note(0), SourceId::note(4)]);
            }
            other => panic!("expected snapshot request, got {:?}", other),
        }
    }

    #[test]
    fn test_toggle_interleaving_then_stale_reply() {
        let mut state = state();
        let id = SourceId::note(7);
        let h = make_live(&mut state, id, 3);

        let commands = state.apply(Event::ToggleKey(id));
        assert_eq!(commands, vec![Command::Release(h)]);
        assert!(!state.registry().contains(id));

        let commands = state.apply(waveform_reply(&[(id, 3, vec![0.1, -0.1, 0.2])]));
        assert!(commands.is_empty());
        assert!(!state.registry().contains(id));
        assert!(state.registry().is_empty());
    }

    #[test]
    fn test_stale_reply_does_not_touch_other_sources() {
        let mut state = state();
        let a = SourceId::note(5);
        let b = SourceId::note(6);
        make_live(&mut state, a, 1);
        make_live(&mut state, b, 2);
        state.apply(Event::ToggleKey(a));

        state.apply(waveform_reply(&[
            (a, 1, vec![0.5, -0.5, 0.5]),
            (b, 2, vec![0.3, -0.3, 0.3]),
        ]));

        assert!(!state.registry().contains(a));
        let waveforms: Vec<_> = state.registry().waveforms().collect();
        assert_eq!(waveforms, vec![(b, &[-0.3, 0.3][..])]);
    }

    #[test]
    fn test_reply_for_old_instance_of_reused_id_is_dropped() {
        let mut state = state();
        let id = SourceId::note(5);
        make_live(&mut state, id, 1);
        state.apply(Event::ToggleKey(id));
        make_live(&mut state, id, 2);

        state.apply(waveform_reply(&[(id, 1, vec![0.9, 0.1, 0.9])]));

        let waveforms: Vec<_> = state.registry().waveforms().collect();
        assert_eq!(waveforms, vec![(id, &[][..])]);
    }

    #[test]
    fn test_reply_is_decimated_to_viewport() {
        let mut state = state();
        let id = SourceId::note(0);
        make_live(&mut state, id, 1);
        state.apply(Event::ViewportMeasured(ViewportGeometry::new(3.0, 100.0)));

        state.apply(waveform_reply(&[(id, 1, vec![0.5, 0.5, -0.2, 0.1, 0.9, 0.1])]));

        let waveforms: Vec<_> = state.registry().waveforms().collect();
        assert_eq!(waveforms, vec![(id, &[-0.2, 0.1, 0.9][..])]);
    }

    #[test]
    fn test_reply_without_viewport_keeps_anchored_buffer() {
        let mut state = state();
        let id = SourceId::note(0);
        make_live(&mut state, id, 1);

        state.apply(waveform_reply(&[(id, 1, vec![0.5, 0.5, -0.2, 0.1, 0.9, 0.1])]));

        let waveforms: Vec<_> = state.registry().waveforms().collect();
        assert_eq!(waveforms, vec![(id, &[-0.2, 0.1, 0.9, 0.1][..])]);
    }

    #[test]
    fn test_reply_keeps_pipeline_warm() {
        let mut state = state();
        let id = SourceId::note(0);
        make_live(&mut state, id, 1);
        let request = state.in_flight(AnalysisKind::Waveform);
        assert_eq!(request, Some(1));

        let commands = state.apply(waveform_reply_to(request, &[(id, 1, vec![0.0; 4])]));
        assert!(matches!(
            commands.as_slice(),
            [Command::RequestSnapshot {
                request_id: 2,
                kind: AnalysisKind::Waveform,
                ..
            }]
        ));
        assert_eq!(state.in_flight(AnalysisKind::Waveform), Some(2));
    }

    #[test]
    fn test_only_latest_request_reissues() {
        let mut state = state();
        make_live(&mut state, SourceId::note(0), 1);
        make_live(&mut state, SourceId::note(1), 2);
        // The second source's request superseded the first
        assert_eq!(state.in_flight(AnalysisKind::Waveform), Some(2));

        assert!(state.apply(waveform_reply_to(Some(1), &[])).is_empty());
        assert_eq!(state.apply(waveform_reply_to(Some(2), &[])).len(), 1);
        assert_eq!(state.in_flight(AnalysisKind::Waveform), Some(3));
    }

    #[test]
    fn test_unrequested_reply_does_not_start_another_loop() {
        let mut state = state();
        let id = SourceId::note(0);
        make_live(&mut state, id, 1);

        // A reply nobody asked for still lands, but issues nothing
        let commands = state.apply(waveform_reply(&[(id, 1, vec![0.2, -0.4, 0.3])]));
        assert!(commands.is_empty());
        assert_eq!(state.in_flight(AnalysisKind::Waveform), Some(1));
        let waveforms: Vec<_> = state.registry().waveforms().collect();
        assert_eq!(waveforms, vec![(id, &[-0.4, 0.3][..])]);

        // The real reply continues the single loop
        let commands = state.apply(waveform_reply_to(Some(1), &[]));
        assert_eq!(commands.len(), 1);
        assert!(state.apply(waveform_reply_to(Some(1), &[])).is_empty());
    }

    #[test]
    fn test_spectrum_requests_when_enabled() {
        let config = SynthConfig {
            spectrum_enabled: true,
            ..SynthConfig::default()
        };
        let mut state = AppState::new(&config);
        state.apply(Event::ToggleKey(SourceId::note(2)));

        let commands = state.apply(Event::AudioSourceAdded(handle(SourceId::note(2), 1)));
        let kinds: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::RequestSnapshot { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![AnalysisKind::Waveform, AnalysisKind::Spectrum]);

        // Spectrum data is stored as-is
        state.apply(Event::AnalysisReply(AnalysisReply {
            request_id: None,
            kind: AnalysisKind::Spectrum,
            analyses: vec![Analysis {
                id: SourceId::note(2),
                instance: 1,
                data: vec![-60.0, -20.0, -60.0],
            }],
        }));
        let spectra: Vec<_> = state.registry().spectra().collect();
        assert_eq!(spectra, vec![(SourceId::note(2), &[-60.0, -20.0, -60.0][..])]);
    }

    #[test]
    fn test_mic_toggle_is_binary() {
        let mut state = state();

        let commands = state.apply(Event::ToggleMic);
        assert!(matches!(
            commands.as_slice(),
            [Command::Create {
                descriptor: SourceDescriptor::InputDevice { .. },
                ..
            }]
        ));

        // Second toggle while the device is being acquired creates nothing
        assert!(state.apply(Event::ToggleMic).is_empty());

        let h = handle(SourceId::MIC, 1);
        let commands = state.apply(Event::AudioSourceAdded(h.clone()));
        assert_eq!(commands, vec![Command::Release(h)]);
        assert!(!state.registry().contains(SourceId::MIC));
    }

    #[test]
    fn test_mic_on_then_off() {
        let mut state = state();
        let h = make_live(&mut state, SourceId::MIC, 1);
        assert!(state.registry().is_live(SourceId::MIC));

        assert_eq!(state.apply(Event::ToggleMic), vec![Command::Release(h)]);
        assert!(state.registry().is_empty());
    }

    #[test]
    fn test_toggle_key_ignores_mic_id() {
        let mut state = state();
        assert!(state.apply(Event::ToggleKey(SourceId::MIC)).is_empty());
        assert!(state.registry().is_empty());
    }

    #[test]
    fn test_capture_failure_clears_pending_and_reports() {
        let mut state = state();
        state.apply(Event::ToggleMic);

        let commands = state.apply(Event::SourceFailed {
            id: SourceId::MIC,
            reason: "permission denied".to_string(),
        });
        assert!(commands.is_empty());
        assert!(state.registry().is_empty());
        assert!(state.status_message().unwrap().contains("permission denied"));

        // The mic can be tried again
        assert_eq!(state.apply(Event::ToggleMic).len(), 1);
    }

    #[test]
    fn test_unexpected_source_is_released() {
        let mut state = state();
        let h = handle(SourceId::note(3), 9);
        assert_eq!(
            state.apply(Event::AudioSourceAdded(h.clone())),
            vec![Command::Release(h)]
        );
        assert!(state.registry().is_empty());
    }

    #[test]
    fn test_zoom_guard() {
        let mut state = state();
        state.apply(Event::ViewportMeasured(ViewportGeometry::new(800.0, 200.0)));

        state.apply(Event::ZoomChange(Point::new(400.0, 0.0)));
        assert!((state.zoom().factor() - 1.0).abs() < f32::EPSILON);

        state.apply(Event::ZoomStart(Point::new(0.0, 0.0)));
        state.apply(Event::ZoomChange(Point::new(400.0, 0.0)));
        assert!((state.zoom().factor() - 0.5).abs() < f32::EPSILON);
        state.apply(Event::ZoomStop);
        assert!(!state.zoom().is_dragging());

        // After the drag ends, changes are ignored again
        state.apply(Event::ZoomChange(Point::new(800.0, 0.0)));
        assert!((state.zoom().factor() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zoom_needs_viewport() {
        let mut state = state();
        state.apply(Event::ZoomStart(Point::new(0.0, 0.0)));
        state.apply(Event::ZoomChange(Point::new(400.0, 0.0)));
        assert!((state.zoom().factor() - 1.0).abs() < f32::EPSILON);

        state.apply(Event::Resized(ViewportGeometry::new(200.0, 100.0)));
        state.apply(Event::ZoomChange(Point::new(400.0, 0.0)));
        assert!((state.zoom().factor() - 2.0).abs() < f32::EPSILON);
        assert_eq!(state.target_length(2048), 400);
    }

    #[test]
    fn test_selected_shape_applies_to_new_tones() {
        let mut state = state();
        state.apply(Event::SelectWaveShape(WaveShape::Sawtooth));

        match state.tone_descriptor(0) {
            SourceDescriptor::Tone { wave_shape, .. } => {
                assert_eq!(wave_shape, WaveShape::Sawtooth)
            }
            other => panic!("expected tone, got {:?}", other),
        }
    }
}
