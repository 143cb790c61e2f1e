//! Session
//!
//! The single-writer loop: every event, whether from the UI or from a
//! collaborator, goes through [`Session::handle`], which applies it to the
//! app state and dispatches the resulting commands.

use std::io;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use tracing::debug;

use crate::analysis::AnalysisWorker;
use crate::config::SynthConfig;
use crate::engine::{AudioGraphManager, AudioProcessor, CaptureDevice, RenderChannels};
use crate::protocol::{Bridge, Event};
use crate::state::AppState;

pub struct Session {
    state: AppState,
    bridge: Bridge,
}

impl Session {
    pub fn new(state: AppState, bridge: Bridge) -> Self {
        Self { state, bridge }
    }

    /// Wires up the graph manager, the analysis worker and the app state.
    ///
    /// Returns the render-side processor, which the caller hands to the
    /// output stream (or drives by hand).
    pub fn build(
        config: &SynthConfig,
        sample_rate: f32,
        capture: Arc<dyn CaptureDevice>,
    ) -> io::Result<(Self, AudioProcessor)> {
        let (control, render) =
            RenderChannels::new(config.command_capacity, config.event_capacity).split();
        let (graph_tx, graph_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();

        let graph = AudioGraphManager::new(
            control,
            capture,
            graph_tx,
            sample_rate,
            config.window_size,
            config.sounding_gain,
        );
        let worker = AnalysisWorker::spawn(reply_tx)?;
        let bridge = Bridge::new(graph, worker, graph_rx, reply_rx);
        let processor = AudioProcessor::new(sample_rate, render);

        debug!(sample_rate, window = config.window_size, "session built");
        Ok((Self::new(AppState::new(config), bridge), processor))
    }

    /// Applies one event and dispatches whatever it produced.
    pub fn handle(&mut self, event: Event) {
        for command in self.state.apply(event) {
            self.bridge.dispatch(command);
        }
    }

    /// Handles an event arriving as JSON. Returns false if it was dropped.
    pub fn handle_wire(&mut self, json: &str) -> bool {
        match self.bridge.ingest_wire(json) {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Handles everything the collaborators reported since the last pump.
    ///
    /// Events produced while handling are left for the next pump, so one
    /// call always terminates. Returns how many events were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.bridge.poll();
        let count = events.len();
        for event in events {
            self.handle(event);
        }
        count
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn clear_status_message(&mut self) {
        self.state.clear_status_message();
    }

    /// Peak output level from the last metering report.
    pub fn output_peak(&self) -> f32 {
        self.bridge.graph().output_peak()
    }

    /// Render CPU load from the last metering report (0-100).
    pub fn cpu_load(&self) -> f32 {
        self.bridge.graph().cpu_load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::{Duration, Instant};

    use rtrb::RingBuffer;

    use crate::engine::{CaptureError, InputStream};
    use crate::source::SourceId;

    struct SteadyMic;

    impl CaptureDevice for SteadyMic {
        fn acquire_input_stream(&self) -> Result<InputStream, CaptureError> {
            let (mut producer, consumer) = RingBuffer::new(256);
            for i in 0..256 {
                let _ = producer.push((i as f32 * 0.2).sin());
            }
            Ok(InputStream::new(consumer, Arc::new(AtomicBool::new(true)), 1000))
        }
    }

    fn session() -> (Session, AudioProcessor) {
        let config = SynthConfig {
            window_size: 64,
            ..SynthConfig::default()
        };
        Session::build(&config, 1000.0, Arc::new(SteadyMic)).unwrap()
    }

    /// Renders a block and pumps until `done` holds.
    fn run_until<F: Fn(&Session) -> bool>(
        session: &mut Session,
        processor: &mut AudioProcessor,
        done: F,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut output = vec![0.0; 32];
        while !done(session) {
            assert!(Instant::now() < deadline, "condition never held");
            processor.process(&mut output, 1);
            session.pump();
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn waveform_len(session: &Session, id: SourceId) -> usize {
        session
            .state()
            .registry()
            .waveforms()
            .find(|(wid, _)| *wid == id)
            .map(|(_, data)| data.len())
            .unwrap_or(0)
    }

    #[test]
    fn test_key_press_fills_waveform() {
        let (mut session, mut processor) = session();
        let id = SourceId::note(0);

        session.handle(Event::ToggleKey(id));
        run_until(&mut session, &mut processor, |s| waveform_len(s, id) > 0);

        assert!(session.state().registry().is_live(id));
    }

    #[test]
    fn test_release_stops_updates() {
        let (mut session, mut processor) = session();
        let id = SourceId::note(3);

        session.handle(Event::ToggleKey(id));
        run_until(&mut session, &mut processor, |s| waveform_len(s, id) > 0);

        session.handle(Event::ToggleKey(id));
        assert!(!session.state().registry().contains(id));

        // Replies still in flight land on nothing
        let mut output = vec![0.0; 32];
        for _ in 0..10 {
            processor.process(&mut output, 1);
            session.pump();
        }
        assert!(!session.state().registry().contains(id));
    }

    #[test]
    fn test_mic_goes_live() {
        let (mut session, mut processor) = session();

        session.handle(Event::ToggleMic);
        run_until(&mut session, &mut processor, |s| {
            s.state().registry().is_live(SourceId::MIC)
        });

        session.handle(Event::ToggleMic);
        assert!(session.state().registry().is_empty());
    }

    #[test]
    fn test_handle_wire() {
        let (mut session, _processor) = session();

        assert!(session.handle_wire(r#"{"type":"toggleKey","id":1}"#));
        assert!(session.state().registry().contains(SourceId::note(1)));
        assert!(!session.handle_wire(r#"{"type":"toggleKey"}"#));
    }
}
