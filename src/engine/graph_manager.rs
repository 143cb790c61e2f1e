//! Audio Graph Manager
//!
//! The control-side owner of every live source graph. Graphs are built here,
//! shipped to the render thread over the command queue, and forgotten once
//! the render thread reports them torn down. Creation outcomes are reported
//! as [`GraphEvent`]s rather than return values, because the capture path
//! completes on another thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rustfft::FftPlanner;
use tracing::{debug, info, trace, warn};

use crate::analysis::{Analysis, AnalysisItem, AnalysisKind};
use crate::dsp::{AnalyserTap, Oscillator};
use crate::source::{
    AudioSourceHandle, EnvelopeParams, GraphRef, InstanceId, SourceDescriptor, SourceId,
};

use super::capture::{CaptureDevice, CaptureError, InputStream};
use super::channels::ControlHandle;
use super::commands::{GraphEvent, RenderCommand, RenderEvent};
use super::voice::{Onset, Producer, Voice};

/// Bookkeeping for one graph the render thread owns.
#[derive(Debug)]
struct GraphRecord {
    id: SourceId,
    tap: Arc<AnalyserTap>,
    envelope: EnvelopeParams,
    releasing: bool,
}

/// Result of a capture acquisition thread.
struct Acquisition {
    id: SourceId,
    instance: InstanceId,
    envelope: EnvelopeParams,
    tap: Arc<AnalyserTap>,
    result: Result<InputStream, CaptureError>,
}

pub struct AudioGraphManager {
    control: ControlHandle,
    capture: Arc<dyn CaptureDevice>,
    events: Sender<GraphEvent>,
    acquisitions_tx: Sender<Acquisition>,
    acquisitions_rx: Receiver<Acquisition>,
    graphs: HashMap<InstanceId, GraphRecord>,
    next_instance: InstanceId,
    sample_rate: f32,
    window_size: usize,
    sounding_gain: f32,
    output_peak: f32,
    cpu_load: f32,
}

impl AudioGraphManager {
    pub fn new(
        control: ControlHandle,
        capture: Arc<dyn CaptureDevice>,
        events: Sender<GraphEvent>,
        sample_rate: f32,
        window_size: usize,
        sounding_gain: f32,
    ) -> Self {
        let (acquisitions_tx, acquisitions_rx) = unbounded();
        Self {
            control,
            capture,
            events,
            acquisitions_tx,
            acquisitions_rx,
            graphs: HashMap::new(),
            next_instance: 1,
            sample_rate,
            window_size,
            sounding_gain,
            output_peak: 0.0,
            cpu_load: 0.0,
        }
    }

    /// Builds the graph for `id`.
    ///
    /// Tones are wired immediately and reported before this returns. The
    /// input device is acquired on a helper thread; its outcome is reported
    /// by a later [`AudioGraphManager::poll`].
    pub fn create(&mut self, id: SourceId, descriptor: SourceDescriptor) {
        let instance = self.next_instance;
        self.next_instance += 1;
        let tap = Arc::new(AnalyserTap::new(self.window_size));
        let envelope = descriptor.envelope();

        match descriptor {
            SourceDescriptor::Tone {
                frequency,
                wave_shape,
                ..
            } => {
                debug!(%id, instance, frequency, shape = wave_shape.name(), "creating tone");
                let producer =
                    Producer::Tone(Oscillator::new(frequency, wave_shape, self.sample_rate));
                self.connect(
                    id,
                    instance,
                    producer,
                    tap,
                    Onset::Attack(envelope.attack_seconds),
                    envelope,
                );
            }
            SourceDescriptor::InputDevice { .. } => {
                debug!(%id, instance, "acquiring input device");
                let capture = Arc::clone(&self.capture);
                let acquisitions = self.acquisitions_tx.clone();
                let spawned = thread::Builder::new()
                    .name("capture-acquire".to_string())
                    .spawn(move || {
                        let result = capture.acquire_input_stream();
                        let _ = acquisitions.send(Acquisition {
                            id,
                            instance,
                            envelope,
                            tap,
                            result,
                        });
                    });
                if let Err(e) = spawned {
                    self.fail(id, format!("could not start capture thread: {}", e));
                }
            }
        }
    }

    /// Ramps the handle's graph to silence and schedules its teardown.
    ///
    /// Releasing a graph that is already releasing, or already gone, does nothing.
    pub fn release(&mut self, handle: &AudioSourceHandle) {
        let instance = handle.instance();
        let Some(record) = self.graphs.get_mut(&instance) else {
            debug!(id = %handle.id, instance, "release of unknown graph ignored");
            return;
        };
        if record.releasing {
            debug!(id = %handle.id, instance, "graph already releasing");
            return;
        }

        let release_seconds = record.envelope.release_seconds;
        match self.control.send_command(RenderCommand::ReleaseVoice {
            instance,
            release_seconds,
        }) {
            Ok(()) => {
                record.releasing = true;
                debug!(id = %record.id, instance, release_seconds, "release scheduled");
            }
            Err(_) => warn!(id = %record.id, instance, "render queue full, release dropped"),
        }
    }

    /// Finishes pending capture acquisitions and drains render-thread events.
    pub fn poll(&mut self) {
        while let Ok(acquisition) = self.acquisitions_rx.try_recv() {
            let Acquisition {
                id,
                instance,
                envelope,
                tap,
                result,
            } = acquisition;
            match result {
                Ok(stream) => {
                    if stream.sample_rate() as f32 != self.sample_rate {
                        warn!(
                            input_rate = stream.sample_rate(),
                            output_rate = self.sample_rate,
                            "input and output sample rates differ, no conversion is applied"
                        );
                    }
                    self.connect(
                        id,
                        instance,
                        Producer::Input(stream),
                        tap,
                        Onset::Immediate,
                        envelope,
                    );
                }
                Err(e) => {
                    warn!(%id, error = %e, "input device unavailable");
                    self.fail(id, e.to_string());
                }
            }
        }

        while let Some(event) = self.control.recv_event() {
            match event {
                RenderEvent::VoiceStarted { instance, at } => {
                    trace!(instance, at, "voice started");
                }
                RenderEvent::VoiceReleased {
                    instance,
                    teardown_at,
                } => {
                    trace!(instance, teardown_at, "voice releasing");
                }
                RenderEvent::VoiceTornDown { instance } => {
                    if let Some(record) = self.graphs.remove(&instance) {
                        debug!(id = %record.id, instance, "graph torn down");
                    }
                }
                RenderEvent::OutputLevel { peak } => self.output_peak = peak,
                RenderEvent::CpuLoad(load) => self.cpu_load = load,
            }
        }
    }

    /// Reads the requested buffer from each item's tap. Never touches the live graph.
    pub fn extract_snapshot(
        items: &[AnalysisItem],
        kind: AnalysisKind,
        planner: &mut FftPlanner<f32>,
    ) -> Vec<Analysis> {
        items
            .iter()
            .map(|item| {
                let tap = item.graph.tap();
                let data = match kind {
                    AnalysisKind::Waveform => tap.time_domain(),
                    AnalysisKind::Spectrum => tap.frequency_domain(planner),
                };
                Analysis {
                    id: item.id,
                    instance: item.graph.instance(),
                    data,
                }
            })
            .collect()
    }

    /// Reference to a graph the render thread still owns.
    pub fn graph_ref(&self, instance: InstanceId) -> Option<GraphRef> {
        self.graphs
            .get(&instance)
            .map(|record| GraphRef::new(instance, Arc::clone(&record.tap)))
    }

    /// Graphs the render thread still owns, releasing ones included.
    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    /// Returns true if the instance has been told to release.
    pub fn is_releasing(&self, instance: InstanceId) -> bool {
        self.graphs
            .get(&instance)
            .map(|record| record.releasing)
            .unwrap_or(false)
    }

    /// Peak output level from the last metering report.
    pub fn output_peak(&self) -> f32 {
        self.output_peak
    }

    /// Smoothed render CPU load from the last metering report (0-100).
    pub fn cpu_load(&self) -> f32 {
        self.cpu_load
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn connect(
        &mut self,
        id: SourceId,
        instance: InstanceId,
        producer: Producer,
        tap: Arc<AnalyserTap>,
        onset: Onset,
        envelope: EnvelopeParams,
    ) {
        let graph = GraphRef::new(instance, Arc::clone(&tap));
        let voice = Voice::new(
            instance,
            producer,
            Arc::clone(&tap),
            onset,
            self.sounding_gain,
        );

        if self
            .control
            .send_command(RenderCommand::AddVoice(Box::new(voice)))
            .is_err()
        {
            warn!(%id, instance, "render queue full, graph dropped");
            self.fail(id, "audio engine is busy".to_string());
            return;
        }

        self.graphs.insert(
            instance,
            GraphRecord {
                id,
                tap,
                envelope,
                releasing: false,
            },
        );
        info!(%id, instance, "source added");
        let _ = self
            .events
            .send(GraphEvent::SourceAdded(AudioSourceHandle::new(id, graph)));
    }

    fn fail(&mut self, id: SourceId, reason: String) {
        let _ = self.events.send(GraphEvent::SourceFailed { id, reason });
    }
}
