//! Audio Processor
//!
//! Runs in the audio callback: applies commands from the graph manager,
//! mixes every live voice into the output and tears voices down once their
//! release has finished.

use std::time::Instant;

use super::channels::RenderHandle;
use super::commands::{RenderCommand, RenderEvent};
use super::voice::Voice;
use crate::source::InstanceId;

/// Voice slots reserved up front so adding a voice normally doesn't allocate.
const INITIAL_VOICE_CAPACITY: usize = 32;

/// Audio processor that runs in the audio callback.
///
/// This struct is moved into the audio callback closure and handles:
/// - Receiving voices and release requests from the graph manager
/// - Summing every connected voice into the output buffer
/// - Disconnecting voices whose release ramp has ended
pub struct AudioProcessor {
    /// Connected voices, in the order they were added.
    voices: Vec<Box<Voice>>,
    /// Handle for talking to the graph manager.
    render_handle: RenderHandle,
    sample_rate: f32,
    /// Frames rendered since the processor was created. This is the audio clock.
    frames_rendered: u64,
    /// Callback counter for throttling metering events.
    frame_counter: u32,
    /// Running average of CPU load (0.0-100.0).
    cpu_load_avg: f32,
    /// Highest absolute output sample since the last level report.
    peak: f32,
    /// Teardowns the event queue had no room for. Retried every callback,
    /// since the manager only forgets a graph once it hears about it.
    undelivered_teardowns: Vec<InstanceId>,
}

impl AudioProcessor {
    /// How often to send metering events (in audio callbacks).
    /// At 44100Hz with 256 sample blocks, this is about 172 callbacks/sec.
    /// Sending every 8 callbacks gives ~21Hz update rate.
    const REPORT_INTERVAL: u32 = 8;

    /// Smoothing factor for CPU load averaging (0-1, higher = more responsive).
    const CPU_SMOOTHING: f32 = 0.3;

    pub fn new(sample_rate: f32, render_handle: RenderHandle) -> Self {
        Self {
            voices: Vec::with_capacity(INITIAL_VOICE_CAPACITY),
            render_handle,
            sample_rate: sample_rate.max(1.0),
            frames_rendered: 0,
            frame_counter: 0,
            cpu_load_avg: 0.0,
            peak: 0.0,
            undelivered_teardowns: Vec::with_capacity(INITIAL_VOICE_CAPACITY),
        }
    }

    /// Current audio time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    /// Number of connected voices, including ones still releasing.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Processes a block of audio.
    ///
    /// `output` is interleaved with `channels` channels; every channel gets
    /// the same mono mix.
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        let start_time = Instant::now();
        let channels = channels.max(1);

        self.flush_teardowns();
        self.process_commands();

        let num_frames = output.len() / channels;
        for frame in output.chunks_mut(channels) {
            let time = self.current_time();
            let mut mix = 0.0;
            for voice in self.voices.iter_mut() {
                mix += voice.render(time);
            }
            let mix = mix.clamp(-1.0, 1.0);
            self.peak = self.peak.max(mix.abs());

            for sample in frame.iter_mut() {
                *sample = mix;
            }
            self.frames_rendered += 1;
        }

        self.teardown_expired();

        // Calculate CPU load
        let elapsed = start_time.elapsed();
        let available_time = num_frames.max(1) as f64 / self.sample_rate as f64;
        let cpu_percent = (elapsed.as_secs_f64() / available_time * 100.0) as f32;

        self.cpu_load_avg = Self::CPU_SMOOTHING * cpu_percent
            + (1.0 - Self::CPU_SMOOTHING) * self.cpu_load_avg;

        self.frame_counter += 1;
        if self.frame_counter >= Self::REPORT_INTERVAL {
            self.frame_counter = 0;
            self.render_handle
                .send_event_lossy(RenderEvent::OutputLevel { peak: self.peak });
            self.render_handle
                .send_event_lossy(RenderEvent::CpuLoad(self.cpu_load_avg));
            self.peak = 0.0;
        }
    }

    /// Processes all pending commands from the graph manager.
    fn process_commands(&mut self) {
        let now = self.current_time();
        while let Some(cmd) = self.render_handle.recv_command() {
            match cmd {
                RenderCommand::AddVoice(mut voice) => {
                    voice.start(now);
                    let instance = voice.instance();
                    self.voices.push(voice);
                    self.render_handle
                        .send_event_lossy(RenderEvent::VoiceStarted { instance, at: now });
                }
                RenderCommand::ReleaseVoice {
                    instance,
                    release_seconds,
                } => {
                    let voice = self.voices.iter_mut().find(|v| v.instance() == instance);
                    if let Some(voice) = voice {
                        if voice.release(now, release_seconds) {
                            if let Some(teardown_at) = voice.teardown_at() {
                                self.render_handle.send_event_lossy(
                                    RenderEvent::VoiceReleased {
                                        instance,
                                        teardown_at,
                                    },
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    /// Disconnects voices whose release has completed.
    fn teardown_expired(&mut self) {
        let now = self.current_time();
        let handle = &mut self.render_handle;
        let undelivered = &mut self.undelivered_teardowns;
        self.voices.retain(|voice| {
            if !voice.is_expired(now) {
                return true;
            }
            let instance = voice.instance();
            if handle
                .send_event(RenderEvent::VoiceTornDown { instance })
                .is_err()
            {
                undelivered.push(instance);
            }
            false
        });
    }

    /// Resends teardown events that found the event queue full.
    fn flush_teardowns(&mut self) {
        let handle = &mut self.render_handle;
        self.undelivered_teardowns.retain(|&instance| {
            handle
                .send_event(RenderEvent::VoiceTornDown { instance })
                .is_err()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::dsp::{AnalyserTap, Oscillator, WaveShape};
    use crate::engine::channels::{ControlHandle, RenderChannels};
    use crate::engine::voice::{Onset, Producer};

    const SAMPLE_RATE: f32 = 1000.0;

    fn processor() -> (ControlHandle, AudioProcessor) {
        let (control, render) = RenderChannels::with_defaults().split();
        (control, AudioProcessor::new(SAMPLE_RATE, render))
    }

    fn square_voice(instance: u64, onset: Onset) -> Box<Voice> {
        Box::new(Voice::new(
            instance,
            Producer::Tone(Oscillator::new(1.0, WaveShape::Square, SAMPLE_RATE)),
            Arc::new(AnalyserTap::new(64)),
            onset,
            0.5,
        ))
    }

    #[test]
    fn test_silence_without_voices() {
        let (_control, mut processor) = processor();

        let mut output = vec![1.0; 512];
        processor.process(&mut output, 2);

        assert!(output.iter().all(|&s| s == 0.0));
        assert!((processor.current_time() - 0.256).abs() < 1e-9);
    }

    #[test]
    fn test_add_voice_reports_start() {
        let (mut control, mut processor) = processor();

        control
            .send_command(RenderCommand::AddVoice(square_voice(1, Onset::Immediate)))
            .unwrap();

        let mut output = vec![0.0; 8];
        processor.process(&mut output, 2);

        assert_eq!(processor.voice_count(), 1);
        // Square at phase 0 is +1, times 0.5 gain
        assert!((output[0] - 0.5).abs() < f32::EPSILON);
        assert_eq!(output[0], output[1]);

        let event = control.recv_event();
        assert!(matches!(
            event,
            Some(RenderEvent::VoiceStarted { instance: 1, .. })
        ));
    }

    #[test]
    fn test_release_then_teardown() {
        let (mut control, mut processor) = processor();

        control
            .send_command(RenderCommand::AddVoice(square_voice(4, Onset::Immediate)))
            .unwrap();
        let mut output = vec![0.0; 10];
        processor.process(&mut output, 1);

        // 0.05s release at 1kHz is 50 frames
        control
            .send_command(RenderCommand::ReleaseVoice {
                instance: 4,
                release_seconds: 0.05,
            })
            .unwrap();
        let mut output = vec![0.0; 20];
        processor.process(&mut output, 1);
        assert_eq!(processor.voice_count(), 1);

        let mut output = vec![0.0; 40];
        processor.process(&mut output, 1);
        assert_eq!(processor.voice_count(), 0);

        let events: Vec<_> = control.drain_events().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RenderEvent::VoiceReleased { instance: 4, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, RenderEvent::VoiceTornDown { instance: 4 })));
    }

    #[test]
    fn test_teardown_survives_full_event_queue() {
        let (mut control, render) = RenderChannels::new(16, 1).split();
        let mut processor = AudioProcessor::new(SAMPLE_RATE, render);

        control
            .send_command(RenderCommand::AddVoice(square_voice(4, Onset::Immediate)))
            .unwrap();
        let mut output = vec![0.0; 10];
        processor.process(&mut output, 1);

        // VoiceStarted now fills the queue, so the teardown cannot be sent yet
        control
            .send_command(RenderCommand::ReleaseVoice {
                instance: 4,
                release_seconds: 0.01,
            })
            .unwrap();
        let mut output = vec![0.0; 20];
        processor.process(&mut output, 1);
        assert_eq!(processor.voice_count(), 0);

        let events: Vec<_> = control.drain_events().collect();
        assert!(!events
            .iter()
            .any(|e| matches!(e, RenderEvent::VoiceTornDown { .. })));

        let mut output = vec![0.0; 4];
        processor.process(&mut output, 1);
        let events: Vec<_> = control.drain_events().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RenderEvent::VoiceTornDown { instance: 4 })));
    }

    #[test]
    fn test_duplicate_release_reports_once() {
        let (mut control, mut processor) = processor();

        control
            .send_command(RenderCommand::AddVoice(square_voice(2, Onset::Immediate)))
            .unwrap();
        for _ in 0..2 {
            control
                .send_command(RenderCommand::ReleaseVoice {
                    instance: 2,
                    release_seconds: 1.0,
                })
                .unwrap();
        }
        let mut output = vec![0.0; 4];
        processor.process(&mut output, 1);

        let released = control
            .drain_events()
            .filter(|e| matches!(e, RenderEvent::VoiceReleased { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn test_release_unknown_instance_is_ignored() {
        let (mut control, mut processor) = processor();

        control
            .send_command(RenderCommand::ReleaseVoice {
                instance: 99,
                release_seconds: 0.5,
            })
            .unwrap();
        let mut output = vec![0.0; 4];
        processor.process(&mut output, 1);

        assert!(control.recv_event().is_none());
    }

    #[test]
    fn test_output_is_clamped() {
        let (mut control, mut processor) = processor();

        for instance in 0..4 {
            control
                .send_command(RenderCommand::AddVoice(square_voice(
                    instance,
                    Onset::Immediate,
                )))
                .unwrap();
        }
        let mut output = vec![0.0; 4];
        processor.process(&mut output, 1);

        assert!(output.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_metering_events_are_throttled() {
        let (mut control, mut processor) = processor();

        let mut output = vec![0.0; 16];
        for _ in 0..AudioProcessor::REPORT_INTERVAL {
            processor.process(&mut output, 2);
        }

        let events: Vec<_> = control.drain_events().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RenderEvent::OutputLevel { .. })));
        assert!(events.iter().any(|e| matches!(e, RenderEvent::CpuLoad(_))));
    }

    #[test]
    fn test_processor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioProcessor>();
    }
}
