//! Voice graph
//!
//! One source's graph: producer -> gain -> output, with the producer also
//! feeding the analysis tap in parallel. Voices are built on the control
//! side and moved into the render thread ready to play.

use std::sync::Arc;

use crate::dsp::{AnalyserTap, GainParam, Oscillator};
use crate::source::InstanceId;

use super::capture::InputStream;

/// The node that generates a voice's signal.
#[derive(Debug)]
pub enum Producer {
    Tone(Oscillator),
    Input(InputStream),
}

impl Producer {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        match self {
            Producer::Tone(osc) => osc.next_sample(),
            Producer::Input(stream) => stream.next_sample(),
        }
    }
}

/// How a voice's gain behaves when it starts sounding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Onset {
    /// Ramp linearly from silence over the given seconds.
    Attack(f32),
    /// Jump straight to the sounding level.
    Immediate,
}

/// A live source graph inside the render thread.
#[derive(Debug)]
pub struct Voice {
    instance: InstanceId,
    producer: Producer,
    gain: GainParam,
    tap: Arc<AnalyserTap>,
    onset: Onset,
    sounding_level: f32,
    /// Audio time at which the graph gets disconnected.
    teardown_at: Option<f64>,
}

impl Voice {
    /// Builds a voice with its gain at silence. Nothing sounds until [`Voice::start`].
    pub fn new(
        instance: InstanceId,
        producer: Producer,
        tap: Arc<AnalyserTap>,
        onset: Onset,
        sounding_level: f32,
    ) -> Self {
        Self {
            instance,
            producer,
            gain: GainParam::new(0.0),
            tap,
            onset,
            sounding_level,
            teardown_at: None,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Starts the envelope at audio time `now`.
    pub fn start(&mut self, now: f64) {
        match self.onset {
            Onset::Attack(seconds) => {
                self.gain.set_value(0.0);
                self.gain
                    .linear_ramp_to(self.sounding_level, now, seconds as f64);
            }
            Onset::Immediate => self.gain.set_value(self.sounding_level),
        }
    }

    /// Ramps to silence over `release_seconds` and schedules teardown for
    /// when the ramp ends. Returns false if a release was already scheduled,
    /// in which case nothing changes.
    pub fn release(&mut self, now: f64, release_seconds: f32) -> bool {
        if self.teardown_at.is_some() {
            return false;
        }
        let duration = release_seconds.max(0.0) as f64;
        self.gain.linear_ramp_to(0.0, now, duration);
        self.teardown_at = Some(now + duration);
        true
    }

    pub fn is_releasing(&self) -> bool {
        self.teardown_at.is_some()
    }

    pub fn teardown_at(&self) -> Option<f64> {
        self.teardown_at
    }

    /// Returns true once the release has run its course.
    pub fn is_expired(&self, now: f64) -> bool {
        self.teardown_at.map(|t| now >= t).unwrap_or(false)
    }

    /// Gain at audio time `time`.
    pub fn gain_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }

    /// Renders one sample at audio time `time`.
    ///
    /// REAL-TIME SAFE: No allocations, no locks.
    #[inline]
    pub fn render(&mut self, time: f64) -> f32 {
        let sample = self.producer.next_sample();
        self.tap.push(sample);
        sample * self.gain.value_at(time)
    }
}
