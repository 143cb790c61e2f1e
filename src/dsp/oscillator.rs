//! Tone producer.
//!
//! A naive phase-accumulator oscillator with the four classic shapes.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

/// Waveform shape of a tone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaveShape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl WaveShape {
    /// Every shape, in display order.
    pub const ALL: [WaveShape; 4] = [
        WaveShape::Sine,
        WaveShape::Square,
        WaveShape::Sawtooth,
        WaveShape::Triangle,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            WaveShape::Sine => "Sine",
            WaveShape::Square => "Square",
            WaveShape::Sawtooth => "Sawtooth",
            WaveShape::Triangle => "Triangle",
        }
    }

    /// Bipolar sample (-1 to +1) at `phase` (0.0-1.0).
    pub fn sample_at(self, phase: f32) -> f32 {
        match self {
            WaveShape::Sine => (phase * TAU).sin(),
            WaveShape::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveShape::Sawtooth => 2.0 * phase - 1.0,
            WaveShape::Triangle => {
                // 0->0.25 ramps 0->1, 0.25->0.75 ramps 1->-1, 0.75->1 ramps -1->0
                if phase < 0.25 {
                    phase * 4.0
                } else if phase < 0.75 {
                    1.0 - (phase - 0.25) * 4.0
                } else {
                    -1.0 + (phase - 0.75) * 4.0
                }
            }
        }
    }
}

/// Free-running oscillator at a fixed frequency.
#[derive(Clone, Debug)]
pub struct Oscillator {
    /// Current phase accumulator (0.0 to 1.0).
    phase: f32,
    /// Phase advance per sample.
    phase_increment: f32,
    frequency: f32,
    shape: WaveShape,
}

impl Oscillator {
    pub fn new(frequency: f32, shape: WaveShape, sample_rate: f32) -> Self {
        let mut osc = Self {
            phase: 0.0,
            phase_increment: 0.0,
            frequency,
            shape,
        };
        osc.set_sample_rate(sample_rate);
        osc
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn shape(&self) -> WaveShape {
        self.shape
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.phase_increment = if sample_rate > 0.0 {
            (self.frequency / sample_rate).max(0.0)
        } else {
            0.0
        };
    }

    /// Produces one sample and advances the phase.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.shape.sample_at(self.phase);
        self.phase = (self.phase + self.phase_increment).fract();
        sample
    }
}
