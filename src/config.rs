//! Synth configuration
//!
//! Every tunable constant in one serde-friendly record. Defaults are built in
//! code; a JSON document can override any subset of fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::{WaveShape, DEFAULT_WINDOW_SIZE};
use crate::engine::{DEFAULT_COMMAND_BUFFER_SIZE, DEFAULT_EVENT_BUFFER_SIZE};
use crate::source::{
    EnvelopeParams, DEFAULT_INTERVAL_OFFSET, DEFAULT_REFERENCE_HZ, DEFAULT_SOUNDING_GAIN,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    pub envelope: EnvelopeParams,
    /// Gain every source settles at.
    pub sounding_gain: f32,
    pub reference_hz: f32,
    /// Semitones added to every interval index.
    pub interval_offset: i32,
    /// Analysis tap length in samples. Must be a power of two.
    pub window_size: usize,
    pub wave_shape: WaveShape,
    /// Also request spectra alongside waveforms.
    pub spectrum_enabled: bool,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopeParams::default(),
            sounding_gain: DEFAULT_SOUNDING_GAIN,
            reference_hz: DEFAULT_REFERENCE_HZ,
            interval_offset: DEFAULT_INTERVAL_OFFSET,
            window_size: DEFAULT_WINDOW_SIZE,
            wave_shape: WaveShape::default(),
            spectrum_enabled: false,
            command_capacity: DEFAULT_COMMAND_BUFFER_SIZE,
            event_capacity: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl SynthConfig {
    /// Parses a JSON document over the defaults and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        };

        positive("envelope.attackSeconds", self.envelope.attack_seconds)?;
        positive("envelope.releaseSeconds", self.envelope.release_seconds)?;
        positive("soundingGain", self.sounding_gain)?;
        positive("referenceHz", self.reference_hz)?;

        if self.window_size < 2 || !self.window_size.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "windowSize",
                reason: format!("must be a power of two of at least 2, got {}", self.window_size),
            });
        }
        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "commandCapacity/eventCapacity",
                reason: "channel capacities must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
