//! Audio Engine
//!
//! Manages the cpal output stream and interfaces with system audio hardware.
//! The audio callback runs in a separate thread and must be real-time safe.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use thiserror::Error;
use tracing::{error, info};

use super::audio_processor::AudioProcessor;

/// Errors that can occur during audio engine operation.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoOutputDevice,
    #[error("Failed to get device configuration: {0}")]
    ConfigurationFailed(String),
    #[error("Failed to create audio stream: {0}")]
    StreamCreationFailed(String),
    #[error("Failed to control audio playback: {0}")]
    StreamPlaybackFailed(String),
}

/// The output side of the audio context.
pub struct AudioEngine {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioEngine {
    /// Create a new AudioEngine using the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigurationFailed(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let engine = Self {
            device,
            config,
            stream: None,
        };
        info!(
            device = %engine.current_device_name(),
            sample_rate,
            channels = engine.channels(),
            "audio output ready"
        );
        Ok(engine)
    }

    /// Get the name of the output device.
    pub fn current_device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Check if the audio stream is currently running.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Start the output stream, moving the processor into the audio callback.
    ///
    /// The callback is the processor's only owner, so no lock is needed.
    pub fn start_with_processor(&mut self, mut processor: AudioProcessor) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    processor.process(data, channels);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamCreationFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;

        self.stream = Some(stream);
        info!("audio stream started");
        Ok(())
    }

    /// Stop the audio stream.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;
            info!("audio stream stopped");
        }
        Ok(())
    }
}
