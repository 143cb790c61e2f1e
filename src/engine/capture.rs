//! Capture device
//!
//! Acquires the platform microphone and turns it into a sample stream the
//! render thread can pull from. Acquisition blocks until the platform has
//! granted (or refused) the device, so callers run it off the UI thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use rtrb::{Consumer, RingBuffer};
use thiserror::Error;
use tracing::{debug, error, info};

/// Default capacity of the capture ring buffer, in mono samples.
pub const DEFAULT_CAPTURE_BUFFER_SIZE: usize = 16384;

/// Ways acquiring the input device can fail.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("failed to get input device configuration: {0}")]
    ConfigurationFailed(String),
    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),
    /// Hosts report a refused permission here.
    #[error("failed to open input stream: {0}")]
    StreamCreationFailed(String),
    #[error("failed to start input stream: {0}")]
    StreamPlaybackFailed(String),
    #[error("capture thread exited before the stream was ready")]
    Interrupted,
}

/// Something that can hand out a live input stream.
pub trait CaptureDevice: Send + Sync {
    /// Blocks until the device is granted, then returns its stream.
    fn acquire_input_stream(&self) -> Result<InputStream, CaptureError>;
}

/// Mono samples flowing in from a capture device.
///
/// Dropping the stream tells the capture side to shut down.
pub struct InputStream {
    samples: Consumer<f32>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl InputStream {
    pub fn new(samples: Consumer<f32>, running: Arc<AtomicBool>, sample_rate: u32) -> Self {
        Self {
            samples,
            running,
            sample_rate,
        }
    }

    /// Rate the device delivers at. No conversion is performed.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Next captured sample, or silence on underrun.
    ///
    /// REAL-TIME SAFE: Non-blocking.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.samples.pop().unwrap_or(0.0)
    }
}

impl Drop for InputStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("sample_rate", &self.sample_rate)
            .field("buffered", &self.samples.slots())
            .finish()
    }
}

/// The default cpal input device.
///
/// Each acquisition spawns a thread that owns the cpal stream (streams are not
/// `Send` on every host) and keeps it alive until the [`InputStream`] is dropped.
pub struct CpalCapture {
    buffer_size: usize,
}

impl CpalCapture {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_BUFFER_SIZE)
    }
}

impl CaptureDevice for CpalCapture {
    fn acquire_input_stream(&self) -> Result<InputStream, CaptureError> {
        let (mut producer, consumer) = RingBuffer::<f32>::new(self.buffer_size);
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, CaptureError>>(1);

        let thread_running = Arc::clone(&running);
        thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let opened = (|| -> Result<(cpal::Stream, u32), CaptureError> {
                    let host = cpal::default_host();
                    let device = host
                        .default_input_device()
                        .ok_or(CaptureError::NoInputDevice)?;
                    let supported = device
                        .default_input_config()
                        .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
                    if supported.sample_format() != SampleFormat::F32 {
                        return Err(CaptureError::UnsupportedFormat(format!(
                            "{:?}",
                            supported.sample_format()
                        )));
                    }

                    let config = supported.config();
                    let channels = config.channels.max(1) as usize;
                    let sample_rate = config.sample_rate.0;
                    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    info!(
                        device = %device_name,
                        sample_rate,
                        channels,
                        "opening input stream"
                    );

                    let stream = device
                        .build_input_stream(
                            &config,
                            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                                // Downmix to mono; drop samples if the render side falls behind
                                for frame in data.chunks(channels) {
                                    let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                                    let _ = producer.push(mono);
                                }
                            },
                            |err| {
                                error!("Input stream error: {}", err);
                            },
                            None,
                        )
                        .map_err(|e| CaptureError::StreamCreationFailed(e.to_string()))?;
                    stream
                        .play()
                        .map_err(|e| CaptureError::StreamPlaybackFailed(e.to_string()))?;
                    Ok((stream, sample_rate))
                })();

                match opened {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        while thread_running.load(Ordering::Relaxed) {
                            thread::park_timeout(Duration::from_millis(100));
                        }
                        drop(stream);
                        debug!("input stream closed");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CaptureError::StreamCreationFailed(e.to_string()))?;

        let sample_rate = ready_rx.recv().map_err(|_| CaptureError::Interrupted)??;
        Ok(InputStream::new(consumer, running, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_stream_underrun_is_silence() {
        let (mut producer, consumer) = RingBuffer::new(4);
        let mut stream = InputStream::new(consumer, Arc::new(AtomicBool::new(true)), 48000);

        producer.push(0.25).unwrap();
        assert!((stream.next_sample() - 0.25).abs() < f32::EPSILON);
        assert_eq!(stream.next_sample(), 0.0);
        assert_eq!(stream.sample_rate(), 48000);
    }

    #[test]
    fn test_dropping_stream_stops_capture() {
        let (_producer, consumer) = RingBuffer::<f32>::new(4);
        let running = Arc::new(AtomicBool::new(true));
        let stream = InputStream::new(consumer, Arc::clone(&running), 44100);

        drop(stream);
        assert!(!running.load(Ordering::Relaxed));
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::NoInputDevice;
        assert_eq!(err.to_string(), "no audio input device available");

        let err = CaptureError::StreamCreationFailed("permission denied".to_string());
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_input_stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<InputStream>();
    }
}
