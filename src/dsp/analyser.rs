//! Analysis tap node.
//!
//! The tap sits in parallel with a source's gain stage and keeps the most
//! recent `window_size` producer samples. The render thread is the single
//! writer; any thread may take snapshots. Samples are stored as `f32` bits in
//! atomics so neither side ever blocks. A snapshot taken while the render
//! thread writes may mix two adjacent blocks, which is fine for display.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Default analysis window, in samples.
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// Floor for frequency bins, in dB.
pub const MIN_DECIBELS: f32 = -100.0;

/// Ring buffer of the latest producer samples.
pub struct AnalyserTap {
    samples: Box<[AtomicU32]>,
    write_pos: AtomicUsize,
}

impl AnalyserTap {
    /// Creates a silent tap. Windows smaller than 2 samples are widened to 2.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(2);
        let samples = (0..window_size)
            .map(|_| AtomicU32::new(0.0_f32.to_bits()))
            .collect();
        Self {
            samples,
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Length of a time-domain snapshot.
    pub fn window_size(&self) -> usize {
        self.samples.len()
    }

    /// Length of a frequency-domain snapshot.
    pub fn bin_count(&self) -> usize {
        self.samples.len() / 2
    }

    /// Appends one sample. Render thread only.
    #[inline]
    pub fn push(&self, sample: f32) {
        let pos = self.write_pos.load(Ordering::Relaxed);
        self.samples[pos].store(sample.to_bits(), Ordering::Relaxed);
        self.write_pos
            .store((pos + 1) % self.samples.len(), Ordering::Release);
    }

    /// Appends a block of samples. Render thread only.
    pub fn push_block(&self, block: &[f32]) {
        for &sample in block {
            self.push(sample);
        }
    }

    /// The last `window_size` samples, oldest first.
    pub fn time_domain(&self) -> Vec<f32> {
        let len = self.samples.len();
        let start = self.write_pos.load(Ordering::Acquire);
        (0..len)
            .map(|i| f32::from_bits(self.samples[(start + i) % len].load(Ordering::Relaxed)))
            .collect()
    }

    /// Magnitude spectrum of the current window in dB, `window_size / 2` bins.
    ///
    /// The window is Blackman-weighted before the transform; magnitudes are
    /// normalised by the window length and floored at [`MIN_DECIBELS`].
    pub fn frequency_domain(&self, planner: &mut FftPlanner<f32>) -> Vec<f32> {
        let samples = self.time_domain();
        let n = samples.len();
        let fft = planner.plan_fft_forward(n);

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| Complex::new(s * blackman(i, n), 0.0))
            .collect();
        fft.process(&mut buffer);

        buffer
            .iter()
            .take(n / 2)
            .map(|bin| {
                let magnitude = bin.norm() / n as f32;
                if magnitude > 0.0 {
                    (20.0 * magnitude.log10()).max(MIN_DECIBELS)
                } else {
                    MIN_DECIBELS
                }
            })
            .collect()
    }
}

impl fmt::Debug for AnalyserTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyserTap")
            .field("window_size", &self.samples.len())
            .finish_non_exhaustive()
    }
}

fn blackman(i: usize, n: usize) -> f32 {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let x = i as f32 / n as f32;
    A0 - A1 * (std::f32::consts::TAU * x).cos() + A2 * (2.0 * std::f32::consts::TAU * x).cos()
}
