//! DSP module
//!
//! Node primitives a source graph is built from: the tone producer, the
//! automatable gain stage and the analysis tap.

pub mod analyser;
pub mod gain;
pub mod oscillator;

pub use analyser::{AnalyserTap, DEFAULT_WINDOW_SIZE};
pub use gain::GainParam;
pub use oscillator::{Oscillator, WaveShape};
