//! Application module
//!
//! Contains the main egui application and theme definitions.

pub mod synth_app;
pub mod theme;

pub use synth_app::SynthApp;
