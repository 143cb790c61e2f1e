//! Widgets module
//!
//! Custom UI controls for the scope interface: the multi-trace scope,
//! the spectrum view and the piano keyboard.

pub mod piano;
pub mod waveform_display;

pub use piano::{piano, PianoConfig};
pub use waveform_display::{scope, spectrum, GridStyle, ScopeConfig, Trace};
