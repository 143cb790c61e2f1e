//! Pluck Scope Library
//!
//! Core library for the pluck synthesizer and its live waveform scope.
//! The UI feeds [`protocol::Event`]s into a [`session::Session`], which
//! applies them to the [`state::AppState`] and hands the resulting commands
//! to the audio graph manager and the analysis worker.

pub mod analysis;
pub mod app;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod protocol;
pub mod session;
pub mod source;
pub mod state;
pub mod widgets;
