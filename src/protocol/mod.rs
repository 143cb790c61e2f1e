//! Protocol module
//!
//! Typed events and commands, their JSON wire form, and the bridge that
//! routes them between the app state and its collaborators.

pub mod bridge;
pub mod messages;
pub mod wire;

pub use bridge::Bridge;
pub use messages::{Command, Event};
pub use wire::{decode_event, encode_command, ProtocolError, WireCommand, WireEvent, WireHandle};
