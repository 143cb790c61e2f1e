//! Engine module
//!
//! Audio output, the render-thread voice mixer, and the graph manager that
//! creates and releases source graphs on the render thread's behalf.

pub mod audio_engine;
pub mod audio_processor;
pub mod capture;
pub mod channels;
pub mod commands;
pub mod graph_manager;
pub mod voice;

pub use audio_engine::{AudioEngine, AudioError};
pub use audio_processor::AudioProcessor;
pub use capture::{CaptureDevice, CaptureError, CpalCapture, InputStream};
pub use channels::{
    ControlHandle, RenderChannels, RenderHandle, DEFAULT_COMMAND_BUFFER_SIZE,
    DEFAULT_EVENT_BUFFER_SIZE,
};
pub use commands::{GraphEvent, RenderCommand, RenderEvent};
pub use graph_manager::AudioGraphManager;
pub use voice::{Onset, Producer, Voice};
