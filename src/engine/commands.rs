//! Engine Commands and Events
//!
//! Messages between the graph manager (UI thread) and the render thread,
//! plus the events the graph manager reports to the rest of the app.
//! Everything that crosses a thread here is Send + 'static.

use crate::source::{AudioSourceHandle, InstanceId, SourceId};

use super::voice::Voice;

/// Commands sent from the graph manager to the render thread.
/// These are processed non-blocking in the audio callback.
#[derive(Debug)]
pub enum RenderCommand {
    /// Connect a fully built voice and start its envelope.
    AddVoice(Box<Voice>),

    /// Ramp a voice to silence, then disconnect it.
    ReleaseVoice {
        instance: InstanceId,
        release_seconds: f32,
    },
}

/// Events sent from the render thread back to the graph manager.
#[derive(Debug, Clone, Copy)]
pub enum RenderEvent {
    /// A voice was connected at the given audio time.
    VoiceStarted { instance: InstanceId, at: f64 },

    /// A voice began its release; teardown is due at `teardown_at`.
    VoiceReleased {
        instance: InstanceId,
        teardown_at: f64,
    },

    /// A voice's nodes were disconnected and dropped.
    VoiceTornDown { instance: InstanceId },

    /// Peak output level of the last report interval.
    OutputLevel { peak: f32 },

    /// Current CPU load of the audio processing (0-100).
    CpuLoad(f32),
}

/// What the graph manager reports about source creation.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A source's graph is live.
    SourceAdded(AudioSourceHandle),

    /// A source could not be created.
    SourceFailed { id: SourceId, reason: String },
}
