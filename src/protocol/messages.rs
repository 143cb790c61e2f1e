//! Typed events and commands.
//!
//! Everything that happens to the app state arrives as an [`Event`];
//! everything the state wants done to the audio graph or the analysis
//! worker leaves as a [`Command`].

use crate::analysis::{AnalysisItem, AnalysisKind, AnalysisReply};
use crate::dsp::WaveShape;
use crate::source::{AudioSourceHandle, SourceDescriptor, SourceId};
use crate::state::{Point, ViewportGeometry};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A note key was pressed.
    ToggleKey(SourceId),
    ToggleMic,
    /// The graph manager finished building a source.
    AudioSourceAdded(AudioSourceHandle),
    /// The graph manager could not build a source.
    SourceFailed { id: SourceId, reason: String },
    AnalysisReply(AnalysisReply),
    ZoomStart(Point),
    ZoomChange(Point),
    ZoomStop,
    ViewportMeasured(ViewportGeometry),
    Resized(ViewportGeometry),
    SelectWaveShape(WaveShape),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Create {
        id: SourceId,
        descriptor: SourceDescriptor,
    },
    Release(AudioSourceHandle),
    /// The reply to this request carries `request_id` back.
    RequestSnapshot {
        request_id: u64,
        kind: AnalysisKind,
        items: Vec<AnalysisItem>,
    },
}

impl Command {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Release(_) => "release",
            Command::RequestSnapshot { .. } => "requestSnapshot",
        }
    }
}
