//! Wire records
//!
//! Plain JSON records for events and commands crossing the bridge. Graph
//! handles travel as `{id, instance}` pairs and are resolved back to live
//! graphs on the way in; anything that fails to decode or resolve is
//! rejected with a [`ProtocolError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{Analysis, AnalysisKind, AnalysisReply};
use crate::dsp::WaveShape;
use crate::source::{AudioSourceHandle, GraphRef, InstanceId, SourceDescriptor, SourceId};
use crate::state::{Point, ViewportGeometry};

use super::messages::{Command, Event};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("no live graph with instance {0}")]
    UnknownInstance(InstanceId),
}

/// A graph handle on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireHandle {
    pub id: SourceId,
    pub instance: InstanceId,
}

impl From<&AudioSourceHandle> for WireHandle {
    fn from(handle: &AudioSourceHandle) -> Self {
        Self {
            id: handle.id,
            instance: handle.instance(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireEvent {
    ToggleKey {
        id: SourceId,
    },
    ToggleMic,
    SourceAdded {
        id: SourceId,
        instance: InstanceId,
    },
    SourceFailed {
        id: SourceId,
        reason: String,
    },
    SnapshotReply {
        #[serde(default, rename = "requestId")]
        request_id: Option<u64>,
        kind: AnalysisKind,
        analyses: Vec<Analysis>,
    },
    ZoomStart {
        x: f32,
        y: f32,
    },
    ZoomChange {
        x: f32,
        y: f32,
    },
    ZoomStop,
    #[serde(rename_all = "camelCase")]
    ViewportMeasured {
        width_px: f32,
        height_px: f32,
    },
    #[serde(rename_all = "camelCase")]
    Resized {
        width_px: f32,
        height_px: f32,
    },
    SelectWaveShape {
        shape: WaveShape,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireCommand {
    Create {
        id: SourceId,
        descriptor: SourceDescriptor,
    },
    Release(WireHandle),
    #[serde(rename_all = "camelCase")]
    RequestSnapshot {
        request_id: u64,
        kind: AnalysisKind,
        items: Vec<WireHandle>,
    },
}

impl From<&Command> for WireCommand {
    fn from(command: &Command) -> Self {
        match command {
            Command::Create { id, descriptor } => WireCommand::Create {
                id: *id,
                descriptor: *descriptor,
            },
            Command::Release(handle) => WireCommand::Release(handle.into()),
            Command::RequestSnapshot {
                request_id,
                kind,
                items,
            } => WireCommand::RequestSnapshot {
                request_id: *request_id,
                kind: *kind,
                items: items
                    .iter()
                    .map(|item| WireHandle {
                        id: item.id,
                        instance: item.graph.instance(),
                    })
                    .collect(),
            },
        }
    }
}

pub fn encode_command(command: &Command) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&WireCommand::from(command))?)
}

/// Parses and validates an event, resolving graph instances with `resolve`.
pub fn decode_event<F>(json: &str, resolve: F) -> Result<Event, ProtocolError>
where
    F: Fn(InstanceId) -> Option<GraphRef>,
{
    let wire: WireEvent = serde_json::from_str(json)?;
    let event = match wire {
        WireEvent::ToggleKey { id } => Event::ToggleKey(id),
        WireEvent::ToggleMic => Event::ToggleMic,
        WireEvent::SourceAdded { id, instance } => {
            let graph = resolve(instance).ok_or(ProtocolError::UnknownInstance(instance))?;
            Event::AudioSourceAdded(AudioSourceHandle::new(id, graph))
        }
        WireEvent::SourceFailed { id, reason } => Event::SourceFailed { id, reason },
        WireEvent::SnapshotReply {
            request_id,
            kind,
            analyses,
        } => {
            for analysis in &analyses {
                if analysis.data.iter().any(|s| !s.is_finite()) {
                    return Err(ProtocolError::InvalidField {
                        field: "analyses.data",
                        reason: format!("non-finite sample for {}", analysis.id),
                    });
                }
            }
            Event::AnalysisReply(AnalysisReply {
                request_id,
                kind,
                analyses,
            })
        }
        WireEvent::ZoomStart { x, y } => Event::ZoomStart(point(x, y)?),
        WireEvent::ZoomChange { x, y } => Event::ZoomChange(point(x, y)?),
        WireEvent::ZoomStop => Event::ZoomStop,
        WireEvent::ViewportMeasured {
            width_px,
            height_px,
        } => Event::ViewportMeasured(geometry(width_px, height_px)?),
        WireEvent::Resized {
            width_px,
            height_px,
        } => Event::Resized(geometry(width_px, height_px)?),
        WireEvent::SelectWaveShape { shape } => Event::SelectWaveShape(shape),
    };
    Ok(event)
}

fn point(x: f32, y: f32) -> Result<Point, ProtocolError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ProtocolError::InvalidField {
            field: "point",
            reason: format!("({}, {}) is not finite", x, y),
        });
    }
    Ok(Point::new(x, y))
}

fn geometry(width_px: f32, height_px: f32) -> Result<ViewportGeometry, ProtocolError> {
    let valid = |v: f32| v.is_finite() && v >= 0.0;
    if !valid(width_px) || !valid(height_px) {
        return Err(ProtocolError::InvalidField {
            field: "viewport",
            reason: format!("{}x{} is not a valid size", width_px, height_px),
        });
    }
    Ok(ViewportGeometry::new(width_px, height_px))
}
