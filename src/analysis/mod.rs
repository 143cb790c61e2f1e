//! Analysis module
//!
//! Snapshot requests and replies, the background worker that serves them,
//! and the decimator that turns raw waveforms into display points.

pub mod decimate;
pub mod worker;

use serde::{Deserialize, Serialize};

use crate::source::{GraphRef, InstanceId, SourceId};

pub use decimate::{decimate, find_anchor, target_length};
pub use worker::AnalysisWorker;

/// Which buffer a snapshot reads from a tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisKind {
    /// Time-domain samples, one analysis window long.
    Waveform,
    /// Magnitude spectrum in dB, half an analysis window long.
    Spectrum,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 2] = [AnalysisKind::Waveform, AnalysisKind::Spectrum];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::Waveform => "waveform",
            AnalysisKind::Spectrum => "spectrum",
        }
    }
}

/// One source to snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisItem {
    pub id: SourceId,
    pub graph: GraphRef,
}

/// Snapshot data for one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: SourceId,
    /// Graph instance the data was read from.
    pub instance: InstanceId,
    pub data: Vec<f32>,
}

/// A batch of sources to snapshot.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub request_id: Option<u64>,
    pub kind: AnalysisKind,
    pub items: Vec<AnalysisItem>,
}

/// The worker's answer to an [`AnalysisRequest`].
///
/// Holds one entry per requested item, in no particular order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub kind: AnalysisKind,
    pub analyses: Vec<Analysis>,
}
