//! Source identities, descriptors and handles.
//!
//! A source is one sounding entity: a synthesized tone keyed by its interval
//! index, or the microphone input under a fixed sentinel id. The graph that
//! backs a source is owned by the graph manager; everything else only holds
//! a [`GraphRef`] to it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dsp::analyser::AnalyserTap;
use crate::dsp::oscillator::WaveShape;

/// Default attack ramp for synthesized tones, in seconds.
pub const DEFAULT_ATTACK_SECONDS: f32 = 0.1;

/// Default release ramp for every source, in seconds.
pub const DEFAULT_RELEASE_SECONDS: f32 = 0.5;

/// Gain a source settles at once its attack has finished.
pub const DEFAULT_SOUNDING_GAIN: f32 = 0.5;

/// Reference frequency the note intervals are measured from.
pub const DEFAULT_REFERENCE_HZ: f32 = 220.0;

/// Semitone offset added to every interval index (interval 0 sounds a minor third above the reference).
pub const DEFAULT_INTERVAL_OFFSET: i32 = 3;

/// Identity of a source.
///
/// Note ids are small interval indices. The microphone uses a single reserved
/// id that is never handed out for notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl SourceId {
    /// Sentinel id of the microphone input.
    pub const MIC: SourceId = SourceId(u32::MAX);

    /// Id of the note at the given interval index.
    pub fn note(interval: u32) -> Self {
        Self(interval)
    }

    /// Returns true for the microphone sentinel.
    pub fn is_mic(self) -> bool {
        self == Self::MIC
    }

    /// Interval index of a note id, or None for the microphone.
    pub fn interval(self) -> Option<u32> {
        (!self.is_mic()).then_some(self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mic() {
            write!(f, "mic")
        } else {
            write!(f, "note {}", self.0)
        }
    }
}

/// Identifies one graph instance. Never reused, even when a source id is.
pub type InstanceId = u64;

/// Attack/release shaping of a source's gain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeParams {
    /// Linear ramp from silence to the sounding gain.
    pub attack_seconds: f32,
    /// Linear ramp from the current gain to silence.
    pub release_seconds: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack_seconds: DEFAULT_ATTACK_SECONDS,
            release_seconds: DEFAULT_RELEASE_SECONDS,
        }
    }
}

/// What the graph manager should build for a source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceDescriptor {
    /// A synthesized tone.
    #[serde(rename_all = "camelCase")]
    Tone {
        frequency: f32,
        wave_shape: WaveShape,
        envelope: EnvelopeParams,
    },
    /// The platform capture device. Captured input has no attack ramp, only
    /// the release half of the envelope applies.
    #[serde(rename_all = "camelCase")]
    InputDevice { envelope: EnvelopeParams },
}

impl SourceDescriptor {
    /// Envelope the source is shaped with.
    pub fn envelope(&self) -> EnvelopeParams {
        match self {
            SourceDescriptor::Tone { envelope, .. } => *envelope,
            SourceDescriptor::InputDevice { envelope } => *envelope,
        }
    }
}

/// Frequency of the note at `interval` semitones (plus `offset`) above `reference_hz`.
///
/// With the defaults, interval 0 is `220 * 2^(3/12)`, roughly middle C.
pub fn tone_frequency(reference_hz: f32, interval: u32, offset: i32) -> f32 {
    let semitones = interval as f32 + offset as f32;
    reference_hz * 2.0_f32.powf(semitones / 12.0)
}

/// Non-owning reference to a live graph.
///
/// Cloning is cheap. The only thing it exposes is read access to the
/// graph's analysis tap.
#[derive(Clone)]
pub struct GraphRef {
    instance: InstanceId,
    tap: Arc<AnalyserTap>,
}

impl GraphRef {
    pub(crate) fn new(instance: InstanceId, tap: Arc<AnalyserTap>) -> Self {
        Self { instance, tap }
    }

    /// The graph instance this reference points at.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Read-only access to the analysis tap.
    pub fn tap(&self) -> &AnalyserTap {
        &self.tap
    }
}

impl PartialEq for GraphRef {
    fn eq(&self, other: &Self) -> bool {
        self.instance == other.instance
    }
}

impl Eq for GraphRef {}

impl fmt::Debug for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRef")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

/// A source id paired with the graph that backs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSourceHandle {
    pub id: SourceId,
    pub graph: GraphRef,
}

impl AudioSourceHandle {
    pub fn new(id: SourceId, graph: GraphRef) -> Self {
        Self { id, graph }
    }

    pub fn instance(&self) -> InstanceId {
        self.graph.instance()
    }
}
