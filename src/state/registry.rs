//! Source registry
//!
//! Per-id lifecycle of every source the UI knows about:
//!
//! ```text
//! absent -> Pending -> Live -> (released) absent
//!              |
//!              +-- cancelled -> (graph arrives, released) absent
//! ```
//!
//! A source that has been released is removed immediately even though its
//! graph keeps sounding until the release ramp ends; the graph manager owns
//! that tail.

use std::collections::BTreeMap;

use crate::analysis::{AnalysisItem, AnalysisKind};
use crate::source::{AudioSourceHandle, InstanceId, SourceId};

/// What the registry knows about one id.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEntry {
    /// Creation was requested and has not been reported yet.
    Pending {
        /// The user toggled the id off again before the graph arrived.
        cancelled: bool,
    },
    /// The graph is live.
    Live {
        handle: AudioSourceHandle,
        /// Last decimated waveform, replaced wholesale on each reply.
        waveform: Vec<f32>,
        /// Last magnitude spectrum in dB.
        spectrum: Vec<f32>,
    },
}

/// Outcome of a graph arriving for an id.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The id is now live.
    Registered,
    /// The intent was cancelled while pending; the graph must be released.
    Cancelled,
    /// Nothing was waiting for this graph; it must be released.
    Unexpected,
}

#[derive(Clone, Debug, Default)]
pub struct SourceRegistry {
    entries: BTreeMap<SourceId, SourceEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn is_live(&self, id: SourceId) -> bool {
        matches!(self.entries.get(&id), Some(SourceEntry::Live { .. }))
    }

    /// Live handle for `id`, if any.
    pub fn handle(&self, id: SourceId) -> Option<&AudioSourceHandle> {
        match self.entries.get(&id) {
            Some(SourceEntry::Live { handle, .. }) => Some(handle),
            _ => None,
        }
    }

    /// Records a creation request for an absent id. Returns false if the id is already known.
    pub fn begin_pending(&mut self, id: SourceId) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries
            .insert(id, SourceEntry::Pending { cancelled: false });
        true
    }

    /// Flips the cancelled flag of a pending id. Returns the new flag, or
    /// None if the id is not pending.
    pub fn toggle_pending(&mut self, id: SourceId) -> Option<bool> {
        match self.entries.get_mut(&id) {
            Some(SourceEntry::Pending { cancelled }) => {
                *cancelled = !*cancelled;
                Some(*cancelled)
            }
            _ => None,
        }
    }

    /// A graph arrived for `handle.id`.
    pub fn resolve_pending(&mut self, handle: AudioSourceHandle) -> Resolution {
        match self.entries.get(&handle.id) {
            Some(SourceEntry::Pending { cancelled: false }) => {
                self.entries.insert(
                    handle.id,
                    SourceEntry::Live {
                        handle,
                        waveform: Vec::new(),
                        spectrum: Vec::new(),
                    },
                );
                Resolution::Registered
            }
            Some(SourceEntry::Pending { cancelled: true }) => {
                self.entries.remove(&handle.id);
                Resolution::Cancelled
            }
            _ => Resolution::Unexpected,
        }
    }

    /// Drops a pending id whose creation failed. Returns false if it wasn't pending.
    pub fn fail_pending(&mut self, id: SourceId) -> bool {
        if matches!(self.entries.get(&id), Some(SourceEntry::Pending { .. })) {
            self.entries.remove(&id);
            true
        } else {
            false
        }
    }

    /// Removes a live id and returns its handle for release.
    pub fn remove_live(&mut self, id: SourceId) -> Option<AudioSourceHandle> {
        match self.entries.remove(&id) {
            Some(SourceEntry::Live { handle, .. }) => Some(handle),
            Some(other) => {
                self.entries.insert(id, other);
                None
            }
            None => None,
        }
    }

    /// Stores analysis data if `id` is live with the same graph instance.
    ///
    /// Returns false for stale data, which is left unapplied.
    pub fn apply_analysis(
        &mut self,
        id: SourceId,
        instance: InstanceId,
        kind: AnalysisKind,
        data: Vec<f32>,
    ) -> bool {
        match self.entries.get_mut(&id) {
            Some(SourceEntry::Live {
                handle,
                waveform,
                spectrum,
            }) if handle.instance() == instance => {
                match kind {
                    AnalysisKind::Waveform => *waveform = data,
                    AnalysisKind::Spectrum => *spectrum = data,
                }
                true
            }
            _ => false,
        }
    }

    /// Every live source, ready to batch into a snapshot request.
    pub fn batch_items(&self) -> Vec<AnalysisItem> {
        self.live()
            .map(|handle| AnalysisItem {
                id: handle.id,
                graph: handle.graph.clone(),
            })
            .collect()
    }

    /// Live handles in id order.
    pub fn live(&self) -> impl Iterator<Item = &AudioSourceHandle> + '_ {
        self.entries.values().filter_map(|entry| match entry {
            SourceEntry::Live { handle, .. } => Some(handle),
            SourceEntry::Pending { .. } => None,
        })
    }

    /// Last decimated waveform of each live source, in id order.
    pub fn waveforms(&self) -> impl Iterator<Item = (SourceId, &[f32])> + '_ {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            SourceEntry::Live { waveform, .. } => Some((*id, waveform.as_slice())),
            SourceEntry::Pending { .. } => None,
        })
    }

    /// Last spectrum of each live source, in id order.
    pub fn spectra(&self) -> impl Iterator<Item = (SourceId, &[f32])> + '_ {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            SourceEntry::Live { spectrum, .. } => Some((*id, spectrum.as_slice())),
            SourceEntry::Pending { .. } => None,
        })
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
