//! Bridge
//!
//! Carries commands from the app state to the graph manager and the
//! analysis worker, and gathers everything they report back into a single
//! stream of [`Event`]s for the app state to fold.

use crossbeam_channel::Receiver;
use tracing::{trace, warn, Level};

use crate::analysis::{AnalysisReply, AnalysisRequest, AnalysisWorker};
use crate::engine::{AudioGraphManager, GraphEvent};

use super::messages::{Command, Event};
use super::wire::{decode_event, encode_command};

pub struct Bridge {
    graph: AudioGraphManager,
    worker: AnalysisWorker,
    graph_events: Receiver<GraphEvent>,
    replies: Receiver<AnalysisReply>,
}

impl Bridge {
    /// `graph_events` must receive what `graph` reports and `replies` what `worker` answers.
    pub fn new(
        graph: AudioGraphManager,
        worker: AnalysisWorker,
        graph_events: Receiver<GraphEvent>,
        replies: Receiver<AnalysisReply>,
    ) -> Self {
        Self {
            graph,
            worker,
            graph_events,
            replies,
        }
    }

    /// Sends one command to the collaborator that handles it.
    pub fn dispatch(&mut self, command: Command) {
        if tracing::enabled!(Level::TRACE) {
            match encode_command(&command) {
                Ok(json) => trace!(wire = %json, "dispatch"),
                Err(e) => warn!(command = command.name(), error = %e, "could not encode command"),
            }
        }

        match command {
            Command::Create { id, descriptor } => self.graph.create(id, descriptor),
            Command::Release(handle) => self.graph.release(&handle),
            Command::RequestSnapshot {
                request_id,
                kind,
                items,
            } => {
                let sent = self.worker.request(AnalysisRequest {
                    request_id: Some(request_id),
                    kind,
                    items,
                });
                if !sent {
                    warn!(request_id, kind = kind.name(), "analysis worker is gone, request dropped");
                }
            }
        }
    }

    /// Collects every event the collaborators have reported since the last poll.
    pub fn poll(&mut self) -> Vec<Event> {
        self.graph.poll();

        let mut events: Vec<Event> = self
            .graph_events
            .try_iter()
            .map(|event| match event {
                GraphEvent::SourceAdded(handle) => Event::AudioSourceAdded(handle),
                GraphEvent::SourceFailed { id, reason } => Event::SourceFailed { id, reason },
            })
            .collect();
        events.extend(self.replies.try_iter().map(Event::AnalysisReply));
        events
    }

    /// Decodes an event arriving as JSON. Malformed events are logged and dropped.
    pub fn ingest_wire(&self, json: &str) -> Option<Event> {
        match decode_event(json, |instance| self.graph.graph_ref(instance)) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "dropping wire event");
                None
            }
        }
    }

    pub fn graph(&self) -> &AudioGraphManager {
        &self.graph
    }
}
