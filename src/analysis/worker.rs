//! Analysis worker
//!
//! A background thread that serves snapshot requests so the UI thread never
//! pays for buffer extraction or FFTs. Requests go in over one channel and
//! replies come back over the channel given at spawn time. The worker keeps
//! no state between requests apart from its FFT plan cache.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rustfft::FftPlanner;
use tracing::{debug, trace};

use crate::engine::AudioGraphManager;

use super::{AnalysisReply, AnalysisRequest};

enum WorkerMessage {
    Extract(AnalysisRequest),
    Shutdown,
}

/// Handle to the analysis thread. Dropping it stops the thread.
pub struct AnalysisWorker {
    requests: Sender<WorkerMessage>,
    thread: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Starts the worker. Replies are sent to `replies`.
    pub fn spawn(replies: Sender<AnalysisReply>) -> io::Result<Self> {
        let (requests, inbox) = unbounded();
        let thread = thread::Builder::new()
            .name("analysis-worker".to_string())
            .spawn(move || run(inbox, replies))?;
        Ok(Self {
            requests,
            thread: Some(thread),
        })
    }

    /// Queues a request. Never blocks.
    ///
    /// Returns false if the worker thread has gone away.
    pub fn request(&self, request: AnalysisRequest) -> bool {
        self.requests.send(WorkerMessage::Extract(request)).is_ok()
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(inbox: Receiver<WorkerMessage>, replies: Sender<AnalysisReply>) {
    let mut planner = FftPlanner::new();
    debug!("analysis worker started");

    while let Ok(message) = inbox.recv() {
        let request = match message {
            WorkerMessage::Extract(request) => request,
            WorkerMessage::Shutdown => break,
        };

        trace!(kind = ?request.kind, items = request.items.len(), "extracting snapshot");
        let analyses =
            AudioGraphManager::extract_snapshot(&request.items, request.kind, &mut planner);
        let reply = AnalysisReply {
            request_id: request.request_id,
            kind: request.kind,
            analyses,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }

    debug!("analysis worker stopped");
}
