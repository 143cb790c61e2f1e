//! Engine Channels
//!
//! Lock-free communication between the graph manager and the render thread.
//! Uses rtrb ring buffers for SPSC (single-producer, single-consumer) queues.

use rtrb::{Consumer, Producer, RingBuffer};

use super::commands::{RenderCommand, RenderEvent};

/// Default buffer size for command queue (manager -> render).
pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 1024;

/// Default buffer size for event queue (render -> manager).
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Holds both directions of communication channels.
/// Split into control/render pairs for the two threads.
pub struct RenderChannels {
    command_tx: Producer<RenderCommand>,
    command_rx: Consumer<RenderCommand>,
    event_tx: Producer<RenderEvent>,
    event_rx: Consumer<RenderEvent>,
}

impl RenderChannels {
    /// Create new channels with the specified buffer sizes.
    pub fn new(command_capacity: usize, event_capacity: usize) -> Self {
        let (command_tx, command_rx) = RingBuffer::new(command_capacity);
        let (event_tx, event_rx) = RingBuffer::new(event_capacity);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Create new channels with default buffer sizes.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_COMMAND_BUFFER_SIZE, DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Split the channels into control-side and render-side handles.
    pub fn split(self) -> (ControlHandle, RenderHandle) {
        let control = ControlHandle {
            command_tx: self.command_tx,
            event_rx: self.event_rx,
        };
        let render = RenderHandle {
            command_rx: self.command_rx,
            event_tx: self.event_tx,
        };
        (control, render)
    }
}

/// Control-side handle, held by the graph manager on the UI thread.
pub struct ControlHandle {
    command_tx: Producer<RenderCommand>,
    event_rx: Consumer<RenderEvent>,
}

impl ControlHandle {
    /// Send a command to the render thread.
    /// Returns Err(cmd) if the buffer is full. Never waits for space.
    pub fn send_command(&mut self, cmd: RenderCommand) -> Result<(), RenderCommand> {
        self.command_tx
            .push(cmd)
            .map_err(|rtrb::PushError::Full(cmd)| cmd)
    }

    /// Receive an event from the render thread, if one is pending.
    pub fn recv_event(&mut self) -> Option<RenderEvent> {
        self.event_rx.pop().ok()
    }

    /// Drain all pending events from the render thread.
    pub fn drain_events(&mut self) -> impl Iterator<Item = RenderEvent> + '_ {
        std::iter::from_fn(|| self.recv_event())
    }

    /// Check how many commands can still be queued.
    pub fn command_slots_available(&self) -> usize {
        self.command_tx.slots()
    }
}

/// Render-side handle, moved into the audio callback.
///
/// IMPORTANT: All methods are real-time safe (non-blocking, no allocations).
pub struct RenderHandle {
    command_rx: Consumer<RenderCommand>,
    event_tx: Producer<RenderEvent>,
}

impl RenderHandle {
    /// Receive a command, if one is pending.
    ///
    /// REAL-TIME SAFE: Non-blocking operation.
    pub fn recv_command(&mut self) -> Option<RenderCommand> {
        self.command_rx.pop().ok()
    }

    /// Try to send an event. Returns Err(event) if the buffer is full.
    ///
    /// REAL-TIME SAFE: Non-blocking, no allocations.
    pub fn send_event(&mut self, event: RenderEvent) -> Result<(), RenderEvent> {
        self.event_tx
            .push(event)
            .map_err(|rtrb::PushError::Full(event)| event)
    }

    /// Try to send an event, dropping it silently if the buffer is full.
    ///
    /// REAL-TIME SAFE: Non-blocking, no allocations.
    pub fn send_event_lossy(&mut self, event: RenderEvent) {
        let _ = self.event_tx.push(event);
    }

    /// Check how many events can still be queued.
    pub fn event_slots_available(&self) -> usize {
        self.event_tx.slots()
    }
}
