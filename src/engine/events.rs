//! Event delivery from the worker to the host.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::result::{FitResult, ProgressEvent};

/// Typed event emitted by a running fit.
#[derive(Debug, Clone)]
pub enum FitEvent {
    /// One accepted iteration.
    Progress(ProgressEvent),

    /// The run reached a terminal state. Sent exactly once, last.
    Completed(FitResult),
}

/// Observer of a fitting run.
///
/// Callbacks run on the worker thread, so implementations should hand the
/// event off rather than do heavy work inline.
pub trait FitListener: Send + Sync {
    fn on_progress(&self, _event: &ProgressEvent) {}

    fn on_completion(&self, _result: &FitResult) {}
}

/// Forwards every event over an `mpsc` channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: Sender<FitEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, Receiver<FitEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl FitListener for ChannelListener {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.sender.send(FitEvent::Progress(event.clone()));
    }

    fn on_completion(&self, result: &FitResult) {
        let _ = self.sender.send(FitEvent::Completed(result.clone()));
    }
}
