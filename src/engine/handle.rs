//! Caller-side handle to a running fit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::{FitError, Result};
use crate::result::FitResult;

/// Handle returned by [`FitEngine::start_fit`](super::FitEngine::start_fit).
///
/// Dropping the handle does not stop the run; call [`cancel`](Self::cancel)
/// first if the result is no longer wanted.
#[derive(Debug)]
pub struct FitHandle {
    cancel: Arc<AtomicBool>,
    receiver: Receiver<FitResult>,
    worker: Option<JoinHandle<()>>,
    outcome: Option<FitResult>,
}

impl FitHandle {
    pub(crate) fn new(
        cancel: Arc<AtomicBool>,
        receiver: Receiver<FitResult>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            cancel,
            receiver,
            worker: Some(worker),
            outcome: None,
        }
    }

    /// Ask the worker to stop at the next iteration boundary.
    ///
    /// Safe to call any number of times, including after completion.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Poll for the result without blocking.
    pub fn try_result(&mut self) -> Result<Option<&FitResult>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(result) => {
                    self.join_worker();
                    self.outcome = Some(result);
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(FitError::WorkerDisconnected),
            }
        }
        Ok(self.outcome.as_ref())
    }

    /// True once the completion event has been received.
    pub fn is_finished(&mut self) -> bool {
        matches!(self.try_result(), Ok(Some(_)))
    }

    /// Block until the run completes and return its result.
    pub fn wait(mut self) -> Result<FitResult> {
        if let Some(result) = self.outcome.take() {
            return Ok(result);
        }
        let result = self
            .receiver
            .recv()
            .map_err(|_| FitError::WorkerDisconnected)?;
        self.join_worker();
        Ok(result)
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            // The worker has already sent its result; it cannot panic past that.
            let _ = worker.join();
        }
    }
}
