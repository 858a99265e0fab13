//! Execution host for fitting runs.
//!
//! A [`FitEngine`] runs at most one fit at a time on a dedicated worker
//! thread. The caller gets a [`FitHandle`] for cancellation and the final
//! result; registered [`FitListener`]s receive progress and completion events
//! in iteration order.

mod events;
mod handle;

pub use events::{ChannelListener, FitEvent, FitListener};
pub use handle::FitHandle;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use crate::config::FitConfiguration;
use crate::data::ObservedData;
use crate::error::{FitError, Result};
use crate::lm::{FitMonitor, LevenbergMarquardt, LmConfig};
use crate::model::ModelEvaluator;
use crate::models::FlowRegimeModels;
use crate::result::{FitResult, ProgressEvent};

/// Runs fits in the background, one at a time.
#[derive(Clone)]
pub struct FitEngine {
    evaluator: Arc<dyn ModelEvaluator>,
    optimizer: LevenbergMarquardt,
    running: Arc<AtomicBool>,
    listeners: Vec<Arc<dyn FitListener>>,
}

impl FitEngine {
    pub fn new(evaluator: Arc<dyn ModelEvaluator>) -> Self {
        Self {
            evaluator,
            optimizer: LevenbergMarquardt::new(),
            running: Arc::new(AtomicBool::new(false)),
            listeners: Vec::new(),
        }
    }

    /// Engine over the built-in flow-regime models.
    pub fn with_builtin_models() -> Self {
        Self::new(Arc::new(FlowRegimeModels))
    }

    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.optimizer = LevenbergMarquardt::with_config(config);
        self
    }

    pub fn with_optimizer(mut self, optimizer: LevenbergMarquardt) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &LmConfig {
        self.optimizer.config()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn FitListener>) {
        self.listeners.push(listener);
    }

    /// True while a run started by this engine (or a clone of it) is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validate the inputs and start a fit on a worker thread.
    ///
    /// Fails synchronously with `InvalidConfiguration` for malformed inputs
    /// and `AlreadyRunning` if another run is active; in both cases no
    /// worker is spawned and the evaluator is never called.
    pub fn start_fit(
        &self,
        configuration: FitConfiguration,
        observed: ObservedData,
    ) -> Result<FitHandle> {
        configuration.validate_against(&observed)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FitError::AlreadyRunning);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();

        let worker = {
            let evaluator = Arc::clone(&self.evaluator);
            let optimizer = self.optimizer.clone();
            let running = Arc::clone(&self.running);
            let listeners = self.listeners.clone();
            let cancel = Arc::clone(&cancel);

            thread::Builder::new()
                .name("wtfit-worker".to_string())
                .spawn(move || {
                    let mut monitor = WorkerMonitor {
                        cancel: &cancel,
                        listeners: &listeners,
                    };
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        optimizer.run(evaluator.as_ref(), &configuration, &observed, &mut monitor)
                    }));
                    let result = outcome.unwrap_or_else(|_| {
                        error!("model evaluator panicked; fit aborted");
                        FitResult::failed(
                            configuration.parameters.to_map(),
                            0,
                            optimizer.config().initial_lambda,
                            "model evaluator panicked",
                        )
                    });

                    running.store(false, Ordering::SeqCst);
                    for listener in &listeners {
                        listener.on_completion(&result);
                    }
                    // The handle may already be gone; the listeners have the result.
                    let _ = sender.send(result);
                })
        };

        match worker {
            Ok(worker) => {
                info!("fit worker started");
                Ok(FitHandle::new(cancel, receiver, worker))
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                Err(FitError::Io(err))
            }
        }
    }

    /// Run a fit on the calling thread, without listeners or cancellation.
    pub fn fit_blocking(
        &self,
        configuration: &FitConfiguration,
        observed: &ObservedData,
    ) -> Result<FitResult> {
        self.optimizer.fit(
            self.evaluator.as_ref(),
            configuration,
            observed,
            &mut crate::lm::NoMonitor,
        )
    }
}

impl std::fmt::Debug for FitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitEngine")
            .field("config", self.optimizer.config())
            .field("running", &self.is_running())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Bridges the driver's monitor hooks to the cancel flag and listeners.
struct WorkerMonitor<'a> {
    cancel: &'a AtomicBool,
    listeners: &'a [Arc<dyn FitListener>],
}

impl FitMonitor for WorkerMonitor<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn on_progress(&mut self, event: &ProgressEvent) {
        for listener in self.listeners {
            listener.on_progress(event);
        }
    }
}
