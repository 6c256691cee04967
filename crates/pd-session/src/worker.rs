//! Background analysis worker
//!
//! One dedicated thread per run. The request is built on the calling thread
//! from an immutable snapshot, so the thread never touches live model state.
//! At most one run is in flight; a second `start` is rejected until the
//! current thread finishes.

use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use pd_core::{AnalysisRequest, ModelSnapshot, RunParams};

use crate::engine::{CancelFlag, EngineError, PowerEngine, PowerResult, RunControl};
use crate::error::{Result, SessionError};

/// Events emitted by a run, in channel order
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    Progress { current: u32, total: u32 },
    Finished {
        request: Box<AnalysisRequest>,
        result: Box<PowerResult>,
    },
    /// User-initiated cancellation, not a failure
    Cancelled,
    Failed { message: String },
}

/// Owns the run thread and the event channel
pub struct AnalysisWorker {
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    cancel: CancelFlag,
    handle: Option<JoinHandle<()>>,
}

impl Default for AnalysisWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisWorker {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        AnalysisWorker {
            tx,
            rx,
            cancel: CancelFlag::new(),
            handle: None,
        }
    }

    /// The event stream; clone freely, events fan out to one receiver
    pub fn events(&self) -> Receiver<WorkerEvent> {
        self.rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start a run over a snapshot.
    ///
    /// The `AnalysisRequest` is built here, on the calling thread; the
    /// spawned thread receives it by value and holds no reference back.
    pub fn start<E>(&mut self, engine: E, snapshot: &ModelSnapshot, params: RunParams) -> Result<()>
    where
        E: PowerEngine + Send + 'static,
    {
        if self.is_running() {
            log::warn!("run request rejected: a run is already in flight");
            return Err(SessionError::RunInFlight);
        }

        let request = AnalysisRequest::build(snapshot, params);
        self.cancel = CancelFlag::new();
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();

        log::info!("starting analysis run: {:?}", request.params.mode);
        self.handle = Some(std::thread::spawn(move || {
            let progress_tx = tx.clone();
            let control = RunControl::new(cancel, move |current, total| {
                let _ = progress_tx.send(WorkerEvent::Progress { current, total });
            });
            let event = match engine.run(&request, &control) {
                Ok(result) => WorkerEvent::Finished {
                    request: Box::new(request),
                    result: Box::new(result),
                },
                Err(EngineError::Cancelled) => WorkerEvent::Cancelled,
                Err(err) => WorkerEvent::Failed {
                    message: err.to_string(),
                },
            };
            // The receiver may already be gone during shutdown.
            let _ = tx.send(event);
        }));
        Ok(())
    }

    /// Ask the in-flight run to stop; the engine polls the flag
    pub fn request_cancel(&self) {
        if self.is_running() {
            log::info!("cancellation requested");
            self.cancel.cancel();
        }
    }

    /// Wait for the current run thread to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
