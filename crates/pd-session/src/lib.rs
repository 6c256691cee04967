//! powerdesk session boundary: the statistics-engine trait, the background
//! analysis worker, and the JSON run-history store.
//!
//! `pd-core` stays pure and synchronous; everything that spawns a thread or
//! touches disk lives here.

pub mod engine;
pub mod error;
pub mod history;
pub mod worker;

pub use engine::{CancelFlag, EngineError, PowerEngine, PowerResult, ResultBlock, RunControl};
pub use error::{Result, SessionError};
pub use history::{HistoryRecord, HistoryStore, HistorySummary, MAX_RECORDS};
pub use worker::{AnalysisWorker, WorkerEvent};
