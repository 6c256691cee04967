//! The statistics-engine boundary
//!
//! The core never runs simulations itself; it hands an `AnalysisRequest` to
//! whatever implements `PowerEngine`. Cancellation is cooperative: the
//! engine polls the flag in `RunControl` between simulation batches and
//! returns `EngineError::Cancelled`, which the worker surfaces as a
//! user-initiated signal rather than a failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pd_core::AnalysisRequest;

/// Shared cooperative cancellation flag
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cancellation flag plus progress reporting for one run
pub struct RunControl {
    cancel: CancelFlag,
    progress: Box<dyn Fn(u32, u32) + Send>,
}

impl RunControl {
    pub fn new(cancel: CancelFlag, progress: impl Fn(u32, u32) + Send + 'static) -> Self {
        RunControl {
            cancel,
            progress: Box::new(progress),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report `current` of `total` simulations done
    pub fn report_progress(&self, current: u32, total: u32) {
        (self.progress)(current, total);
    }
}

/// Engine-side failures
#[derive(Debug, Error)]
pub enum EngineError {
    /// User-initiated, not an error condition
    #[error("simulation cancelled")]
    Cancelled,

    /// Engine failure; the message is shown to the user verbatim
    #[error("{0}")]
    Failed(String),
}

/// One set of per-term results.
///
/// Power-mode runs fill `individual_powers`; sample-size sweeps also fill
/// `first_achieved` with the first sample size reaching target power per
/// term. `*_corrected` variants are present when a multiple-comparison
/// correction was requested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBlock {
    pub individual_powers: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_powers_corrected: Option<IndexMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_achieved: Option<IndexMap<String, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_achieved_corrected: Option<IndexMap<String, u32>>,
}

/// Full result of one run: overall numbers plus the optional per-scenario
/// breakdown under the three fixed scenario keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    #[serde(flatten)]
    pub overall: ResultBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<IndexMap<String, ResultBlock>>,
}

/// The Monte Carlo engine behind the worker
pub trait PowerEngine {
    fn run(&self, request: &AnalysisRequest, control: &RunControl)
        -> Result<PowerResult, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn run_control_forwards_progress() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let control = RunControl::new(CancelFlag::new(), move |current, total| {
            sink.lock().unwrap().push((current, total));
        });
        control.report_progress(10, 100);
        control.report_progress(20, 100);
        assert_eq!(*seen.lock().unwrap(), vec![(10, 100), (20, 100)]);
    }

    #[test]
    fn result_serialization_flattens_the_overall_block() {
        let result = PowerResult {
            overall: ResultBlock {
                individual_powers: [("x1".to_string(), 82.5)].into_iter().collect(),
                ..ResultBlock::default()
            },
            scenarios: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["individual_powers"]["x1"], 82.5);
        assert!(json.get("scenarios").is_none());
        let back: PowerResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
