//! powerdesk core: the synchronous model engine behind the power-analysis
//! desktop application.
//!
//! Everything here is pure and single-threaded: formula parsing, data
//! profiling, predictor expansion, correlation reconciliation, the model
//! aggregate and the analysis request builder. I/O, threads and the
//! statistics engine live in `pd-session`.

pub mod cluster;
pub mod correlation;
pub mod data;
pub mod error;
pub mod expand;
pub mod formula;
pub mod request;
pub mod state;
pub mod variable;

pub use cluster::{build_cluster_configs, ClusterConfig, ClusterSize};
pub use correlation::{pair_key, CorrelationReconciler, PreservationMode, Reconciled};
pub use data::{DataValue, Dataset};
pub use error::{PowerdeskError, Result};
pub use expand::{expand, ExpandedTerm, Expansion};
pub use formula::{FormulaError, ParsedFormula, RandomEffect, RandomEffectKind};
pub use request::{AnalysisRequest, RunMode, RunParams};
pub use state::{EditOutcome, ModelSnapshot, ModelState, ModelType, RunSettings};
pub use variable::{FactorDefinition, TypeRegistry, VariableType};
