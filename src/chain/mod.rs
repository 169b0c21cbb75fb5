//! Chain execution
//!
//! - Step: async transformation contract plus per-run context
//! - Executor: ordered, lock-protected step list
//! - Steps: retrieval, templating and model-call steps

pub mod executor;
pub mod step;
pub mod steps;

pub use executor::Chain;
pub use step::{step_fn, FnStep, Step, StepContext};
pub use steps::{ChatStep, RetrievalStep, TemplateStep};
