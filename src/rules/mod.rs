//! Detection rules
//!
//! Every rule is a pure function of the parsed model. The registry holds
//! rules in registration order and the dispatcher concatenates their output
//! in that same order, whether rules run sequentially or in parallel.
//!
//! - `registry`: rule registration and dispatch
//! - `helpers`: rating ladders shared by the catalog
//! - `builtin`: the built-in rule catalog
//! - `custom`: hand-written risk categories loaded from files

pub mod builtin;
pub mod custom;
pub mod helpers;
mod registry;

pub use registry::{DispatchOptions, DispatchOutcome, RuleFailure, RuleRegistry};

use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::{Risk, RiskCategory};

/// Contract implemented by every detection rule
pub trait RiskRule: Send + Sync {
    /// Category metadata; cheap and side-effect free
    fn category(&self) -> &RiskCategory;

    /// Model tags the rule branches on
    fn supported_tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Derive this rule's risks. Same model in, same ordered list out.
    /// Errors are reserved for structural problems found mid-analysis.
    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>>;

    /// Step-by-step rationale for a risk of this category, when the rule
    /// provides one
    fn explain_risk(&self, _model: &ParsedModel, _synthetic_id: &str) -> Option<Vec<String>> {
        None
    }
}
