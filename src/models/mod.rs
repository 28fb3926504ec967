//! Threat model data types
//!
//! - `types`: ordered rating tiers and closed vocabularies
//! - `technology`: open technology attribute sets and their catalog
//! - `entities`: assets, links, boundaries and runtimes
//! - `risk`: risk categories and generated risks

mod entities;
mod risk;
pub mod technology;
mod types;

pub use entities::*;
pub use risk::{Risk, RiskCategory};
pub use technology::{Technology, TechnologyCatalog, TechnologyList};
pub use types::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete model as produced by ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInput {
    pub title: String,
    pub description: String,
    pub tags_available: Vec<String>,
    pub data_assets: Vec<DataAsset>,
    pub technical_assets: Vec<TechnicalAsset>,
    pub trust_boundaries: Vec<TrustBoundary>,
    pub shared_runtimes: Vec<SharedRuntime>,
    /// Hand-written risk categories that travel with the model
    pub individual_risk_categories: Vec<crate::rules::custom::CustomCategoryDefinition>,
    /// Recorded dispositions keyed by synthetic-ID pattern
    pub risk_tracking: BTreeMap<String, crate::tracking::RiskTrackingEntry>,
}

impl ModelInput {
    /// Read a model from a JSON or YAML file
    pub fn load(path: &std::path::Path) -> crate::ThreatGraphResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::ThreatGraphError::io(e, Some(path.to_path_buf())))?;
        Self::parse(&content, crate::config::is_yaml(path))
    }

    pub fn parse(content: &str, yaml: bool) -> crate::ThreatGraphResult<Self> {
        if yaml {
            Ok(serde_yaml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }
}
