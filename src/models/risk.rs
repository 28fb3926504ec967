//! Risk categories and generated risks

use super::types::*;
use crate::identity::synthetic_id;
use crate::severity::calculate_severity;
use serde::{Deserialize, Serialize};

/// Metadata describing one kind of risk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskCategory {
    pub id: String,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub asvs: String,
    pub cheat_sheet: String,
    pub action: String,
    pub mitigation: String,
    pub check: String,
    pub function: RiskFunction,
    pub stride: Stride,
    pub detection_logic: String,
    pub risk_assessment: String,
    pub false_positives: String,
    /// Findings of this category usually point at a gap in the model itself
    pub model_failure_possible_reason: bool,
    pub cwe: u32,
}

/// A single finding produced by a rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Risk {
    pub category_id: String,
    pub severity: Severity,
    pub exploitation_likelihood: Likelihood,
    pub exploitation_impact: Impact,
    pub title: String,
    pub synthetic_id: String,
    pub most_relevant_technical_asset_id: String,
    pub most_relevant_communication_link_id: String,
    pub most_relevant_data_asset_id: String,
    pub most_relevant_trust_boundary_id: String,
    pub most_relevant_shared_runtime_id: String,
    pub data_breach_probability: DataBreachProbability,
    pub data_breach_technical_asset_ids: Vec<String>,
}

impl Risk {
    /// Start a risk of the given category; severity follows from likelihood
    /// and impact
    pub fn new(
        category: &RiskCategory,
        likelihood: Likelihood,
        impact: Impact,
        title: impl Into<String>,
    ) -> Self {
        Self {
            category_id: category.id.clone(),
            severity: calculate_severity(likelihood, impact),
            exploitation_likelihood: likelihood,
            exploitation_impact: impact,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_technical_asset(mut self, id: &str) -> Self {
        self.most_relevant_technical_asset_id = id.to_string();
        self
    }

    pub fn with_communication_link(mut self, id: &str) -> Self {
        self.most_relevant_communication_link_id = id.to_string();
        self
    }

    pub fn with_data_asset(mut self, id: &str) -> Self {
        self.most_relevant_data_asset_id = id.to_string();
        self
    }

    pub fn with_trust_boundary(mut self, id: &str) -> Self {
        self.most_relevant_trust_boundary_id = id.to_string();
        self
    }

    pub fn with_shared_runtime(mut self, id: &str) -> Self {
        self.most_relevant_shared_runtime_id = id.to_string();
        self
    }

    /// Breach IDs are stored sorted and without repetition
    pub fn with_data_breach<I, S>(mut self, probability: DataBreachProbability, asset_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = asset_ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        self.data_breach_probability = probability;
        self.data_breach_technical_asset_ids = ids;
        self
    }

    pub fn with_synthetic_id(mut self, parts: &[&str]) -> Self {
        self.synthetic_id = synthetic_id(&self.category_id, parts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_identity_and_severity() {
        let category = RiskCategory {
            id: "missing-vault".into(),
            ..Default::default()
        };
        let risk = Risk::new(&category, Likelihood::Unlikely, Impact::Medium, "title")
            .with_technical_asset("db")
            .with_data_breach(DataBreachProbability::Improbable, ["db", "app", "db"])
            .with_synthetic_id(&["db"]);
        assert_eq!(risk.synthetic_id, "missing-vault@db");
        assert_eq!(risk.severity, Severity::Medium);
        assert_eq!(risk.data_breach_technical_asset_ids, vec!["app", "db"]);
    }

    #[test]
    fn test_json_field_names() {
        let risk = Risk::default();
        let value = serde_json::to_value(&risk).unwrap();
        let object = value.as_object().unwrap();
        for field in [
            "category_id",
            "severity",
            "exploitation_likelihood",
            "exploitation_impact",
            "title",
            "synthetic_id",
            "most_relevant_technical_asset_id",
            "most_relevant_communication_link_id",
            "most_relevant_data_asset_id",
            "most_relevant_trust_boundary_id",
            "most_relevant_shared_runtime_id",
            "data_breach_probability",
            "data_breach_technical_asset_ids",
        ] {
            assert!(object.contains_key(field), "missing field {}", field);
        }
        assert_eq!(object.len(), 13);
    }
}
