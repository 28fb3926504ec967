//! Category catalog listing and per-risk explanations

use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::graph::ParsedModel;
use crate::identity::category_of;
use crate::models::{Risk, RiskCategory};
use crate::rules::RuleRegistry;
use serde::Serialize;
use std::fmt::Write as _;

/// A category together with the tags its rule understands
#[derive(Debug, Clone, Serialize)]
pub struct CategoryEntry {
    #[serde(flatten)]
    pub category: RiskCategory,
    pub supported_tags: Vec<String>,
}

/// Every registered category in registration order
pub fn list_categories(registry: &RuleRegistry) -> Vec<CategoryEntry> {
    registry
        .rules()
        .map(|rule| {
            let mut supported_tags = rule.supported_tags();
            supported_tags.sort();
            supported_tags.dedup();
            CategoryEntry {
                category: rule.category().clone(),
                supported_tags,
            }
        })
        .collect()
}

/// Plain-text table for `list-rules`
pub fn render_categories(entries: &[CategoryEntry]) -> String {
    let width = entries
        .iter()
        .map(|entry| entry.category.id.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "{:<width$}  {}", entry.category.id, entry.category.title, width = width);
        if !entry.supported_tags.is_empty() {
            let _ = write!(out, "  [{}]", entry.supported_tags.join(", "));
        }
        out.push('\n');
    }
    out
}

/// Why a risk was raised
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub synthetic_id: String,
    pub category: RiskCategory,
    /// The generated risk, when the current model still raises it
    pub risk: Option<Risk>,
    /// Rationale steps, when the category's rule provides them
    pub steps: Option<Vec<String>>,
}

impl Explanation {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.synthetic_id, self.category.title);
        match &self.risk {
            Some(risk) => {
                let _ = writeln!(
                    out,
                    "  severity {}, likelihood {}, impact {}",
                    risk.severity, risk.exploitation_likelihood, risk.exploitation_impact
                );
            }
            None => out.push_str("  not raised by the current model\n"),
        }
        match &self.steps {
            Some(steps) => {
                for (index, step) in steps.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", index + 1, step);
                }
            }
            None => {
                let _ = writeln!(out, "  detection logic: {}", self.category.detection_logic);
            }
        }
        out
    }
}

/// Explain one synthetic ID against a model and its generated risks
pub fn explain(
    registry: &RuleRegistry,
    model: &ParsedModel,
    risks: &[Risk],
    synthetic_id: &str,
) -> ThreatGraphResult<Explanation> {
    let synthetic_id = synthetic_id.trim();
    let category_id = category_of(synthetic_id);
    let rule = registry
        .find(category_id)
        .ok_or_else(|| ThreatGraphError::UnknownValue {
            kind: "risk category",
            value: category_id.to_string(),
        })?;
    let steps = rule.explain_risk(model, synthetic_id);
    if steps.is_none() {
        log::debug!("Rule '{}' provides no step-by-step explanation", category_id);
    }
    Ok(Explanation {
        synthetic_id: synthetic_id.to_string(),
        category: rule.category().clone(),
        risk: risks.iter().find(|risk| risk.synthetic_id == synthetic_id).cloned(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::models::*;
    use crate::rules::DispatchOptions;

    fn unauthenticated_model() -> ParsedModel {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Important));
        let mut client = asset("client", &["browser"]);
        client.communication_links.push(link("client>web", "web", Protocol::Https));
        input.technical_assets.push(client);
        let mut web = asset("web", &["web-application"]);
        web.data_assets_processed.push("orders".into());
        input.technical_assets.push(web);
        build(input)
    }

    #[test]
    fn test_list_categories() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let entries = list_categories(&registry);
        assert_eq!(entries.len(), 42);
        assert_eq!(entries[0].category.id, "accidental-secret-leak");
        let cloud = entries
            .iter()
            .find(|entry| entry.category.id == "missing-cloud-hardening")
            .unwrap();
        assert!(cloud.supported_tags.contains(&"aws".to_string()));

        let table = render_categories(&entries);
        assert_eq!(table.lines().count(), 42);
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert!(json.get("supported_tags").is_some());
        assert!(json.get("detection_logic").is_some());
    }

    #[test]
    fn test_explain_generated_risk() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let model = unauthenticated_model();
        let outcome = registry
            .run(&model, &DispatchOptions::default(), |_, _| {})
            .unwrap();
        let id = "missing-authentication@client>web@client@web";
        let explanation = explain(&registry, &model, &outcome.risks, id).unwrap();
        assert!(explanation.risk.is_some(), "risk should be raised");
        let steps = explanation.steps.as_ref().unwrap();
        assert!(steps[1].contains("client>web"));
        assert!(explanation.render().contains("1. "));
    }

    #[test]
    fn test_explain_unknown_category() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let model = unauthenticated_model();
        let err = explain(&registry, &model, &[], "no-such-rule@web").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_explain_without_steps_falls_back_to_detection_logic() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let model = unauthenticated_model();
        let explanation = explain(&registry, &model, &[], "unnecessary-data-asset@orders").unwrap();
        assert!(explanation.steps.is_none());
        assert!(explanation.risk.is_none());
        assert!(explanation.render().contains("detection logic"));
    }
}
