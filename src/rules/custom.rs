//! Hand-written risk categories
//!
//! A custom category is a regular category plus a list of risks the modeller
//! identified by hand. They come from the model itself or from separate
//! files, and are dispatched like any built-in rule.

use super::RiskRule;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::graph::ParsedModel;
use crate::models::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One risk written down by the modeller, keyed by its title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifiedRisk {
    /// Derived from likelihood and impact when absent
    pub severity: Option<Severity>,
    pub exploitation_likelihood: Likelihood,
    pub exploitation_impact: Impact,
    pub data_breach_probability: DataBreachProbability,
    pub data_breach_technical_assets: Vec<String>,
    pub most_relevant_data_asset: String,
    pub most_relevant_technical_asset: String,
    pub most_relevant_communication_link: String,
    pub most_relevant_trust_boundary: String,
    pub most_relevant_shared_runtime: String,
}

/// Serialized form of a custom category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomCategoryDefinition {
    #[serde(flatten)]
    pub category: RiskCategory,
    pub supported_tags: Vec<String>,
    pub risks_identified: BTreeMap<String, IdentifiedRisk>,
}

/// A file holds either a list of categories or a single one
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryFile {
    Many(Vec<CustomCategoryDefinition>),
    One(Box<CustomCategoryDefinition>),
}

/// Rule wrapping a custom category
#[derive(Debug, Clone)]
pub struct CustomRiskRule {
    category: RiskCategory,
    supported_tags: Vec<String>,
    risks: BTreeMap<String, IdentifiedRisk>,
}

impl CustomRiskRule {
    pub fn from_definition(definition: CustomCategoryDefinition) -> ThreatGraphResult<Self> {
        let mut category = definition.category;
        category.id = category.id.trim().to_string();
        if category.id.is_empty() {
            return Err(ThreatGraphError::config(
                format!("custom risk category '{}'", category.title),
                "missing category ID",
            ));
        }
        if category.id.contains(crate::identity::ID_SEPARATOR) || category.id.contains('*') {
            return Err(ThreatGraphError::config(
                format!("custom risk category '{}'", category.id),
                "category ID must not contain '@' or '*'",
            ));
        }
        if category.title.trim().is_empty() {
            category.title = category.id.clone();
        }
        if category.description.trim().is_empty() {
            category.description = category.title.clone();
        }
        Ok(Self {
            category,
            supported_tags: definition.supported_tags,
            risks: definition.risks_identified,
        })
    }

    fn build_risk(&self, model: &ParsedModel, title: &str, identified: &IdentifiedRisk) -> ThreatGraphResult<Risk> {
        let context = format!("custom risk '{}' of category '{}'", title, self.category.id);
        let missing = |kind: &str, id: &str| ThreatGraphError::model(&context, format!("{} '{}' does not exist", kind, id));

        let data_asset = identified.most_relevant_data_asset.trim();
        if !data_asset.is_empty() && model.data_asset(data_asset).is_none() {
            return Err(missing("data asset", data_asset));
        }
        let technical_asset = identified.most_relevant_technical_asset.trim();
        if !technical_asset.is_empty() && model.technical_asset(technical_asset).is_none() {
            return Err(missing("technical asset", technical_asset));
        }
        let link = identified.most_relevant_communication_link.trim();
        if !link.is_empty() && model.communication_link(link).is_none() {
            return Err(missing("communication link", link));
        }
        let boundary = identified.most_relevant_trust_boundary.trim();
        if !boundary.is_empty() && !model.trust_boundaries.contains_key(boundary) {
            return Err(missing("trust boundary", boundary));
        }
        let runtime = identified.most_relevant_shared_runtime.trim();
        if !runtime.is_empty() && !model.shared_runtimes.contains_key(runtime) {
            return Err(missing("shared runtime", runtime));
        }
        for id in &identified.data_breach_technical_assets {
            if model.technical_asset(id.trim()).is_none() {
                return Err(missing("data breach technical asset", id));
            }
        }

        let mut risk = Risk::new(
            &self.category,
            identified.exploitation_likelihood,
            identified.exploitation_impact,
            title,
        )
        .with_data_asset(data_asset)
        .with_technical_asset(technical_asset)
        .with_communication_link(link)
        .with_trust_boundary(boundary)
        .with_shared_runtime(runtime)
        .with_data_breach(
            identified.data_breach_probability,
            identified.data_breach_technical_assets.iter().map(|id| id.trim().to_string()),
        )
        .with_synthetic_id(&[data_asset, technical_asset, link, boundary, runtime]);
        if let Some(severity) = identified.severity {
            risk.severity = severity;
        }
        Ok(risk)
    }
}

impl RiskRule for CustomRiskRule {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn supported_tags(&self) -> Vec<String> {
        self.supported_tags.clone()
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        self.risks
            .iter()
            .map(|(title, identified)| self.build_risk(model, title, identified))
            .collect()
    }
}

fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("json") | Some("yaml") | Some("yml")
    )
}

/// Parse every category in one file
pub fn load_definitions(path: &Path) -> ThreatGraphResult<Vec<CustomCategoryDefinition>> {
    let content = std::fs::read_to_string(path).map_err(|e| ThreatGraphError::io(e, Some(path.to_path_buf())))?;
    let parsed: CategoryFile = if crate::config::is_yaml(path) {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(match parsed {
        CategoryFile::Many(definitions) => definitions,
        CategoryFile::One(definition) => vec![*definition],
    })
}

/// Load custom rules from files and directories, in path order.
///
/// Directories are walked recursively and only `.json`, `.yaml` and `.yml`
/// files are read.
pub fn load_custom_rules(paths: &[PathBuf]) -> ThreatGraphResult<Vec<CustomRiskRule>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path).sort_by_file_name();
            for entry in walker.into_iter() {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf);
                    match e.into_io_error() {
                        Some(source) => ThreatGraphError::io(source, path),
                        None => ThreatGraphError::config("custom rules", "filesystem loop detected"),
                    }
                })?;
                if entry.file_type().is_file() && is_definition_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    let mut rules = Vec::new();
    for file in files {
        log::debug!("Loading custom risk categories from {:?}", file);
        for definition in load_definitions(&file)? {
            rules.push(CustomRiskRule::from_definition(definition)?);
        }
    }
    log::info!("Loaded {} custom risk categories", rules.len());
    Ok(rules)
}
