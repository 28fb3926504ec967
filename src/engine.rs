//! Analysis orchestration
//!
//! `ThreatAnalyzer` owns everything that outlives a single model: the
//! resolved configuration, the technology catalog and rules loaded from
//! custom category files. Each call to `analyze` builds the graph, scores
//! attractiveness, dispatches the rules and reconciles risk tracking.

use crate::config::{is_yaml, AnalysisConfig};
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::explain::{self, CategoryEntry, Explanation};
use crate::graph::ParsedModel;
use crate::models::{ModelInput, Risk, RiskCategory, TechnologyCatalog};
use crate::raa;
use crate::rules::custom::{load_custom_rules, CustomCategoryDefinition, CustomRiskRule};
use crate::rules::{RuleFailure, RuleRegistry};
use crate::statistics::RiskStatistics;
use crate::tracking::{Reconciliation, TrackingTable};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;

/// Facts about one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub model_title: String,
    /// SHA-256 of the raw model source
    pub model_sha256: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub rules_registered: usize,
    pub rules_executed: usize,
    pub rules_skipped: usize,
    pub rule_failures: Vec<RuleFailure>,
    pub risk_count: usize,
}

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_info: RunInfo,
    /// Risks in rule registration order
    pub risks: Vec<Risk>,
    pub categories: Vec<CategoryEntry>,
    pub tracking: Reconciliation,
    pub statistics: RiskStatistics,
}

/// A model resolved and scored, with the rules that apply to it
pub struct PreparedModel {
    pub model: ParsedModel,
    pub registry: RuleRegistry,
    pub tracking: TrackingTable,
}

pub struct ThreatAnalyzer {
    config: AnalysisConfig,
    catalog: TechnologyCatalog,
    external_rules: Vec<CustomRiskRule>,
}

impl ThreatAnalyzer {
    /// Load technology files and custom category files named by the config
    pub fn new(config: AnalysisConfig) -> ThreatGraphResult<Self> {
        let mut catalog = TechnologyCatalog::builtin();
        for path in &config.technology_paths {
            let added = catalog.load_from_file(path)?;
            log::info!("Loaded {} technologies from {:?}", added, path);
        }
        let external_rules = load_custom_rules(&config.custom_rule_paths)?;
        log::debug!(
            "Analyzer ready: {} technologies, {} external custom categories",
            catalog.len(),
            external_rules.len()
        );
        Ok(Self {
            config,
            catalog,
            external_rules,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Built-in rules, then external custom rules, then the model's own
    /// custom categories. Any category ID seen twice fails the run.
    pub fn registry(&self, model_categories: Vec<CustomCategoryDefinition>) -> ThreatGraphResult<RuleRegistry> {
        let mut registry = RuleRegistry::with_builtin_rules()?;
        for rule in &self.external_rules {
            registry.register(Box::new(rule.clone()))?;
        }
        for definition in model_categories {
            registry.register(Box::new(CustomRiskRule::from_definition(definition)?))?;
        }
        Ok(registry)
    }

    /// Rules a run executes before the model's own categories are known
    pub fn expected_rule_count(&self) -> ThreatGraphResult<usize> {
        Ok(self.registry(Vec::new())?.active_count(&self.config.dispatch_options()))
    }

    /// Build the graph and the rule set for a model, ready to dispatch
    pub fn prepare(&self, mut input: ModelInput) -> ThreatGraphResult<PreparedModel> {
        let model_categories = std::mem::take(&mut input.individual_risk_categories);
        let tracking_entries = std::mem::take(&mut input.risk_tracking);

        // configuration problems surface before any rule runs
        let registry = self.registry(model_categories)?;
        let known = registry
            .categories()
            .into_iter()
            .map(|category| category.id.clone())
            .collect();
        let tracking = TrackingTable::build(&tracking_entries, &known)?;

        let mut model = ParsedModel::new(input, &self.catalog)?;
        if self.config.skip_raa {
            log::debug!("Keeping attractiveness values from the model");
        } else {
            raa::apply(&mut model);
        }
        Ok(PreparedModel {
            model,
            registry,
            tracking,
        })
    }

    /// Analyze model source text. `on_rule_done` receives each finished
    /// rule's category and risk count.
    pub fn analyze_source<F>(&self, source: &str, yaml: bool, on_rule_done: F) -> ThreatGraphResult<AnalysisReport>
    where
        F: Fn(&RiskCategory, usize) + Sync,
    {
        let started = Instant::now();
        let start_time = chrono::Local::now();
        let model_sha256 = hex::encode(Sha256::digest(source.as_bytes()));

        let input = ModelInput::parse(source, yaml)?;
        let prepared = self.prepare(input)?;
        log::info!(
            "Analyzing '{}' with {} rules",
            prepared.model.title,
            prepared.registry.len()
        );

        let outcome = prepared
            .registry
            .run(&prepared.model, &self.config.dispatch_options(), on_rule_done)?;
        let tracking = prepared.tracking.reconcile(&outcome.risks, self.config.orphan_policy)?;
        let statistics = RiskStatistics::compute(&outcome.risks, &tracking);

        let duration = started.elapsed();
        log::info!(
            "Analysis produced {} risks ({} still at risk) in {:.2}s",
            outcome.risks.len(),
            statistics.still_at_risk,
            duration.as_secs_f64()
        );

        Ok(AnalysisReport {
            run_info: RunInfo {
                model_title: prepared.model.title.clone(),
                model_sha256,
                start_time: start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                end_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                duration_seconds: duration.as_secs_f64(),
                rules_registered: prepared.registry.len(),
                rules_executed: outcome.rules_executed,
                rules_skipped: outcome.rules_skipped,
                rule_failures: outcome.failures,
                risk_count: outcome.risks.len(),
            },
            categories: explain::list_categories(&prepared.registry),
            risks: outcome.risks,
            tracking,
            statistics,
        })
    }

    pub fn analyze_file<F>(&self, path: &Path, on_rule_done: F) -> ThreatGraphResult<AnalysisReport>
    where
        F: Fn(&RiskCategory, usize) + Sync,
    {
        let source = read_model(path)?;
        self.analyze_source(&source, is_yaml(path), on_rule_done)
    }

    /// Explain one synthetic ID against a model file
    pub fn explain_file(&self, path: &Path, synthetic_id: &str) -> ThreatGraphResult<Explanation> {
        let source = read_model(path)?;
        let prepared = self.prepare(ModelInput::parse(&source, is_yaml(path))?)?;
        let outcome = prepared
            .registry
            .run(&prepared.model, &self.config.dispatch_options(), |_, _| {})?;
        explain::explain(&prepared.registry, &prepared.model, &outcome.risks, synthetic_id)
    }
}

fn read_model(path: &Path) -> ThreatGraphResult<String> {
    log::debug!("Reading model {:?}", path);
    std::fs::read_to_string(path).map_err(|e| ThreatGraphError::io(e, Some(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrphanPolicy;
    use crate::models::RiskStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MODEL: &str = r#"
title: Shop
data_assets:
  - id: orders
    title: Orders
    confidentiality: confidential
    integrity: critical
    availability: important
technical_assets:
  - id: web
    title: Web Shop
    type: process
    technologies: [web-application]
    data_assets_processed: [orders]
    communication_links:
      - id: web>db
        title: Store
        target_id: db
        protocol: jdbc
        authentication: credentials
        data_assets_sent: [orders]
  - id: db
    title: Order DB
    type: datastore
    technologies: [database]
    data_assets_stored: [orders]
risk_tracking:
  "unencrypted-asset@*":
    status: accepted
    justification: disk encryption handled by the platform
    date: "2024-01-15"
"#;

    fn analyzer(config: AnalysisConfig) -> ThreatAnalyzer {
        ThreatAnalyzer::new(config).unwrap()
    }

    fn sequential() -> AnalysisConfig {
        AnalysisConfig {
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let analyzer = analyzer(sequential());
        let first = analyzer.analyze_source(MODEL, true, |_, _| {}).unwrap();
        let second = analyzer.analyze_source(MODEL, true, |_, _| {}).unwrap();
        assert!(!first.risks.is_empty());
        assert_eq!(first.risks, second.risks);
        assert_eq!(first.run_info.model_sha256, second.run_info.model_sha256);
        assert_eq!(first.run_info.model_sha256.len(), 64);

        let parallel = ThreatAnalyzer::new(AnalysisConfig {
            threads: 4,
            ..Default::default()
        })
        .unwrap()
        .analyze_source(MODEL, true, |_, _| {})
        .unwrap();
        assert_eq!(parallel.risks, first.risks, "parallel dispatch keeps registration order");
    }

    #[test]
    fn test_tracking_applies_to_report() {
        let report = analyzer(sequential()).analyze_source(MODEL, true, |_, _| {}).unwrap();
        let unencrypted: Vec<&Risk> = report
            .risks
            .iter()
            .filter(|risk| risk.category_id == "unencrypted-asset")
            .collect();
        assert!(!unencrypted.is_empty());
        for risk in unencrypted {
            assert_eq!(report.tracking.status_of(&risk.synthetic_id), RiskStatus::Accepted);
        }
        assert!(report.tracking.orphaned.is_empty());
        assert_eq!(report.statistics.total, report.risks.len());
        assert_eq!(report.run_info.rules_registered, 42);
        assert_eq!(report.categories.len(), 42);
    }

    #[test]
    fn test_skip_rules_and_progress_callback() {
        let analyzer = analyzer(AnalysisConfig {
            skip_rules: vec!["unencrypted-asset".to_string()],
            orphan_policy: OrphanPolicy::Error,
            parallel: false,
            ..Default::default()
        });
        let finished = AtomicUsize::new(0);
        let err = analyzer
            .analyze_source(MODEL, true, |_, _| {
                finished.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap_err();
        // the tracking entry for the skipped rule now matches nothing
        assert!(matches!(err, ThreatGraphError::OrphanedTracking(_)));
        assert_eq!(finished.load(Ordering::Relaxed), 41);
    }

    #[test]
    fn test_expected_rule_count_excludes_skipped_rules() {
        let analyzer = analyzer(AnalysisConfig {
            skip_rules: vec!["Unencrypted-Asset".to_string(), "missing-vault ".to_string()],
            ..sequential()
        });
        assert_eq!(analyzer.expected_rule_count().unwrap(), 40);
        assert_eq!(self::analyzer(sequential()).expected_rule_count().unwrap(), 42);
    }

    #[test]
    fn test_model_category_colliding_with_builtin() {
        let source = format!(
            "{}individual_risk_categories:\n  - id: missing-vault\n    title: Mine\n",
            MODEL
        );
        let err = analyzer(sequential()).analyze_source(&source, true, |_, _| {}).unwrap_err();
        assert!(matches!(err, ThreatGraphError::DuplicateCategory(ref id) if id == "missing-vault"));
    }

    #[test]
    fn test_unknown_tracking_category_fails_before_analysis() {
        let source = MODEL.replace("unencrypted-asset@*", "no-such-category@web");
        let err = analyzer(sequential()).analyze_source(&source, true, |_, _| {}).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_explain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        std::fs::write(&path, MODEL).unwrap();
        let analyzer = analyzer(sequential());
        let report = analyzer.analyze_file(&path, |_, _| {}).unwrap();
        let id = &report.risks[0].synthetic_id;
        let explanation = analyzer.explain_file(&path, id).unwrap();
        assert_eq!(explanation.risk.as_ref().map(|r| &r.synthetic_id), Some(id));
    }
}
