//! Rule registry and dispatcher

use super::RiskRule;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::graph::ParsedModel;
use crate::identity::dedupe_by_synthetic_id;
use crate::models::{Risk, RiskCategory};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// How the dispatcher executes rules
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Category IDs to leave out of the run
    pub skip_rules: Vec<String>,
    /// Run rules on a rayon pool
    pub parallel: bool,
    /// Pool size, 0 picks the number of CPUs
    pub threads: usize,
}

impl DispatchOptions {
    /// Whether `category_id` is listed in `skip_rules`, ignoring case and
    /// surrounding whitespace
    pub fn is_skipped(&self, category_id: &str) -> bool {
        self.skip_rules.iter().any(|id| id.trim().eq_ignore_ascii_case(category_id))
    }
}

/// A rule whose risks were dropped because it returned an error
#[derive(Debug, Clone, Serialize)]
pub struct RuleFailure {
    pub category_id: String,
    pub message: String,
}

/// Result of one dispatch over the registry
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Risks of all rules, concatenated in registration order
    pub risks: Vec<Risk>,
    pub failures: Vec<RuleFailure>,
    pub rules_executed: usize,
    pub rules_skipped: usize,
}

/// Ordered collection of rules with unique category IDs
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the complete built-in catalog
    pub fn with_builtin_rules() -> ThreatGraphResult<Self> {
        let mut registry = Self::new();
        for rule in super::builtin::all_rules() {
            registry.register(rule)?;
        }
        Ok(registry)
    }

    /// Append a rule; a category ID already present is a configuration error
    pub fn register(&mut self, rule: Box<dyn RiskRule>) -> ThreatGraphResult<()> {
        let id = rule.category().id.clone();
        if id.trim().is_empty() {
            return Err(ThreatGraphError::config("rule registry", "rule without category ID"));
        }
        if self.find(&id).is_some() {
            return Err(ThreatGraphError::DuplicateCategory(id));
        }
        log::trace!("Registered rule '{}'", id);
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules a run with `options` executes
    pub fn active_count(&self, options: &DispatchOptions) -> usize {
        self.rules().filter(|rule| !options.is_skipped(&rule.category().id)).count()
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn RiskRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    /// Rule by category ID, ignoring case
    pub fn find(&self, category_id: &str) -> Option<&dyn RiskRule> {
        self.rules
            .iter()
            .find(|rule| rule.category().id.eq_ignore_ascii_case(category_id))
            .map(|rule| rule.as_ref())
    }

    pub fn categories(&self) -> Vec<&RiskCategory> {
        self.rules.iter().map(|rule| rule.category()).collect()
    }

    /// Union of the tags all rules branch on
    pub fn supported_tags(&self) -> BTreeSet<String> {
        self.rules
            .iter()
            .flat_map(|rule| rule.supported_tags())
            .map(|tag| tag.to_lowercase())
            .collect()
    }

    /// Run every registered rule not listed in `skip_rules`.
    ///
    /// A failing rule is logged and contributes nothing; the others still
    /// run. A configuration error raised by a rule aborts the whole run.
    /// `on_rule_done` is called once per executed rule, in completion order.
    pub fn run<F>(
        &self,
        model: &ParsedModel,
        options: &DispatchOptions,
        on_rule_done: F,
    ) -> ThreatGraphResult<DispatchOutcome>
    where
        F: Fn(&RiskCategory, usize) + Sync,
    {
        let active: Vec<&dyn RiskRule> = self
            .rules()
            .filter(|rule| {
                let skipped = options.is_skipped(&rule.category().id);
                if skipped {
                    log::info!("Skipping rule '{}'", rule.category().id);
                }
                !skipped
            })
            .collect();
        let rules_skipped = self.rules.len() - active.len();

        let execute = |rule: &&dyn RiskRule| {
            let category = rule.category();
            log::debug!("Running rule '{}'", category.id);
            let result = rule.generate_risks(model);
            on_rule_done(category, result.as_ref().map(Vec::len).unwrap_or(0));
            result
        };

        // Results are collected per rule, so concatenation below follows
        // registration order no matter which rule finishes first.
        let results: Vec<ThreatGraphResult<Vec<Risk>>> = if options.parallel {
            let threads = if options.threads == 0 {
                num_cpus::get()
            } else {
                options.threads
            };
            log::debug!("Dispatching {} rules on {} threads", active.len(), threads);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ThreatGraphError::ThreadPool(e.to_string()))?;
            pool.install(|| active.par_iter().map(execute).collect())
        } else {
            active.iter().map(execute).collect()
        };

        let mut outcome = DispatchOutcome {
            rules_executed: active.len(),
            rules_skipped,
            ..Default::default()
        };
        for (rule, result) in active.iter().zip(results) {
            let category_id = &rule.category().id;
            match result {
                Ok(risks) => {
                    let risks = dedupe_by_synthetic_id(risks);
                    log::debug!("Rule '{}' produced {} risks", category_id, risks.len());
                    outcome.risks.extend(risks);
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    let failure = ThreatGraphError::rule(category_id, e.to_string());
                    log::warn!("{}; its risks are dropped", failure);
                    outcome.failures.push(RuleFailure {
                        category_id: category_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Impact, Likelihood};

    struct FixedRule {
        category: RiskCategory,
        count: usize,
        fail: bool,
    }

    /// Rule whose catalog entry turns out unusable at run time
    struct MisconfiguredRule {
        category: RiskCategory,
    }

    impl RiskRule for MisconfiguredRule {
        fn category(&self) -> &RiskCategory {
            &self.category
        }

        fn generate_risks(&self, _model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
            Err(ThreatGraphError::config(&self.category.id, "no usable definition"))
        }
    }

    impl FixedRule {
        fn boxed(id: &str, count: usize, fail: bool) -> Box<dyn RiskRule> {
            Box::new(Self {
                category: RiskCategory {
                    id: id.to_string(),
                    ..Default::default()
                },
                count,
                fail,
            })
        }
    }

    impl RiskRule for FixedRule {
        fn category(&self) -> &RiskCategory {
            &self.category
        }

        fn supported_tags(&self) -> Vec<String> {
            vec![format!("{}-tag", self.category.id)]
        }

        fn generate_risks(&self, _model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
            if self.fail {
                return Err(ThreatGraphError::rule(&self.category.id, "boom"));
            }
            // Sleep in reverse so later rules finish first when parallel
            std::thread::sleep(std::time::Duration::from_millis(
                (10 - self.count.min(10)) as u64,
            ));
            let mut risks: Vec<Risk> = (0..self.count)
                .map(|i| {
                    Risk::new(&self.category, Likelihood::Likely, Impact::Low, format!("{}", i))
                        .with_synthetic_id(&[&i.to_string()])
                })
                .collect();
            // one duplicate to be suppressed
            if let Some(first) = risks.first().cloned() {
                risks.push(first);
            }
            Ok(risks)
        }
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.register(FixedRule::boxed("first", 1, false)).unwrap();
        registry.register(FixedRule::boxed("broken", 0, true)).unwrap();
        registry.register(FixedRule::boxed("second", 3, false)).unwrap();
        registry
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let mut registry = registry();
        let err = registry.register(FixedRule::boxed("FIRST", 1, false)).unwrap_err();
        assert!(matches!(err, ThreatGraphError::DuplicateCategory(_)));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_failing_rule_is_isolated() {
        let outcome = registry()
            .run(&ParsedModel::default(), &DispatchOptions::default(), |_, _| {})
            .unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].category_id, "broken");
        assert_eq!(outcome.risks.len(), 4, "duplicates should be suppressed per rule");
    }

    #[test]
    fn test_configuration_error_aborts_run() {
        let mut registry = registry();
        registry
            .register(Box::new(MisconfiguredRule {
                category: RiskCategory {
                    id: "misconfigured".to_string(),
                    ..Default::default()
                },
            }))
            .unwrap();
        let err = registry
            .run(&ParsedModel::default(), &DispatchOptions::default(), |_, _| {})
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no usable definition"));
    }

    #[test]
    fn test_rule_failure_message() {
        let err = ThreatGraphError::rule("broken", "boom");
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "Rule 'broken' failed: boom");
    }

    #[test]
    fn test_active_count_honors_skip_list() {
        let registry = registry();
        let options = DispatchOptions {
            skip_rules: vec![" BROKEN ".into(), "unknown-rule".into()],
            ..Default::default()
        };
        assert_eq!(registry.active_count(&DispatchOptions::default()), 3);
        assert_eq!(registry.active_count(&options), 2);
        let outcome = registry.run(&ParsedModel::default(), &options, |_, _| {}).unwrap();
        assert_eq!(outcome.rules_executed, registry.active_count(&options));
    }

    #[test]
    fn test_parallel_order_matches_registration() {
        let registry = registry();
        let sequential = registry
            .run(&ParsedModel::default(), &DispatchOptions::default(), |_, _| {})
            .unwrap();
        let parallel = registry
            .run(
                &ParsedModel::default(),
                &DispatchOptions {
                    parallel: true,
                    threads: 4,
                    ..Default::default()
                },
                |_, _| {},
            )
            .unwrap();
        assert_eq!(sequential.risks, parallel.risks);
        let ids: Vec<&str> = parallel.risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(ids, vec!["first@0", "second@0", "second@1", "second@2"]);
    }

    #[test]
    fn test_skip_rules_and_tags() {
        let registry = registry();
        let outcome = registry
            .run(
                &ParsedModel::default(),
                &DispatchOptions {
                    skip_rules: vec!["Broken".into()],
                    ..Default::default()
                },
                |_, _| {},
            )
            .unwrap();
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.rules_skipped, 1);
        assert_eq!(outcome.rules_executed, 2);
        assert!(registry.supported_tags().contains("second-tag"));
    }

    #[test]
    fn test_builtin_catalog_registers_cleanly() {
        let registry = RuleRegistry::with_builtin_rules().expect("builtin IDs should be unique");
        assert_eq!(registry.len(), 42);
        assert!(registry.find("missing-vault").is_some());
        assert!(registry.supported_tags().contains("aws"));
    }
}
