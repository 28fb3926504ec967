//! Risk statistics, filtering and sorting

use crate::models::{Risk, RiskCategory, RiskFunction, RiskStatus, Severity, Stride};
use crate::tracking::Reconciliation;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Risk counts per severity and tracking status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskStatistics {
    pub total: usize,
    pub still_at_risk: usize,
    /// severity -> status -> count, every combination present
    pub by_severity: BTreeMap<Severity, BTreeMap<RiskStatus, usize>>,
    pub by_category: BTreeMap<String, usize>,
    pub highest_severity_still_at_risk: Option<Severity>,
}

impl RiskStatistics {
    pub fn compute(risks: &[Risk], tracking: &Reconciliation) -> Self {
        let mut by_severity: BTreeMap<Severity, BTreeMap<RiskStatus, usize>> = Severity::ALL
            .iter()
            .map(|severity| (*severity, RiskStatus::ALL.iter().map(|status| (*status, 0)).collect()))
            .collect();
        let mut by_category = BTreeMap::new();
        for risk in risks {
            let status = tracking.status_of(&risk.synthetic_id);
            *by_severity
                .entry(risk.severity)
                .or_default()
                .entry(status)
                .or_default() += 1;
            *by_category.entry(risk.category_id.clone()).or_default() += 1;
        }
        let open = still_at_risk(risks, tracking);
        Self {
            total: risks.len(),
            still_at_risk: open.len(),
            highest_severity_still_at_risk: open.iter().map(|risk| risk.severity).max(),
            by_severity,
            by_category,
        }
    }

    pub fn count(&self, severity: Severity, status: RiskStatus) -> usize {
        self.by_severity
            .get(&severity)
            .and_then(|statuses| statuses.get(&status))
            .copied()
            .unwrap_or(0)
    }
}

/// Order in which report listings present risks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskOrder {
    /// Severity descending, then status, impact and likelihood descending, then title
    BySeverity,
    ByTitle,
}

pub fn sort_risks(risks: &mut [Risk], order: RiskOrder, tracking: &Reconciliation) {
    match order {
        RiskOrder::BySeverity => risks.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| {
                    tracking
                        .status_of(&a.synthetic_id)
                        .cmp(&tracking.status_of(&b.synthetic_id))
                })
                .then_with(|| b.exploitation_impact.cmp(&a.exploitation_impact))
                .then_with(|| b.exploitation_likelihood.cmp(&a.exploitation_likelihood))
                .then_with(|| compare_titles(a, b))
        }),
        RiskOrder::ByTitle => risks.sort_by(compare_titles),
    }
}

fn compare_titles(a: &Risk, b: &Risk) -> Ordering {
    a.title.cmp(&b.title).then_with(|| a.synthetic_id.cmp(&b.synthetic_id))
}

pub fn with_status<'a>(risks: &'a [Risk], tracking: &Reconciliation, status: RiskStatus) -> Vec<&'a Risk> {
    risks
        .iter()
        .filter(|risk| tracking.status_of(&risk.synthetic_id) == status)
        .collect()
}

pub fn still_at_risk<'a>(risks: &'a [Risk], tracking: &Reconciliation) -> Vec<&'a Risk> {
    risks
        .iter()
        .filter(|risk| tracking.status_of(&risk.synthetic_id).is_still_at_risk())
        .collect()
}

pub fn with_severity(risks: &[Risk], severity: Severity) -> Vec<&Risk> {
    risks.iter().filter(|risk| risk.severity == severity).collect()
}

/// Lookup of category metadata for category-based filters
pub struct CategoryIndex<'a> {
    categories: HashMap<&'a str, &'a RiskCategory>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(categories: &'a [RiskCategory]) -> Self {
        Self {
            categories: categories.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }

    fn filter<'r, P>(&self, risks: &'r [Risk], predicate: P) -> Vec<&'r Risk>
    where
        P: Fn(&RiskCategory) -> bool,
    {
        risks
            .iter()
            .filter(|risk| {
                self.categories
                    .get(risk.category_id.as_str())
                    .map(|category| predicate(category))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn with_function<'r>(&self, risks: &'r [Risk], function: RiskFunction) -> Vec<&'r Risk> {
        self.filter(risks, |category| category.function == function)
    }

    pub fn with_stride<'r>(&self, risks: &'r [Risk], stride: Stride) -> Vec<&'r Risk> {
        self.filter(risks, |category| category.stride == stride)
    }

    /// Risks whose category usually signals a gap in the model
    pub fn model_failures<'r>(&self, risks: &'r [Risk]) -> Vec<&'r Risk> {
        self.filter(risks, |category| category.model_failure_possible_reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Impact, Likelihood};
    use crate::tracking::RiskTracking;

    fn category(id: &str, function: RiskFunction, stride: Stride, model_failure: bool) -> RiskCategory {
        RiskCategory {
            id: id.to_string(),
            function,
            stride,
            model_failure_possible_reason: model_failure,
            ..Default::default()
        }
    }

    fn risk(category: &RiskCategory, likelihood: Likelihood, impact: Impact, title: &str, target: &str) -> Risk {
        Risk::new(category, likelihood, impact, title).with_synthetic_id(&[target])
    }

    fn tracked(pattern: &str, status: RiskStatus) -> (String, RiskTracking) {
        (
            pattern.to_string(),
            RiskTracking {
                pattern: pattern.to_string(),
                status,
                justification: String::new(),
                ticket: String::new(),
                date: None,
                checked_by: String::new(),
            },
        )
    }

    fn fixture() -> (Vec<RiskCategory>, Vec<Risk>, Reconciliation) {
        let categories = vec![
            category("sql-nosql-injection", RiskFunction::Development, Stride::Tampering, false),
            category("incomplete-model", RiskFunction::Architecture, Stride::InformationDisclosure, true),
        ];
        let risks = vec![
            risk(&categories[1], Likelihood::Unlikely, Impact::Low, "b incomplete", "app"),
            risk(&categories[0], Likelihood::VeryLikely, Impact::High, "z injection", "db"),
            risk(&categories[0], Likelihood::VeryLikely, Impact::High, "a injection", "cache"),
        ];
        let tracking = Reconciliation {
            tracked: [tracked("sql-nosql-injection@db", RiskStatus::Mitigated)].into_iter().collect(),
            ..Default::default()
        };
        (categories, risks, tracking)
    }

    #[test]
    fn test_counts_per_severity_and_status() {
        let (_, risks, tracking) = fixture();
        let stats = RiskStatistics::compute(&risks, &tracking);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.still_at_risk, 2);
        assert_eq!(stats.count(Severity::High, RiskStatus::Mitigated), 1);
        assert_eq!(stats.count(Severity::High, RiskStatus::Unchecked), 1);
        assert_eq!(stats.count(Severity::Low, RiskStatus::Unchecked), 1);
        assert_eq!(stats.count(Severity::Critical, RiskStatus::Accepted), 0);
        assert_eq!(stats.by_severity.len(), Severity::ALL.len());
        assert_eq!(stats.by_category["sql-nosql-injection"], 2);
        assert_eq!(stats.highest_severity_still_at_risk, Some(Severity::High));
    }

    #[test]
    fn test_sort_by_severity_puts_open_risks_first() {
        let (_, mut risks, tracking) = fixture();
        sort_risks(&mut risks, RiskOrder::BySeverity, &tracking);
        let ids: Vec<&str> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["sql-nosql-injection@cache", "sql-nosql-injection@db", "incomplete-model@app"]
        );

        sort_risks(&mut risks, RiskOrder::ByTitle, &tracking);
        assert_eq!(risks[0].title, "a injection");
        assert_eq!(risks[2].title, "z injection");
    }

    #[test]
    fn test_category_filters() {
        let (categories, risks, tracking) = fixture();
        let index = CategoryIndex::new(&categories);
        assert_eq!(index.with_function(&risks, RiskFunction::Development).len(), 2);
        assert_eq!(index.with_stride(&risks, Stride::InformationDisclosure).len(), 1);
        assert_eq!(index.model_failures(&risks)[0].synthetic_id, "incomplete-model@app");
        assert_eq!(with_status(&risks, &tracking, RiskStatus::Mitigated).len(), 1);
        assert_eq!(with_severity(&risks, Severity::Low).len(), 1);
    }
}
